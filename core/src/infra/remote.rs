//! Remote store and push channel collaborator boundaries

use crate::domain::RemoteBookmark;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Failures at the remote boundary.
#[derive(Error, Debug, Clone)]
pub enum RemoteError {
	#[error("remote write rejected: {0}")]
	WriteRejected(String),

	#[error("remote fetch failed: {0}")]
	FetchFailed(String),

	#[error("push channel unavailable: {0}")]
	PushUnavailable(String),
}

/// Change kinds delivered on the push channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushEventKind {
	Insert,
	Delete,
	Update,
}

/// A single change event from the push channel.
///
/// The payload is decoded by the ingestor. Push delivery is best-effort by
/// design, so a payload that does not decode is dropped there rather than
/// propagated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushEvent {
	pub kind: PushEventKind,
	pub record: serde_json::Value,
}

/// Opaque handle identifying an active push subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionHandle(pub Uuid);

/// An active push subscription: events flow until `unsubscribe`.
pub struct PushSubscription {
	pub handle: SubscriptionHandle,
	pub events: async_channel::Receiver<PushEvent>,
}

/// Push channel collaborator.
///
/// Connection handling (reconnects, transport) lives behind this boundary;
/// the core only sees a stream of events per subscription.
#[async_trait]
pub trait PushChannel: Send + Sync {
	async fn subscribe(&self, topic: &str) -> Result<PushSubscription, RemoteError>;

	async fn unsubscribe(&self, handle: SubscriptionHandle);
}

/// Remote bookmark store collaborator.
#[async_trait]
pub trait RemoteStore: Send + Sync {
	/// Fetch the full authoritative state for an owner, newest first.
	async fn fetch_all(&self, owner_id: &str) -> Result<Vec<RemoteBookmark>, RemoteError>;

	/// Create a bookmark, returning its durable identifier.
	async fn create(&self, title: &str, url: &str, owner_id: &str) -> Result<Uuid, RemoteError>;

	/// Delete a bookmark by durable identifier.
	async fn delete(&self, id: Uuid) -> Result<(), RemoteError>;
}
