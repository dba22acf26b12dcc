//! Core event bus
//!
//! Carries user-facing notifications and session transitions out of the sync
//! engine. Record-store snapshots travel on a dedicated watch channel
//! instead, so list redraws are not mixed with notification traffic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// Which optimistic write failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOp {
	Create,
	Delete,
}

/// Events published by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoreEvent {
	/// An optimistic write was rejected by the remote store and rolled back.
	/// Surfaced to the user as a transient notification, never fatal.
	WriteFailed {
		op: WriteOp,
		message: String,
		timestamp: DateTime<Utc>,
	},

	/// The active session changed.
	SessionChanged { owner_id: Option<String> },
}

impl CoreEvent {
	pub fn event_type(&self) -> &str {
		match self {
			CoreEvent::WriteFailed { .. } => "WriteFailed",
			CoreEvent::SessionChanged { .. } => "SessionChanged",
		}
	}
}

/// Broadcast bus for [`CoreEvent`]s.
#[derive(Debug, Clone)]
pub struct CoreEventBus {
	sender: broadcast::Sender<CoreEvent>,
}

impl CoreEventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Emit an event to all subscribers, returning how many received it.
	pub fn emit(&self, event: CoreEvent) -> usize {
		let event_type = event.event_type().to_string();
		match self.sender.send(event) {
			Ok(count) => {
				debug!(event_type = %event_type, subscribers = count, "Core event emitted");
				count
			}
			Err(_) => {
				// No subscribers; normal during startup and teardown.
				debug!(event_type = %event_type, "Core event emitted but no subscribers");
				0
			}
		}
	}

	pub fn subscribe(&self) -> broadcast::Receiver<CoreEvent> {
		self.sender.subscribe()
	}

	pub fn subscriber_count(&self) -> usize {
		self.sender.receiver_count()
	}
}
