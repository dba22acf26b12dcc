//! Push event ingestion
//!
//! Decodes raw push events and forwards them to the reconciliation actor.
//! Push delivery is best-effort: a malformed event is fatal to that event
//! only — logged, counted, dropped — and never disturbs the stream.

use crate::domain::RemoteBookmark;
use crate::infra::remote::{PushEvent, PushEventKind};
use crate::service::sync::actor::{PushChange, SyncMessage};
use crate::service::sync::stats::SyncStats;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct DeletePayload {
	id: Uuid,
}

/// Decode a raw push event into an applicable change.
///
/// `None` means the payload does not carry a usable identifier.
pub(crate) fn decode_event(event: &PushEvent) -> Option<PushChange> {
	match event.kind {
		PushEventKind::Insert => serde_json::from_value::<RemoteBookmark>(event.record.clone())
			.ok()
			.map(PushChange::Insert),
		PushEventKind::Update => serde_json::from_value::<RemoteBookmark>(event.record.clone())
			.ok()
			.map(PushChange::Update),
		PushEventKind::Delete => serde_json::from_value::<DeletePayload>(event.record.clone())
			.ok()
			.map(|payload| PushChange::Delete(payload.id)),
	}
}

/// Forward decoded events from an active subscription to the actor.
///
/// Ends when the subscription closes (unsubscribe) or the actor goes away.
pub(crate) async fn run(
	events: async_channel::Receiver<PushEvent>,
	tx: mpsc::UnboundedSender<SyncMessage>,
	epoch: u64,
	stats: Arc<SyncStats>,
) {
	debug!(epoch, "Push ingestor started");

	while let Ok(event) = events.recv().await {
		match decode_event(&event) {
			Some(change) => {
				if tx.send(SyncMessage::Push { epoch, change }).is_err() {
					break;
				}
			}
			None => {
				let total = stats.record_malformed_push();
				warn!(kind = ?event.kind, total, "Dropping malformed push event");
			}
		}
	}

	debug!(epoch, "Push ingestor stopped");
}
