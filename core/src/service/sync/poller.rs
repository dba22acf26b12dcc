//! Reconciliation poller
//!
//! Fetches full authoritative state on a fixed interval while a session is
//! active and hands the result to the actor to diff. A failed fetch skips
//! the tick; the interval itself throttles the retry load, so there is no
//! backoff. An out-of-band tick can be forced (delete rollback re-fetches
//! instead of reconstructing a position).

use crate::infra::remote::RemoteStore;
use crate::service::sync::actor::SyncMessage;
use crate::service::sync::stats::SyncStats;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, warn};

#[allow(clippy::too_many_arguments)]
pub(crate) async fn run(
	remote: Arc<dyn RemoteStore>,
	owner_id: String,
	tx: mpsc::UnboundedSender<SyncMessage>,
	epoch: u64,
	interval: Duration,
	failure_warn_threshold: u32,
	force: Arc<Notify>,
	stats: Arc<SyncStats>,
) {
	debug!(owner_id = %owner_id, epoch, interval_secs = interval.as_secs(), "Reconciliation poller started");

	// The first tick fires immediately: a fresh session rebuilds its view
	// from a full fetch before the interval cadence takes over.
	let mut ticker = tokio::time::interval(interval);
	ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

	loop {
		tokio::select! {
			_ = ticker.tick() => {}
			_ = force.notified() => {
				debug!(epoch, "Forced reconciliation tick");
			}
		}

		match remote.fetch_all(&owner_id).await {
			Ok(records) => {
				if tx
					.send(SyncMessage::Reconcile { epoch, records })
					.is_err()
				{
					break;
				}
			}
			Err(error) => {
				let consecutive = stats.record_poll_failure();
				if consecutive >= failure_warn_threshold {
					warn!(error = %error, consecutive, "Poll fetch failing repeatedly, skipping tick");
				} else {
					debug!(error = %error, consecutive, "Poll fetch failed, skipping tick");
				}
			}
		}
	}

	debug!(epoch, "Reconciliation poller stopped");
}
