//! Counters for sync health
//!
//! Not an observability surface; the consecutive-failure count is the hook a
//! future circuit breaker would read.

use serde::Serialize;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Point-in-time view of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncStatsSnapshot {
	pub malformed_push_events: u64,
	pub duplicates_ignored: u64,
	pub polls_completed: u64,
	pub consecutive_poll_failures: u32,
	pub rollbacks: u64,
}

#[derive(Debug, Default)]
pub struct SyncStats {
	malformed_push_events: AtomicU64,
	duplicates_ignored: AtomicU64,
	polls_completed: AtomicU64,
	consecutive_poll_failures: AtomicU32,
	rollbacks: AtomicU64,
}

impl SyncStats {
	/// Count a dropped push event. Returns the running total.
	pub fn record_malformed_push(&self) -> u64 {
		self.malformed_push_events.fetch_add(1, Ordering::Relaxed) + 1
	}

	pub fn record_duplicate_ignored(&self) {
		self.duplicates_ignored.fetch_add(1, Ordering::Relaxed);
	}

	/// A poll result was applied; any failure streak is over.
	pub fn record_poll_completed(&self) {
		self.polls_completed.fetch_add(1, Ordering::Relaxed);
		self.consecutive_poll_failures.store(0, Ordering::Relaxed);
	}

	/// Count a skipped poll tick. Returns the current streak length.
	pub fn record_poll_failure(&self) -> u32 {
		self.consecutive_poll_failures.fetch_add(1, Ordering::Relaxed) + 1
	}

	pub fn record_rollback(&self) {
		self.rollbacks.fetch_add(1, Ordering::Relaxed);
	}

	pub fn snapshot(&self) -> SyncStatsSnapshot {
		SyncStatsSnapshot {
			malformed_push_events: self.malformed_push_events.load(Ordering::Relaxed),
			duplicates_ignored: self.duplicates_ignored.load(Ordering::Relaxed),
			polls_completed: self.polls_completed.load(Ordering::Relaxed),
			consecutive_poll_failures: self.consecutive_poll_failures.load(Ordering::Relaxed),
			rollbacks: self.rollbacks.load(Ordering::Relaxed),
		}
	}
}
