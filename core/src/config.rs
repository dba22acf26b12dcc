//! Sync engine configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the sync engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
	/// Reconciliation poller settings
	#[serde(default)]
	pub poll: PollConfig,

	/// Channel capacities
	#[serde(default)]
	pub channels: ChannelConfig,
}

/// Reconciliation poller settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
	/// Seconds between full-state polls
	pub interval_secs: u64,

	/// Seconds a freshly inserted record is shielded from removal when it is
	/// absent from a poll result. Defaults to one poll interval.
	pub grace_window_secs: Option<u64>,

	/// Consecutive fetch failures before the skip log escalates to a warning
	pub failure_warn_threshold: u32,
}

impl Default for PollConfig {
	fn default() -> Self {
		Self {
			interval_secs: 5,
			grace_window_secs: None,
			failure_warn_threshold: 3,
		}
	}
}

impl PollConfig {
	pub fn interval(&self) -> Duration {
		Duration::from_secs(self.interval_secs)
	}

	/// Grace window for poll-absence removal (replication-lag tolerance).
	pub fn grace_window(&self) -> Duration {
		Duration::from_secs(self.grace_window_secs.unwrap_or(self.interval_secs))
	}
}

/// Channel capacities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
	/// Core event bus capacity
	pub event_bus_capacity: usize,
}

impl Default for ChannelConfig {
	fn default() -> Self {
		Self {
			event_bus_capacity: 1024,
		}
	}
}
