//! Waymark core
//!
//! Client-side reconciliation engine for the bookmark list: merges
//! optimistic local mutations, push change events, and periodic
//! authoritative polls into one duplicate-free, order-stable view.

pub mod config;
pub mod domain;
pub mod error;
pub mod infra;
pub mod service;

pub use config::SyncConfig;
pub use domain::{Bookmark, BookmarkId, RemoteBookmark};
pub use error::CoreError;
pub use infra::auth::{AuthProvider, SessionEvent};
pub use infra::event_bus::{CoreEvent, CoreEventBus, WriteOp};
pub use infra::remote::{
	PushChannel, PushEvent, PushEventKind, PushSubscription, RemoteError, RemoteStore,
	SubscriptionHandle,
};
pub use service::sync::SyncService;
pub use service::Service;

use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

/// The assembled client core.
///
/// Owns the event bus and the sync service; auth, the remote store, and the
/// push channel are supplied by the embedding application.
pub struct Core {
	events: CoreEventBus,
	sync: Arc<SyncService>,
}

impl Core {
	/// Wire the core against its external collaborators.
	pub fn new(
		config: SyncConfig,
		auth: Arc<dyn AuthProvider>,
		remote: Arc<dyn RemoteStore>,
		push: Arc<dyn PushChannel>,
	) -> Arc<Self> {
		let events = CoreEventBus::new(config.channels.event_bus_capacity);
		let sync = Arc::new(SyncService::new(config, auth, remote, push, events.clone()));

		Arc::new(Self { events, sync })
	}

	pub async fn start(&self) -> anyhow::Result<()> {
		self.sync.start().await
	}

	pub async fn shutdown(&self) -> anyhow::Result<()> {
		info!("Waymark core shutting down");
		self.sync.stop().await?;
		info!("Shutdown complete");
		Ok(())
	}

	pub fn sync(&self) -> &Arc<SyncService> {
		&self.sync
	}

	pub fn events(&self) -> &CoreEventBus {
		&self.events
	}
}

/// Install the default tracing subscriber: env-filtered console output,
/// warnings and up for dependencies, debug for this crate.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging() {
	let _ = tracing_subscriber::registry()
		.with(
			EnvFilter::from_default_env()
				.add_directive(LevelFilter::WARN.into())
				.add_directive(
					"wm_core=debug"
						.parse()
						.expect("Error invalid tracing directive!"),
				),
		)
		.with(fmt::layer())
		.try_init();
}
