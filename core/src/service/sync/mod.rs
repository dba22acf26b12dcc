//! Bookmark sync service
//!
//! Background service that keeps the reconciled bookmark view converged
//! across three producers: optimistic local mutations, the push channel, and
//! the periodic full-state poll. The store itself is owned by a single actor
//! task; this module wires the actor to the session lifecycle and exposes
//! the public mutation/observation API.

mod actor;
mod ingest;
mod poller;

pub mod identity;
pub mod mutation;
pub mod stats;
pub mod store;

pub use identity::{IdentityResolver, ResolveAction};
pub use mutation::{MutationQueue, MutationState, SettleOutcome};
pub use stats::{SyncStats, SyncStatsSnapshot};
pub use store::BookmarkStore;

use crate::config::SyncConfig;
use crate::domain::{Bookmark, BookmarkId};
use crate::error::CoreError;
use crate::infra::auth::{AuthProvider, SessionEvent};
use crate::infra::event_bus::{CoreEvent, CoreEventBus};
use crate::infra::remote::{PushChannel, RemoteStore, SubscriptionHandle};
use actor::{SyncActor, SyncMessage};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Session-scoped resources: the push subscription and both per-session
/// tasks. Acquired on login, released on logout, replacement, or service
/// stop; nothing it owns outlives the session.
struct SessionRuntime {
	owner_id: String,
	subscription: Option<SubscriptionHandle>,
	push_task: Option<JoinHandle<()>>,
	poll_task: JoinHandle<()>,
}

type ActorParts = (
	mpsc::UnboundedReceiver<SyncMessage>,
	watch::Sender<Vec<Bookmark>>,
);

/// Sync service for the bookmark view.
///
/// Runs for the lifetime of the core; per-session work (push subscription,
/// poller) is activated and deactivated as the auth collaborator reports
/// logins and logouts.
pub struct SyncService {
	config: SyncConfig,
	auth: Arc<dyn AuthProvider>,
	remote: Arc<dyn RemoteStore>,
	push: Arc<dyn PushChannel>,
	events: CoreEventBus,
	stats: Arc<SyncStats>,

	tx: mpsc::UnboundedSender<SyncMessage>,
	actor_parts: Mutex<Option<ActorParts>>,
	snapshot_rx: watch::Receiver<Vec<Bookmark>>,
	force_poll: Arc<Notify>,
	epoch: Arc<AtomicU64>,

	is_running: AtomicBool,
	shutdown_tx: Mutex<Option<broadcast::Sender<()>>>,
}

impl SyncService {
	pub fn new(
		config: SyncConfig,
		auth: Arc<dyn AuthProvider>,
		remote: Arc<dyn RemoteStore>,
		push: Arc<dyn PushChannel>,
		events: CoreEventBus,
	) -> Self {
		let (tx, rx) = mpsc::unbounded_channel();
		let (snapshot_tx, snapshot_rx) = watch::channel(Vec::new());

		Self {
			config,
			auth,
			remote,
			push,
			events,
			stats: Arc::new(SyncStats::default()),
			tx,
			actor_parts: Mutex::new(Some((rx, snapshot_tx))),
			snapshot_rx,
			force_poll: Arc::new(Notify::new()),
			epoch: Arc::new(AtomicU64::new(0)),
			is_running: AtomicBool::new(false),
			shutdown_tx: Mutex::new(None),
		}
	}

	/// Create a bookmark optimistically.
	///
	/// The returned identifier is transient until the remote confirms the
	/// write, at which point the record is promoted in place.
	pub async fn submit_create(
		&self,
		title: impl Into<String>,
		url: impl Into<String>,
	) -> Result<BookmarkId, CoreError> {
		if !self.is_running.load(Ordering::SeqCst) {
			return Err(CoreError::NotRunning);
		}

		let (reply, rx) = oneshot::channel();
		self.tx
			.send(SyncMessage::SubmitCreate {
				title: title.into(),
				url: url.into(),
				reply,
			})
			.map_err(|_| CoreError::NotRunning)?;
		rx.await.map_err(|_| CoreError::NotRunning)?
	}

	/// Delete a bookmark optimistically.
	pub async fn submit_delete(&self, id: BookmarkId) -> Result<(), CoreError> {
		if !self.is_running.load(Ordering::SeqCst) {
			return Err(CoreError::NotRunning);
		}

		let (reply, rx) = oneshot::channel();
		self.tx
			.send(SyncMessage::SubmitDelete { id, reply })
			.map_err(|_| CoreError::NotRunning)?;
		rx.await.map_err(|_| CoreError::NotRunning)?
	}

	/// Current reconciled view, newest first.
	pub fn snapshot(&self) -> Vec<Bookmark> {
		self.snapshot_rx.borrow().clone()
	}

	/// Watch the reconciled view. Values are published only when the
	/// sequence actually changes, so observers never redraw for no-ops.
	pub fn subscribe_snapshots(&self) -> watch::Receiver<Vec<Bookmark>> {
		self.snapshot_rx.clone()
	}

	pub fn subscribe_events(&self) -> broadcast::Receiver<CoreEvent> {
		self.events.subscribe()
	}

	pub fn stats(&self) -> SyncStatsSnapshot {
		self.stats.snapshot()
	}

	/// Supervises session lifecycle: activates push + poller on login,
	/// tears them down on logout or shutdown.
	#[allow(clippy::too_many_arguments)]
	async fn run_session_loop(
		config: SyncConfig,
		auth: Arc<dyn AuthProvider>,
		remote: Arc<dyn RemoteStore>,
		push: Arc<dyn PushChannel>,
		tx: mpsc::UnboundedSender<SyncMessage>,
		force_poll: Arc<Notify>,
		stats: Arc<SyncStats>,
		epoch: Arc<AtomicU64>,
		mut shutdown_rx: broadcast::Receiver<()>,
	) {
		let mut session_rx = auth.subscribe();
		let mut runtime: Option<SessionRuntime> = None;

		// A session may already exist when the service starts.
		if let Some(owner_id) = auth.current_owner() {
			runtime = Some(
				Self::activate_session(
					&config,
					&remote,
					&push,
					&tx,
					&force_poll,
					&stats,
					&epoch,
					owner_id,
				)
				.await,
			);
		}

		loop {
			tokio::select! {
				event = session_rx.recv() => match event {
					Ok(SessionEvent::LoggedIn { owner_id }) => {
						Self::deactivate_session(&push, &mut runtime).await;
						runtime = Some(
							Self::activate_session(
								&config,
								&remote,
								&push,
								&tx,
								&force_poll,
								&stats,
								&epoch,
								owner_id,
							)
							.await,
						);
					}
					Ok(SessionEvent::LoggedOut) => {
						Self::deactivate_session(&push, &mut runtime).await;
						let next = epoch.fetch_add(1, Ordering::SeqCst) + 1;
						let _ = tx.send(SyncMessage::SessionEnded { epoch: next });
					}
					Err(broadcast::error::RecvError::Lagged(skipped)) => {
						warn!(skipped, "Session event stream lagged");
					}
					Err(broadcast::error::RecvError::Closed) => {
						debug!("Session event stream closed");
						break;
					}
				},
				_ = shutdown_rx.recv() => {
					break;
				}
			}
		}

		Self::deactivate_session(&push, &mut runtime).await;
		debug!("Session supervisor stopped");
	}

	#[allow(clippy::too_many_arguments)]
	async fn activate_session(
		config: &SyncConfig,
		remote: &Arc<dyn RemoteStore>,
		push: &Arc<dyn PushChannel>,
		tx: &mpsc::UnboundedSender<SyncMessage>,
		force_poll: &Arc<Notify>,
		stats: &Arc<SyncStats>,
		epoch: &Arc<AtomicU64>,
		owner_id: String,
	) -> SessionRuntime {
		let session_epoch = epoch.fetch_add(1, Ordering::SeqCst) + 1;
		let _ = tx.send(SyncMessage::SessionStarted {
			epoch: session_epoch,
			owner_id: owner_id.clone(),
		});

		let topic = format!("bookmarks:{}", owner_id);
		let (subscription, push_task) = match push.subscribe(&topic).await {
			Ok(subscription) => {
				let task = tokio::spawn(ingest::run(
					subscription.events,
					tx.clone(),
					session_epoch,
					stats.clone(),
				));
				(Some(subscription.handle), Some(task))
			}
			Err(error) => {
				// The poller alone still converges the view; push is
				// advisory.
				warn!(topic = %topic, error = %error, "Push subscribe failed, converging through polls only");
				(None, None)
			}
		};

		let poll_task = tokio::spawn(poller::run(
			remote.clone(),
			owner_id.clone(),
			tx.clone(),
			session_epoch,
			config.poll.interval(),
			config.poll.failure_warn_threshold,
			force_poll.clone(),
			stats.clone(),
		));

		info!(owner_id = %owner_id, epoch = session_epoch, "Session activated");

		SessionRuntime {
			owner_id,
			subscription,
			push_task,
			poll_task,
		}
	}

	async fn deactivate_session(push: &Arc<dyn PushChannel>, runtime: &mut Option<SessionRuntime>) {
		if let Some(runtime) = runtime.take() {
			if let Some(handle) = runtime.subscription {
				push.unsubscribe(handle).await;
			}
			if let Some(task) = runtime.push_task {
				task.abort();
			}
			runtime.poll_task.abort();

			info!(owner_id = %runtime.owner_id, "Session deactivated");
		}
	}
}

#[async_trait]
impl crate::service::Service for SyncService {
	fn name(&self) -> &'static str {
		"bookmark_sync"
	}

	fn is_running(&self) -> bool {
		self.is_running.load(Ordering::SeqCst)
	}

	async fn start(&self) -> Result<()> {
		if self.is_running.load(Ordering::SeqCst) {
			warn!("Sync service already running");
			return Ok(());
		}

		info!("Starting bookmark sync service");

		// The actor is spawned once and survives stop/start cycles; only the
		// session supervisor is per-run.
		if let Some((rx, snapshot_tx)) = self.actor_parts.lock().await.take() {
			let actor = SyncActor::new(
				self.remote.clone(),
				self.events.clone(),
				self.stats.clone(),
				snapshot_tx,
				self.tx.clone(),
				self.force_poll.clone(),
				self.config.poll.grace_window(),
			);
			tokio::spawn(actor.run(rx));
		}

		let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
		*self.shutdown_tx.lock().await = Some(shutdown_tx);
		self.is_running.store(true, Ordering::SeqCst);

		tokio::spawn(Self::run_session_loop(
			self.config.clone(),
			self.auth.clone(),
			self.remote.clone(),
			self.push.clone(),
			self.tx.clone(),
			self.force_poll.clone(),
			self.stats.clone(),
			self.epoch.clone(),
			shutdown_rx,
		));

		info!("Bookmark sync service started");

		Ok(())
	}

	async fn stop(&self) -> Result<()> {
		if !self.is_running.load(Ordering::SeqCst) {
			return Ok(());
		}

		info!("Stopping bookmark sync service");

		if let Some(shutdown_tx) = self.shutdown_tx.lock().await.as_ref() {
			let _ = shutdown_tx.send(());
		}
		self.is_running.store(false, Ordering::SeqCst);

		info!("Bookmark sync service stopped");

		Ok(())
	}
}
