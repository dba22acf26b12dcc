//! Single-owner reconciliation actor
//!
//! All three producers (optimistic mutations, push ingest, poll results)
//! funnel into this task's message stream; the store is mutated nowhere
//! else. Every effect is idempotent and order-independent, which makes the
//! ordering races between push and poll harmless. Remote calls are spawned
//! tasks that report back as messages and never block the actor.

use crate::domain::{Bookmark, BookmarkId, RemoteBookmark};
use crate::error::CoreError;
use crate::infra::event_bus::{CoreEvent, CoreEventBus, WriteOp};
use crate::infra::remote::{RemoteError, RemoteStore};
use crate::service::sync::identity::{IdentityResolver, ResolveAction};
use crate::service::sync::mutation::{MutationQueue, SettleOutcome};
use crate::service::sync::stats::SyncStats;
use crate::service::sync::store::BookmarkStore;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch, Notify};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A decoded push change, ready to apply.
#[derive(Debug, Clone)]
pub(crate) enum PushChange {
	Insert(RemoteBookmark),
	Update(RemoteBookmark),
	Delete(Uuid),
}

/// Messages serialized onto the store-owning actor.
///
/// Producer messages carry the session epoch they were spawned under; the
/// actor drops anything stamped with a stale epoch, so nothing mutates the
/// view after its session is torn down.
#[derive(Debug)]
pub(crate) enum SyncMessage {
	SubmitCreate {
		title: String,
		url: String,
		reply: oneshot::Sender<Result<BookmarkId, CoreError>>,
	},
	SubmitDelete {
		id: BookmarkId,
		reply: oneshot::Sender<Result<(), CoreError>>,
	},
	CreateSettled {
		epoch: u64,
		transient: BookmarkId,
		outcome: Result<Uuid, RemoteError>,
	},
	DeleteSettled {
		epoch: u64,
		id: BookmarkId,
		outcome: Result<(), RemoteError>,
	},
	Push {
		epoch: u64,
		change: PushChange,
	},
	Reconcile {
		epoch: u64,
		records: Vec<RemoteBookmark>,
	},
	SessionStarted {
		epoch: u64,
		owner_id: String,
	},
	SessionEnded {
		epoch: u64,
	},
}

pub(crate) struct SyncActor {
	store: BookmarkStore,
	identity: IdentityResolver,
	mutations: MutationQueue,
	remote: Arc<dyn RemoteStore>,
	events: CoreEventBus,
	stats: Arc<SyncStats>,
	snapshot_tx: watch::Sender<Vec<Bookmark>>,
	self_tx: mpsc::UnboundedSender<SyncMessage>,
	force_poll: Arc<Notify>,
	grace_window: Duration,
	epoch: u64,
	owner_id: Option<String>,
}

impl SyncActor {
	#[allow(clippy::too_many_arguments)]
	pub(crate) fn new(
		remote: Arc<dyn RemoteStore>,
		events: CoreEventBus,
		stats: Arc<SyncStats>,
		snapshot_tx: watch::Sender<Vec<Bookmark>>,
		self_tx: mpsc::UnboundedSender<SyncMessage>,
		force_poll: Arc<Notify>,
		grace_window: Duration,
	) -> Self {
		Self {
			store: BookmarkStore::new(),
			identity: IdentityResolver::new(),
			mutations: MutationQueue::new(),
			remote,
			events,
			stats,
			snapshot_tx,
			self_tx,
			force_poll,
			grace_window,
			epoch: 0,
			owner_id: None,
		}
	}

	pub(crate) async fn run(mut self, mut rx: mpsc::UnboundedReceiver<SyncMessage>) {
		debug!("Reconciliation actor started");

		while let Some(message) = rx.recv().await {
			self.handle(message);
			self.publish();
		}

		debug!("Reconciliation actor stopped");
	}

	/// Publish the current snapshot to observers, suppressed when it is
	/// structurally identical to the previous one (no redraw for no-ops).
	fn publish(&self) {
		self.snapshot_tx.send_if_modified(|current| {
			let next = self.store.snapshot();
			if *current == next {
				false
			} else {
				*current = next;
				true
			}
		});
	}

	fn handle(&mut self, message: SyncMessage) {
		match message {
			SyncMessage::SubmitCreate { title, url, reply } => {
				let _ = reply.send(self.submit_create(title, url));
			}
			SyncMessage::SubmitDelete { id, reply } => {
				let _ = reply.send(self.submit_delete(id));
			}
			SyncMessage::CreateSettled {
				epoch,
				transient,
				outcome,
			} => {
				if self.is_current(epoch) {
					self.create_settled(transient, outcome);
				}
			}
			SyncMessage::DeleteSettled { epoch, id, outcome } => {
				if self.is_current(epoch) {
					self.delete_settled(id, outcome);
				}
			}
			SyncMessage::Push { epoch, change } => {
				if self.is_current(epoch) {
					self.apply_push(change);
				}
			}
			SyncMessage::Reconcile { epoch, records } => {
				if self.is_current(epoch) {
					self.reconcile(records);
				}
			}
			SyncMessage::SessionStarted { epoch, owner_id } => {
				info!(owner_id = %owner_id, epoch, "Session started, rebuilding view");
				self.epoch = epoch;
				self.owner_id = Some(owner_id.clone());
				self.store.clear();
				self.mutations.clear();
				self.events.emit(CoreEvent::SessionChanged {
					owner_id: Some(owner_id),
				});
			}
			SyncMessage::SessionEnded { epoch } => {
				info!(epoch, "Session ended, clearing view");
				self.epoch = epoch;
				self.owner_id = None;
				self.store.clear();
				self.mutations.clear();
				self.events.emit(CoreEvent::SessionChanged { owner_id: None });
			}
		}
	}

	fn is_current(&self, epoch: u64) -> bool {
		if epoch == self.epoch {
			true
		} else {
			debug!(epoch, current = self.epoch, "Dropping message from stale session");
			false
		}
	}

	/// Optimistic create: the transient record is in the store before the
	/// remote call is even issued.
	fn submit_create(&mut self, title: String, url: String) -> Result<BookmarkId, CoreError> {
		let owner_id = self.owner_id.clone().ok_or(CoreError::NoSession)?;

		let transient = self.identity.reserve_transient();
		self.mutations.register_create(transient, owner_id.clone());
		self.store.upsert(
			Bookmark {
				id: transient,
				title: title.clone(),
				url: url.clone(),
				owner_id: owner_id.clone(),
			},
			Instant::now(),
		);

		let remote = self.remote.clone();
		let tx = self.self_tx.clone();
		let epoch = self.epoch;
		tokio::spawn(async move {
			let outcome = remote.create(&title, &url, &owner_id).await;
			let _ = tx.send(SyncMessage::CreateSettled {
				epoch,
				transient,
				outcome,
			});
		});

		Ok(transient)
	}

	/// Optimistic delete: removal happens regardless of what the remote says.
	fn submit_delete(&mut self, id: BookmarkId) -> Result<(), CoreError> {
		if self.owner_id.is_none() {
			return Err(CoreError::NoSession);
		}

		self.store.remove(&id);

		match id {
			BookmarkId::Transient(_) => {
				// The confirming create is still in flight; if it lands, the
				// settle path owes the remote a compensating delete.
				self.mutations.cancel_create(&id);
				Ok(())
			}
			BookmarkId::Durable(uuid) => {
				self.mutations.register_delete(id);

				let remote = self.remote.clone();
				let tx = self.self_tx.clone();
				let epoch = self.epoch;
				tokio::spawn(async move {
					let outcome = remote.delete(uuid).await;
					let _ = tx.send(SyncMessage::DeleteSettled { epoch, id, outcome });
				});
				Ok(())
			}
		}
	}

	fn create_settled(&mut self, transient: BookmarkId, outcome: Result<Uuid, RemoteError>) {
		match outcome {
			Ok(durable) => match self.mutations.settle_create_success(&transient) {
				SettleOutcome::Promote => {
					let promoted = self.store.get(&transient).cloned().map(|existing| Bookmark {
						id: BookmarkId::Durable(durable),
						..existing
					});
					if let Some(promoted) = promoted {
						debug!(transient = %transient, durable = %durable, "Create confirmed, promoting");
						self.store.replace(&transient, promoted, Instant::now());
					}
				}
				SettleOutcome::Compensate => {
					// A local delete raced the confirmation; converge the
					// remote instead of resurrecting the record.
					debug!(durable = %durable, "Create settled after local delete, issuing compensating delete");
					let id = BookmarkId::Durable(durable);
					self.mutations.register_delete(id);

					let remote = self.remote.clone();
					let tx = self.self_tx.clone();
					let epoch = self.epoch;
					tokio::spawn(async move {
						let outcome = remote.delete(durable).await;
						let _ = tx.send(SyncMessage::DeleteSettled { epoch, id, outcome });
					});
				}
				SettleOutcome::AlreadySettled => {
					debug!(transient = %transient, "Create already settled through push or poll");
				}
			},
			Err(error) => {
				if self.mutations.settle_create_failure(&transient) {
					self.store.remove(&transient);
					self.stats.record_rollback();
					warn!(transient = %transient, error = %error, "Create rejected by remote, rolled back");
					self.events.emit(CoreEvent::WriteFailed {
						op: WriteOp::Create,
						message: error.to_string(),
						timestamp: Utc::now(),
					});
				} else {
					debug!(transient = %transient, error = %error, "Create failed after local settle, nothing to roll back");
				}
			}
		}
	}

	fn delete_settled(&mut self, id: BookmarkId, outcome: Result<(), RemoteError>) {
		self.mutations.settle_delete(&id);

		match outcome {
			Ok(()) => {
				debug!(id = %id, "Delete confirmed");
			}
			Err(error) => {
				// The record's prior position is not reconstructed locally;
				// re-fetching authoritative state restores it instead.
				self.stats.record_rollback();
				warn!(id = %id, error = %error, "Delete rejected by remote, forcing reconciliation");
				self.events.emit(CoreEvent::WriteFailed {
					op: WriteOp::Delete,
					message: error.to_string(),
					timestamp: Utc::now(),
				});
				self.force_poll.notify_one();
			}
		}
	}

	fn apply_push(&mut self, change: PushChange) {
		let now = Instant::now();
		match change {
			PushChange::Insert(record) => self.apply_remote_insert(record, now),
			PushChange::Update(record) => {
				// Last writer wins on the delivered fields.
				self.store.upsert(record.into(), now);
			}
			PushChange::Delete(id) => {
				self.store.remove(&BookmarkId::Durable(id));
			}
		}
	}

	/// Route an incoming durable record through identity resolution.
	fn apply_remote_insert(&mut self, record: RemoteBookmark, now: Instant) {
		let bookmark: Bookmark = record.into();
		match self.identity.resolve(&bookmark, &self.store, &self.mutations) {
			ResolveAction::Ignore => {
				self.stats.record_duplicate_ignored();
			}
			ResolveAction::Promote(transient) => {
				debug!(transient = %transient, durable = %bookmark.id, "Incoming record confirms pending create");
				self.mutations.promote(&transient);
				self.store.replace(&transient, bookmark, now);
			}
			ResolveAction::Insert => {
				self.store.upsert(bookmark, now);
			}
		}
	}

	/// Diff a full authoritative snapshot against the store and heal the
	/// divergence silently.
	fn reconcile(&mut self, records: Vec<RemoteBookmark>) {
		let now = Instant::now();
		self.stats.record_poll_completed();

		let remote_ids: HashSet<Uuid> = records.iter().map(|r| r.id).collect();

		// Remote records are applied oldest-first so head insertion
		// reproduces the remote's newest-first order; records already
		// present converge their fields in place.
		for record in records.into_iter().rev() {
			let id = BookmarkId::Durable(record.id);
			if self.store.contains(&id) {
				self.store.upsert(record.into(), now);
			} else {
				self.apply_remote_insert(record, now);
			}
		}

		// Durable records the remote no longer has are removed, unless young
		// enough that replication lag could explain their absence. Transient
		// records are exempt: their confirming insert may not have landed
		// remotely yet.
		for id in self.store.durable_ids() {
			let uuid = match id.as_durable() {
				Some(uuid) => uuid,
				None => continue,
			};
			if remote_ids.contains(&uuid) {
				continue;
			}

			match self.store.inserted_at(&id).map(|at| now.duration_since(at)) {
				Some(age) if age < self.grace_window => {
					debug!(id = %id, age_ms = age.as_millis() as u64, "Absent from poll but within grace window, keeping");
				}
				_ => {
					debug!(id = %id, "Absent from poll, removing");
					self.store.remove(&id);
				}
			}
		}
	}
}
