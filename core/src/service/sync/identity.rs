//! Identity resolution between transient and durable records
//!
//! Arbitrates between the three producers so a record inserted
//! optimistically is never shown twice when its confirming push event or
//! poll result arrives.

use crate::domain::{Bookmark, BookmarkId};
use crate::service::sync::mutation::MutationQueue;
use crate::service::sync::store::BookmarkStore;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

/// How an incoming durable record relates to the current view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveAction {
	/// Already accounted for; applying again would be a duplicate.
	Ignore,
	/// Confirms a pending optimistic create: promote that transient record.
	Promote(BookmarkId),
	/// Genuinely new.
	Insert,
}

/// Reserves transient identifiers and classifies incoming records.
#[derive(Debug, Default)]
pub struct IdentityResolver {
	next_transient: AtomicU64,
}

impl IdentityResolver {
	pub fn new() -> Self {
		Self {
			next_transient: AtomicU64::new(0),
		}
	}

	/// Reserve a process-unique transient identifier.
	///
	/// The tagged id type keeps the transient space disjoint from the
	/// durable one, so a counter is enough.
	pub fn reserve_transient(&self) -> BookmarkId {
		BookmarkId::Transient(self.next_transient.fetch_add(1, Ordering::Relaxed) + 1)
	}

	/// Classify an incoming record against the store and pending mutations.
	///
	/// Promotion matches on the pending entry's correlation key (owner plus
	/// submission order), never on title/url equality: contents can collide
	/// across distinct records. First application wins; replays of the same
	/// durable id are `Ignore`.
	pub fn resolve(
		&self,
		incoming: &Bookmark,
		store: &BookmarkStore,
		pending: &MutationQueue,
	) -> ResolveAction {
		if store.contains(&incoming.id) {
			return ResolveAction::Ignore;
		}

		// An optimistically deleted record must not be resurrected by a
		// confirming source that has not observed the delete yet.
		if pending.has_pending_delete(&incoming.id) {
			return ResolveAction::Ignore;
		}

		if !incoming.id.is_durable() {
			// Cannot classify a record that does not carry a durable id.
			// Fail open toward showing it rather than silently dropping a
			// real record.
			warn!(id = %incoming.id, "Incoming record without durable id, treating as insert");
			return ResolveAction::Insert;
		}

		if let Some(transient) = pending.oldest_pending_create(&incoming.owner_id) {
			return ResolveAction::Promote(transient);
		}

		ResolveAction::Insert
	}
}
