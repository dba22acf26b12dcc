//! Pending optimistic mutations
//!
//! Every user write hits the store first and is reconciled against the
//! remote outcome later. Each pending mutation moves `Pending -> Confirmed`
//! or `Pending -> RolledBack`, both terminal; there are no retries and no
//! partial states.

use crate::domain::BookmarkId;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
	Pending,
	Confirmed,
	RolledBack,
}

/// A create applied optimistically, awaiting the remote outcome.
#[derive(Debug, Clone)]
pub struct PendingCreate {
	pub transient: BookmarkId,
	pub owner_id: String,
	pub seq: u64,
	pub state: MutationState,
}

/// What the settle path owes after a create call succeeds remotely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleOutcome {
	/// The entry was still pending: promote the transient record in place.
	Promote,
	/// The record was deleted locally before the create settled; the remote
	/// copy must be deleted so both sides converge.
	Compensate,
	/// Already settled through a confirming push or poll record.
	AlreadySettled,
}

/// Bookkeeping for in-flight optimistic mutations.
///
/// Creates are kept in submission order; that order, together with the
/// owner, is the correlation key used to match confirming records arriving
/// via push or poll before the create call itself settles. Content equality
/// is deliberately not used: titles and urls can collide across distinct
/// records.
#[derive(Debug, Default)]
pub struct MutationQueue {
	creates: VecDeque<PendingCreate>,
	deletes: Vec<BookmarkId>,
	next_seq: u64,
}

impl MutationQueue {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register an optimistic create. Returns its submission sequence.
	pub fn register_create(&mut self, transient: BookmarkId, owner_id: String) -> u64 {
		self.next_seq += 1;
		let seq = self.next_seq;
		self.creates.push_back(PendingCreate {
			transient,
			owner_id,
			seq,
			state: MutationState::Pending,
		});
		seq
	}

	/// The oldest still-pending create for an owner, if any.
	pub fn oldest_pending_create(&self, owner_id: &str) -> Option<BookmarkId> {
		self.creates
			.iter()
			.find(|c| c.state == MutationState::Pending && c.owner_id == owner_id)
			.map(|c| c.transient)
	}

	/// Mark a pending create as promoted by a confirming push/poll record.
	///
	/// The entry stays queued (state `Confirmed`) until the remote call
	/// settles, so a second confirming source cannot re-promote it.
	pub fn promote(&mut self, transient: &BookmarkId) -> bool {
		if let Some(entry) = self.creates.iter_mut().find(|c| c.transient == *transient) {
			if entry.state == MutationState::Pending {
				entry.state = MutationState::Confirmed;
				return true;
			}
		}
		false
	}

	/// Mark a pending create rolled back by a local delete that raced the
	/// confirmation. True if the entry was still pending.
	pub fn cancel_create(&mut self, transient: &BookmarkId) -> bool {
		if let Some(entry) = self.creates.iter_mut().find(|c| c.transient == *transient) {
			if entry.state == MutationState::Pending {
				entry.state = MutationState::RolledBack;
				return true;
			}
		}
		false
	}

	/// Settle a create whose remote call succeeded.
	pub fn settle_create_success(&mut self, transient: &BookmarkId) -> SettleOutcome {
		match self.take_create(transient) {
			Some(entry) => match entry.state {
				MutationState::Pending => SettleOutcome::Promote,
				MutationState::RolledBack => SettleOutcome::Compensate,
				MutationState::Confirmed => SettleOutcome::AlreadySettled,
			},
			None => SettleOutcome::AlreadySettled,
		}
	}

	/// Settle a create whose remote call failed. True if the entry was still
	/// pending, in which case the optimistic record must be rolled back.
	pub fn settle_create_failure(&mut self, transient: &BookmarkId) -> bool {
		matches!(
			self.take_create(transient),
			Some(PendingCreate {
				state: MutationState::Pending,
				..
			})
		)
	}

	/// Register an optimistic delete awaiting the remote outcome.
	pub fn register_delete(&mut self, id: BookmarkId) {
		self.deletes.push(id);
	}

	/// True while an optimistic delete for `id` has not settled; confirming
	/// records for it must not be re-applied in the meantime.
	pub fn has_pending_delete(&self, id: &BookmarkId) -> bool {
		self.deletes.contains(id)
	}

	pub fn settle_delete(&mut self, id: &BookmarkId) -> bool {
		let before = self.deletes.len();
		self.deletes.retain(|d| d != id);
		self.deletes.len() != before
	}

	pub fn is_empty(&self) -> bool {
		self.creates.is_empty() && self.deletes.is_empty()
	}

	pub fn clear(&mut self) {
		self.creates.clear();
		self.deletes.clear();
	}

	fn take_create(&mut self, transient: &BookmarkId) -> Option<PendingCreate> {
		let index = self.creates.iter().position(|c| c.transient == *transient)?;
		self.creates.remove(index)
	}
}
