//! Reconciled bookmark store
//!
//! Pure ordered data: every mutation preserves the newest-first ordering and
//! the one-record-per-identifier invariant, and reports whether the
//! observable sequence changed. Observer notification is the owning actor's
//! job, not the store's.

use crate::domain::{Bookmark, BookmarkId};
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Entry {
	bookmark: Bookmark,
	inserted_at: Instant,
}

/// The canonical in-memory sequence of bookmarks, newest first.
#[derive(Debug, Default)]
pub struct BookmarkStore {
	entries: Vec<Entry>,
}

impl BookmarkStore {
	pub fn new() -> Self {
		Self {
			entries: Vec::new(),
		}
	}

	/// Insert or update a record.
	///
	/// A new identifier lands at the head; an existing identifier has its
	/// fields updated in place and never moves or duplicates. Returns whether
	/// the observable sequence changed, so replays cost nothing downstream.
	pub fn upsert(&mut self, bookmark: Bookmark, now: Instant) -> bool {
		if let Some(entry) = self
			.entries
			.iter_mut()
			.find(|e| e.bookmark.id == bookmark.id)
		{
			if entry.bookmark == bookmark {
				return false;
			}
			entry.bookmark = bookmark;
			return true;
		}

		self.entries.insert(
			0,
			Entry {
				bookmark,
				inserted_at: now,
			},
		);
		true
	}

	/// Remove a record. Unknown identifiers are a no-op.
	pub fn remove(&mut self, id: &BookmarkId) -> bool {
		let before = self.entries.len();
		self.entries.retain(|e| e.bookmark.id != *id);
		self.entries.len() != before
	}

	/// Promote the record at `id` to `with`, in place.
	///
	/// The entry keeps its position and insertion time. If `with.id` is
	/// already present this is a replayed promotion: the stale source entry
	/// (if it survived) is dropped instead, so the durable record never
	/// coexists with its placeholder. If `id` is already gone the record
	/// converges through `upsert`.
	pub fn replace(&mut self, id: &BookmarkId, with: Bookmark, now: Instant) -> bool {
		if self.contains(&with.id) {
			return self.remove(id);
		}

		if let Some(entry) = self.entries.iter_mut().find(|e| e.bookmark.id == *id) {
			entry.bookmark = with;
			return true;
		}

		self.upsert(with, now)
	}

	/// The observable ordered sequence.
	pub fn snapshot(&self) -> Vec<Bookmark> {
		self.entries.iter().map(|e| e.bookmark.clone()).collect()
	}

	pub fn contains(&self, id: &BookmarkId) -> bool {
		self.entries.iter().any(|e| e.bookmark.id == *id)
	}

	pub fn get(&self, id: &BookmarkId) -> Option<&Bookmark> {
		self.entries
			.iter()
			.find(|e| e.bookmark.id == *id)
			.map(|e| &e.bookmark)
	}

	/// When the record first entered the store. Used by the poller's
	/// grace-window check.
	pub fn inserted_at(&self, id: &BookmarkId) -> Option<Instant> {
		self.entries
			.iter()
			.find(|e| e.bookmark.id == *id)
			.map(|e| e.inserted_at)
	}

	/// Durable identifiers currently in the store.
	pub fn durable_ids(&self) -> Vec<BookmarkId> {
		self.entries
			.iter()
			.filter(|e| e.bookmark.id.is_durable())
			.map(|e| e.bookmark.id)
			.collect()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn clear(&mut self) {
		self.entries.clear();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use uuid::Uuid;

	fn bookmark(id: BookmarkId, title: &str) -> Bookmark {
		Bookmark {
			id,
			title: title.to_string(),
			url: format!("https://example.com/{}", title),
			owner_id: "alice".to_string(),
		}
	}

	#[tokio::test]
	async fn test_upsert_is_idempotent() {
		let mut store = BookmarkStore::new();
		let a = bookmark(BookmarkId::Durable(Uuid::new_v4()), "a");

		assert!(store.upsert(a.clone(), Instant::now()));
		let first = store.snapshot();

		assert!(!store.upsert(a, Instant::now()));
		assert_eq!(store.snapshot(), first);
		assert_eq!(store.len(), 1);
	}

	#[tokio::test]
	async fn test_insertion_is_newest_first() {
		let mut store = BookmarkStore::new();
		let r1 = bookmark(BookmarkId::Durable(Uuid::new_v4()), "r1");
		let r2 = bookmark(BookmarkId::Transient(1), "r2");

		store.upsert(r1.clone(), Instant::now());
		store.upsert(r2.clone(), Instant::now());

		assert_eq!(store.snapshot(), vec![r2, r1]);
	}

	#[tokio::test]
	async fn test_field_update_keeps_position() {
		let mut store = BookmarkStore::new();
		let old = bookmark(BookmarkId::Durable(Uuid::new_v4()), "old");
		let newer = bookmark(BookmarkId::Durable(Uuid::new_v4()), "newer");

		store.upsert(old.clone(), Instant::now());
		store.upsert(newer.clone(), Instant::now());

		let mut renamed = old.clone();
		renamed.title = "renamed".to_string();
		assert!(store.upsert(renamed.clone(), Instant::now()));

		assert_eq!(store.snapshot(), vec![newer, renamed]);
	}

	#[tokio::test]
	async fn test_remove_unknown_is_noop() {
		let mut store = BookmarkStore::new();
		store.upsert(
			bookmark(BookmarkId::Durable(Uuid::new_v4()), "a"),
			Instant::now(),
		);

		assert!(!store.remove(&BookmarkId::Durable(Uuid::new_v4())));
		assert_eq!(store.len(), 1);
	}

	#[tokio::test]
	async fn test_replace_preserves_position_and_age() {
		let mut store = BookmarkStore::new();
		let transient = BookmarkId::Transient(1);
		let t0 = Instant::now();

		store.upsert(bookmark(BookmarkId::Durable(Uuid::new_v4()), "older"), t0);
		store.upsert(bookmark(transient, "pending"), t0);
		store.upsert(bookmark(BookmarkId::Durable(Uuid::new_v4()), "newest"), t0);

		let durable = bookmark(BookmarkId::Durable(Uuid::new_v4()), "pending");
		assert!(store.replace(&transient, durable.clone(), Instant::now()));

		let snapshot = store.snapshot();
		assert_eq!(snapshot[1], durable);
		assert_eq!(store.inserted_at(&durable.id), Some(t0));
		assert!(!store.contains(&transient));
	}

	#[tokio::test]
	async fn test_replayed_replace_drops_stale_placeholder() {
		let mut store = BookmarkStore::new();
		let transient = BookmarkId::Transient(1);
		let durable = bookmark(BookmarkId::Durable(Uuid::new_v4()), "a");

		store.upsert(bookmark(transient, "a"), Instant::now());
		store.upsert(durable.clone(), Instant::now());

		store.replace(&transient, durable.clone(), Instant::now());

		assert_eq!(store.len(), 1);
		assert_eq!(store.snapshot(), vec![durable]);
	}
}
