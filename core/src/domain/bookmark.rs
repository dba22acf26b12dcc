//! Bookmark records and their two-space identifier

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier for a bookmark record.
///
/// A `Transient` id is a local placeholder for a record whose confirming
/// create has not yet settled; a `Durable` id is assigned by the remote store
/// and stable forever. Keeping the two spaces as distinct variants means a
/// placeholder can never be mistaken for a real key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum BookmarkId {
	Transient(u64),
	Durable(Uuid),
}

impl BookmarkId {
	pub fn is_transient(&self) -> bool {
		matches!(self, BookmarkId::Transient(_))
	}

	pub fn is_durable(&self) -> bool {
		matches!(self, BookmarkId::Durable(_))
	}

	/// The durable uuid, if this id has one.
	pub fn as_durable(&self) -> Option<Uuid> {
		match self {
			BookmarkId::Durable(id) => Some(*id),
			BookmarkId::Transient(_) => None,
		}
	}
}

impl fmt::Display for BookmarkId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			BookmarkId::Transient(n) => write!(f, "transient:{}", n),
			BookmarkId::Durable(id) => write!(f, "{}", id),
		}
	}
}

/// A bookmark as held in the reconciled view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
	pub id: BookmarkId,
	pub title: String,
	pub url: String,
	pub owner_id: String,
}

/// The wire shape of a bookmark at the remote boundary.
///
/// The remote store and the push channel only ever speak durable
/// identifiers; transient ids never leave the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteBookmark {
	pub id: Uuid,
	pub title: String,
	pub url: String,
	pub owner_id: String,
}

impl From<RemoteBookmark> for Bookmark {
	fn from(remote: RemoteBookmark) -> Self {
		Self {
			id: BookmarkId::Durable(remote.id),
			title: remote.title,
			url: remote.url,
			owner_id: remote.owner_id,
		}
	}
}
