//! Auth collaborator boundary
//!
//! Session state is owned by an external auth component; the core only
//! consumes the current owner and a login/logout event stream. Login
//! activates the push subscription and the reconciliation poller, logout
//! tears both down and empties the record store.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Session lifecycle notifications from the auth collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
	LoggedIn { owner_id: String },
	LoggedOut,
}

/// Supplies the current session owner and session-change notifications.
pub trait AuthProvider: Send + Sync {
	fn current_owner(&self) -> Option<String>;

	fn subscribe(&self) -> broadcast::Receiver<SessionEvent>;
}
