//! Core error taxonomy

use crate::infra::remote::RemoteError;
use thiserror::Error;

/// Errors surfaced by the core's public API.
///
/// Nothing in here is fatal to the reconciliation loop; remote write
/// failures are rolled back locally and reported through the event bus.
#[derive(Error, Debug)]
pub enum CoreError {
	#[error("no active session")]
	NoSession,

	#[error("sync service is not running")]
	NotRunning,

	#[error("remote call failed: {0}")]
	Remote(#[from] RemoteError),
}
