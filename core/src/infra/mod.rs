//! Collaborator boundaries and in-process infrastructure
//!
//! Auth, the remote store, and the push channel are external systems; the
//! core only specifies their contracts and consumes them as trait objects.

pub mod auth;
pub mod event_bus;
pub mod remote;

pub use auth::{AuthProvider, SessionEvent};
pub use event_bus::{CoreEvent, CoreEventBus, WriteOp};
pub use remote::{
	PushChannel, PushEvent, PushEventKind, PushSubscription, RemoteError, RemoteStore,
	SubscriptionHandle,
};
