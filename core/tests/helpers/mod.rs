//! Mock collaborators for the integration suite
//!
//! In-memory stand-ins for the auth, remote store, and push channel
//! boundaries, with the failure/latency knobs the scenarios need.

// Not every test binary uses every knob.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, Notify};
use uuid::Uuid;
use wm_core::{
	AuthProvider, PushChannel, PushEvent, PushEventKind, PushSubscription, RemoteBookmark,
	RemoteError, RemoteStore, SessionEvent, SubscriptionHandle,
};

pub struct MockAuth {
	owner: Mutex<Option<String>>,
	events: broadcast::Sender<SessionEvent>,
}

impl MockAuth {
	pub fn new() -> Arc<Self> {
		Arc::new(Self {
			owner: Mutex::new(None),
			events: broadcast::channel(16).0,
		})
	}

	pub fn log_in(&self, owner_id: &str) {
		*self.owner.lock().unwrap() = Some(owner_id.to_string());
		let _ = self.events.send(SessionEvent::LoggedIn {
			owner_id: owner_id.to_string(),
		});
	}

	pub fn log_out(&self) {
		*self.owner.lock().unwrap() = None;
		let _ = self.events.send(SessionEvent::LoggedOut);
	}
}

impl AuthProvider for MockAuth {
	fn current_owner(&self) -> Option<String> {
		self.owner.lock().unwrap().clone()
	}

	fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
		self.events.subscribe()
	}
}

pub struct MockRemote {
	records: Mutex<Vec<RemoteBookmark>>,
	next_create_id: Mutex<Option<Uuid>>,
	fail_creates: AtomicBool,
	fail_deletes: AtomicBool,
	fail_fetches: AtomicBool,
	hold_creates: AtomicBool,
	create_gate: Notify,
}

impl MockRemote {
	pub fn new() -> Arc<Self> {
		Arc::new(Self {
			records: Mutex::new(Vec::new()),
			next_create_id: Mutex::new(None),
			fail_creates: AtomicBool::new(false),
			fail_deletes: AtomicBool::new(false),
			fail_fetches: AtomicBool::new(false),
			hold_creates: AtomicBool::new(false),
			create_gate: Notify::new(),
		})
	}

	pub fn seed(&self, records: Vec<RemoteBookmark>) {
		*self.records.lock().unwrap() = records;
	}

	pub fn insert_remote(&self, record: RemoteBookmark) {
		self.records.lock().unwrap().insert(0, record);
	}

	pub fn contains(&self, id: Uuid) -> bool {
		self.records.lock().unwrap().iter().any(|r| r.id == id)
	}

	/// Fix the durable id the next create call will assign.
	pub fn set_next_create_id(&self, id: Uuid) {
		*self.next_create_id.lock().unwrap() = Some(id);
	}

	pub fn fail_creates(&self, fail: bool) {
		self.fail_creates.store(fail, Ordering::SeqCst);
	}

	pub fn fail_deletes(&self, fail: bool) {
		self.fail_deletes.store(fail, Ordering::SeqCst);
	}

	pub fn fail_fetches(&self, fail: bool) {
		self.fail_fetches.store(fail, Ordering::SeqCst);
	}

	/// Delay create responses until released. The write itself still lands
	/// remotely first, the way a real store commits before responding, so a
	/// push notification can race ahead of the response.
	pub fn hold_creates(&self) {
		self.hold_creates.store(true, Ordering::SeqCst);
	}

	pub fn release_creates(&self) {
		self.hold_creates.store(false, Ordering::SeqCst);
		self.create_gate.notify_waiters();
	}
}

#[async_trait]
impl RemoteStore for MockRemote {
	async fn fetch_all(&self, owner_id: &str) -> Result<Vec<RemoteBookmark>, RemoteError> {
		if self.fail_fetches.load(Ordering::SeqCst) {
			return Err(RemoteError::FetchFailed("mock outage".to_string()));
		}
		Ok(self
			.records
			.lock()
			.unwrap()
			.iter()
			.filter(|r| r.owner_id == owner_id)
			.cloned()
			.collect())
	}

	async fn create(&self, title: &str, url: &str, owner_id: &str) -> Result<Uuid, RemoteError> {
		if self.fail_creates.load(Ordering::SeqCst) {
			return Err(RemoteError::WriteRejected("mock rejection".to_string()));
		}

		let id = self
			.next_create_id
			.lock()
			.unwrap()
			.take()
			.unwrap_or_else(Uuid::new_v4);
		self.records.lock().unwrap().insert(
			0,
			RemoteBookmark {
				id,
				title: title.to_string(),
				url: url.to_string(),
				owner_id: owner_id.to_string(),
			},
		);

		loop {
			if !self.hold_creates.load(Ordering::SeqCst) {
				break;
			}
			let notified = self.create_gate.notified();
			if !self.hold_creates.load(Ordering::SeqCst) {
				break;
			}
			notified.await;
		}

		Ok(id)
	}

	async fn delete(&self, id: Uuid) -> Result<(), RemoteError> {
		if self.fail_deletes.load(Ordering::SeqCst) {
			return Err(RemoteError::WriteRejected("mock rejection".to_string()));
		}
		self.records.lock().unwrap().retain(|r| r.id != id);
		Ok(())
	}
}

pub struct MockPush {
	subscriptions: Mutex<HashMap<Uuid, async_channel::Sender<PushEvent>>>,
}

impl MockPush {
	pub fn new() -> Arc<Self> {
		Arc::new(Self {
			subscriptions: Mutex::new(HashMap::new()),
		})
	}

	/// Deliver an event to every active subscription.
	pub fn emit(&self, event: PushEvent) {
		for sender in self.subscriptions.lock().unwrap().values() {
			let _ = sender.try_send(event.clone());
		}
	}

	pub fn active_subscriptions(&self) -> usize {
		self.subscriptions.lock().unwrap().len()
	}

	pub fn insert_event(record: &RemoteBookmark) -> PushEvent {
		PushEvent {
			kind: PushEventKind::Insert,
			record: serde_json::to_value(record).unwrap(),
		}
	}

	pub fn update_event(record: &RemoteBookmark) -> PushEvent {
		PushEvent {
			kind: PushEventKind::Update,
			record: serde_json::to_value(record).unwrap(),
		}
	}

	pub fn delete_event(id: Uuid) -> PushEvent {
		PushEvent {
			kind: PushEventKind::Delete,
			record: serde_json::json!({ "id": id }),
		}
	}
}

#[async_trait]
impl PushChannel for MockPush {
	async fn subscribe(&self, _topic: &str) -> Result<PushSubscription, RemoteError> {
		let (tx, rx) = async_channel::bounded(64);
		let handle = SubscriptionHandle(Uuid::new_v4());
		self.subscriptions.lock().unwrap().insert(handle.0, tx);
		Ok(PushSubscription { handle, events: rx })
	}

	async fn unsubscribe(&self, handle: SubscriptionHandle) {
		self.subscriptions.lock().unwrap().remove(&handle.0);
	}
}

pub fn remote_bookmark(title: &str, owner_id: &str) -> RemoteBookmark {
	RemoteBookmark {
		id: Uuid::new_v4(),
		title: title.to_string(),
		url: format!("https://example.com/{}", title),
		owner_id: owner_id.to_string(),
	}
}

/// Poll a condition under the paused test clock until it holds.
pub async fn wait_for<F>(what: &str, condition: F)
where
	F: Fn() -> bool,
{
	let result = tokio::time::timeout(Duration::from_secs(60), async {
		while !condition() {
			tokio::time::sleep(Duration::from_millis(10)).await;
		}
	})
	.await;
	assert!(result.is_ok(), "timed out waiting for: {}", what);
}
