//! Session lifecycle scenarios
//!
//! Login/logout gating of the push subscription and the poller, view resets,
//! and the no-mutation-after-teardown guarantee.

mod helpers;

use helpers::{remote_bookmark, wait_for, MockAuth, MockPush, MockRemote};
use std::sync::Arc;
use std::time::Duration;
use wm_core::{Core, CoreError, SyncConfig};

struct TestApp {
	core: Arc<Core>,
	auth: Arc<MockAuth>,
	remote: Arc<MockRemote>,
	push: Arc<MockPush>,
}

async fn start_app() -> TestApp {
	let auth = MockAuth::new();
	let remote = MockRemote::new();
	let push = MockPush::new();

	let core = Core::new(
		SyncConfig::default(),
		auth.clone(),
		remote.clone(),
		push.clone(),
	);
	core.start().await.unwrap();

	TestApp {
		core,
		auth,
		remote,
		push,
	}
}

#[tokio::test(start_paused = true)]
async fn test_logout_empties_view_and_stops_delivery() {
	let app = start_app().await;
	let record = remote_bookmark("mine", "alice");
	app.remote.seed(vec![record]);

	app.auth.log_in("alice");
	let sync = app.core.sync();
	wait_for("initial fetch to land", || sync.snapshot().len() == 1).await;
	assert_eq!(app.push.active_subscriptions(), 1);

	app.auth.log_out();
	wait_for("view to clear on logout", || sync.snapshot().is_empty()).await;
	wait_for("push subscription to be released", || {
		app.push.active_subscriptions() == 0
	})
	.await;

	// Events delivered after unsubscribe must not mutate anything, and the
	// poller must stay quiet.
	let polls = sync.stats().polls_completed;
	let stray = remote_bookmark("stray", "alice");
	app.push.emit(MockPush::insert_event(&stray));
	tokio::time::sleep(Duration::from_secs(30)).await;

	assert!(sync.snapshot().is_empty());
	assert_eq!(sync.stats().polls_completed, polls);
}

#[tokio::test(start_paused = true)]
async fn test_relogin_replaces_the_view() {
	let app = start_app().await;
	app.remote.seed(vec![
		remote_bookmark("alices", "alice"),
		remote_bookmark("bobs", "bob"),
	]);

	app.auth.log_in("alice");
	let sync = app.core.sync();
	wait_for("alice's view", || {
		sync.snapshot().iter().any(|b| b.title == "alices")
	})
	.await;

	app.auth.log_in("bob");
	wait_for("bob's view", || {
		let snapshot = sync.snapshot();
		snapshot.len() == 1 && snapshot[0].title == "bobs"
	})
	.await;
	assert_eq!(app.push.active_subscriptions(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_mutations_require_a_session() {
	let app = start_app().await;
	let sync = app.core.sync();

	match sync.submit_create("A", "https://a").await {
		Err(CoreError::NoSession) => {}
		other => panic!("expected NoSession, got {:?}", other),
	}
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_releases_session_resources() {
	let app = start_app().await;
	app.remote.seed(vec![remote_bookmark("mine", "alice")]);

	app.auth.log_in("alice");
	let sync = app.core.sync();
	wait_for("initial fetch to land", || sync.snapshot().len() == 1).await;

	app.core.shutdown().await.unwrap();
	wait_for("push subscription to be released", || {
		app.push.active_subscriptions() == 0
	})
	.await;

	match sync.submit_create("A", "https://a").await {
		Err(CoreError::NotRunning) => {}
		other => panic!("expected NotRunning, got {:?}", other),
	}
}
