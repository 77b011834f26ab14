use std::time::Duration;

use chrono::Utc;
use common_auth::{
    spawn_authenticated_guard, AuthenticatedGuard, GuardConfig, GuardDecision, Role, SessionState,
    SessionUser, UserProfile,
};
use tokio::sync::watch;
use tokio::time::{sleep, Instant};
use uuid::Uuid;

fn signed_in() -> SessionState {
    let id = Uuid::new_v4();
    SessionState::authenticated(SessionUser { id, email: None }, vec![Role::Entrepreneur]).with_profile(
        UserProfile {
            id,
            terms_accepted_at: Some(Utc::now()),
            terms_version: Some("1".into()),
            ..UserProfile::default()
        },
    )
}

fn guard() -> AuthenticatedGuard {
    AuthenticatedGuard::new(&GuardConfig::default())
}

#[tokio::test(start_paused = true)]
async fn no_redirect_before_grace_window_elapses() {
    let start = Instant::now();
    let (_tx, rx) = watch::channel(SessionState::anonymous());
    let handle = spawn_authenticated_guard(guard(), rx);
    let mut decisions = handle.decisions();
    assert_eq!(handle.current(), GuardDecision::Loading);

    sleep(Duration::from_millis(999)).await;
    assert_eq!(handle.current(), GuardDecision::Loading);

    decisions.changed().await.expect("guard still running");
    assert_eq!(
        *decisions.borrow_and_update(),
        GuardDecision::redirect("/auth/entrepreneur")
    );
    assert!(start.elapsed() >= Duration::from_millis(1000));
}

#[tokio::test(start_paused = true)]
async fn login_within_window_cancels_redirect() {
    let (tx, rx) = watch::channel(SessionState::anonymous());
    let handle = spawn_authenticated_guard(guard(), rx);
    let mut decisions = handle.decisions();

    sleep(Duration::from_millis(500)).await;
    tx.send(signed_in()).expect("guard listening");
    decisions.changed().await.expect("guard still running");
    assert_eq!(*decisions.borrow_and_update(), GuardDecision::Render);

    sleep(Duration::from_millis(2_000)).await;
    assert_eq!(handle.current(), GuardDecision::Render);
    assert!(!handle.is_finished());
}

#[tokio::test(start_paused = true)]
async fn unmount_drops_pending_redirect() {
    let (tx, rx) = watch::channel(SessionState::anonymous());
    let handle = spawn_authenticated_guard(guard(), rx);

    sleep(Duration::from_millis(500)).await;
    drop(tx);
    sleep(Duration::from_millis(2_000)).await;

    assert_eq!(handle.current(), GuardDecision::Loading);
    assert!(handle.is_finished());
}

#[tokio::test(start_paused = true)]
async fn window_starts_when_loading_finishes() {
    let start = Instant::now();
    let (tx, rx) = watch::channel(SessionState::loading());
    let handle = spawn_authenticated_guard(guard(), rx);
    let mut decisions = handle.decisions();

    sleep(Duration::from_millis(300)).await;
    tx.send(SessionState::anonymous()).expect("guard listening");

    sleep(Duration::from_millis(999)).await;
    assert_eq!(handle.current(), GuardDecision::Loading);

    decisions.changed().await.expect("guard still running");
    assert!(decisions.borrow_and_update().is_redirect());
    assert!(start.elapsed() >= Duration::from_millis(1_300));
}

#[tokio::test(start_paused = true)]
async fn custom_grace_window_is_honoured() {
    let start = Instant::now();
    let config = GuardConfig::default().with_grace_window(Duration::from_millis(250));
    let (_tx, rx) = watch::channel(SessionState::anonymous());
    let handle = spawn_authenticated_guard(AuthenticatedGuard::new(&config), rx);
    let mut decisions = handle.decisions();

    decisions.changed().await.expect("guard still running");
    assert!(decisions.borrow_and_update().is_redirect());
    assert!(start.elapsed() >= Duration::from_millis(250));
    assert!(start.elapsed() < Duration::from_millis(1_000));
}
