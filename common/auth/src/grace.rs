//! Runs an [`AuthenticatedGuard`] against a live session feed.
//!
//! The guard re-evaluates whenever the session changes and when its armed
//! logout deadline expires. A session change drops the pending sleep, so a
//! redirect scheduled for a state that no longer holds never fires.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

use crate::guards::{AuthenticatedGuard, GuardDecision};
use crate::session::SessionState;

/// Owns the guard task. Dropping the handle aborts the task.
pub struct GuardHandle {
    decisions: watch::Receiver<GuardDecision>,
    task: JoinHandle<()>,
}

impl GuardHandle {
    pub fn decisions(&self) -> watch::Receiver<GuardDecision> {
        self.decisions.clone()
    }

    pub fn current(&self) -> GuardDecision {
        self.decisions.borrow().clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for GuardHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawn the guard on the current tokio runtime. The first decision is
/// computed before this returns. The task ends after a redirect, or once
/// the session sender is dropped.
pub fn spawn_authenticated_guard(
    mut guard: AuthenticatedGuard,
    mut sessions: watch::Receiver<SessionState>,
) -> GuardHandle {
    let initial = {
        let session = sessions.borrow_and_update().clone();
        guard.observe(&session, Instant::now())
    };
    let (tx, rx) = watch::channel(initial.clone());

    let task = tokio::spawn(async move {
        let mut last = initial;
        while !last.is_redirect() {
            let deadline = guard.pending_deadline();
            tokio::select! {
                changed = sessions.changed() => {
                    if changed.is_err() {
                        debug!("session feed closed, stopping authenticated guard");
                        break;
                    }
                }
                _ = wait_for(deadline) => {}
            }

            let session = sessions.borrow_and_update().clone();
            let decision = guard.observe(&session, Instant::now());
            if decision != last {
                debug!(outcome = decision.outcome(), "authenticated guard decision changed");
                tx.send_replace(decision.clone());
            }
            last = decision;
        }
    });

    GuardHandle { decisions: rx, task }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}
