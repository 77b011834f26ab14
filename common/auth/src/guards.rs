use serde::{Deserialize, Serialize};
use tokio::time::{Duration, Instant};
use tracing::debug;

use crate::config::GuardConfig;
use crate::roles::Role;
use crate::routes::{dashboard_route, login_route, ADMIN_LOGIN_ROUTE};
use crate::session::{SessionState, UserProfile};

/// What a guard tells the caller to do with the protected subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GuardDecision {
    /// Auth state unresolved; show a placeholder, take no redirect decision.
    Loading,
    Render,
    /// Authenticated, but the current terms of service are not accepted yet.
    AcceptTerms,
    Redirect { to: String },
}

impl GuardDecision {
    pub fn redirect(to: impl Into<String>) -> Self {
        GuardDecision::Redirect { to: to.into() }
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, GuardDecision::Redirect { .. })
    }

    /// Short label for logs and metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            GuardDecision::Loading => "loading",
            GuardDecision::Render => "render",
            GuardDecision::AcceptTerms => "accept_terms",
            GuardDecision::Redirect { .. } => "redirect",
        }
    }
}

/// Admin-only pages. A signed-in non-admin is sent to the login page of the
/// role they actually hold, never to the admin login.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdminGuard;

impl AdminGuard {
    pub fn evaluate(&self, session: &SessionState) -> GuardDecision {
        if session.loading {
            return GuardDecision::Loading;
        }
        if !session.is_authenticated() {
            return GuardDecision::redirect(ADMIN_LOGIN_ROUTE);
        }
        if session.has_role(Role::Admin) {
            return GuardDecision::Render;
        }
        GuardDecision::redirect(login_route(session.primary_role()))
    }
}

/// Blocking terms-of-service acceptance in front of authenticated content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermsGate {
    pub current_version: String,
}

impl TermsGate {
    pub fn new(current_version: impl Into<String>) -> Self {
        Self {
            current_version: current_version.into(),
        }
    }

    pub fn is_satisfied(&self, profile: Option<&UserProfile>) -> bool {
        match profile {
            Some(profile) => {
                profile.terms_accepted_at.is_some()
                    && profile.terms_version.as_deref() == Some(self.current_version.as_str())
            }
            None => false,
        }
    }
}

/// Authenticated-only pages.
///
/// A settled unauthenticated state does not redirect at once: the first
/// observation arms a one-shot deadline `grace_window` ahead and the guard
/// keeps answering [`GuardDecision::Loading`] until it passes. Any
/// observation of a loading or authenticated session disarms it.
#[derive(Debug, Clone)]
pub struct AuthenticatedGuard {
    grace_window: Duration,
    terms: TermsGate,
    deadline: Option<Instant>,
}

impl AuthenticatedGuard {
    pub fn new(config: &GuardConfig) -> Self {
        Self {
            grace_window: config.grace_window,
            terms: TermsGate::new(config.terms_version.clone()),
            deadline: None,
        }
    }

    pub fn grace_window(&self) -> Duration {
        self.grace_window
    }

    /// Deadline of the redirect currently pending, if any.
    pub fn pending_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn observe(&mut self, session: &SessionState, now: Instant) -> GuardDecision {
        if session.loading {
            self.cancel_pending();
            return GuardDecision::Loading;
        }

        if session.is_authenticated() {
            self.cancel_pending();
            return self.authenticated_decision(session);
        }

        let grace = self.grace_window;
        let deadline = *self.deadline.get_or_insert_with(|| {
            debug!(grace_ms = grace.as_millis() as u64, "armed logout grace window");
            now + grace
        });
        if now >= deadline {
            self.deadline = None;
            GuardDecision::redirect(login_route(None))
        } else {
            GuardDecision::Loading
        }
    }

    /// Evaluation for a session that is already settled server side; the
    /// grace window is considered elapsed.
    pub fn evaluate_settled(&self, session: &SessionState) -> GuardDecision {
        if session.loading {
            return GuardDecision::Loading;
        }
        if session.is_authenticated() {
            self.authenticated_decision(session)
        } else {
            GuardDecision::redirect(login_route(None))
        }
    }

    fn authenticated_decision(&self, session: &SessionState) -> GuardDecision {
        if self.terms.is_satisfied(session.profile.as_ref()) {
            GuardDecision::Render
        } else {
            GuardDecision::AcceptTerms
        }
    }

    fn cancel_pending(&mut self) {
        if self.deadline.take().is_some() {
            debug!("cancelled pending logout redirect");
        }
    }
}

/// Pages restricted to an explicit list of roles. Denied users go to the
/// override path when given, otherwise to their own dashboard.
#[derive(Debug, Clone)]
pub struct RoleGuard {
    allowed: Vec<Role>,
    redirect_to: Option<String>,
}

impl RoleGuard {
    pub fn new(allowed: impl Into<Vec<Role>>) -> Self {
        Self {
            allowed: allowed.into(),
            redirect_to: None,
        }
    }

    pub fn with_redirect(mut self, redirect_to: impl Into<String>) -> Self {
        self.redirect_to = Some(redirect_to.into());
        self
    }

    pub fn allowed(&self) -> &[Role] {
        &self.allowed
    }

    pub fn evaluate(&self, session: &SessionState) -> GuardDecision {
        if session.loading {
            return GuardDecision::Loading;
        }
        let primary = session.primary_role();
        match primary {
            Some(role) if self.allowed.contains(&role) => GuardDecision::Render,
            _ => match &self.redirect_to {
                Some(path) => GuardDecision::redirect(path.clone()),
                None => GuardDecision::redirect(dashboard_route(primary)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionUser;
    use chrono::Utc;
    use uuid::Uuid;

    fn signed_in(roles: Vec<Role>) -> SessionState {
        SessionState::authenticated(
            SessionUser {
                id: Uuid::new_v4(),
                email: Some("user@example.com".into()),
            },
            roles,
        )
    }

    fn accepted_profile(version: &str) -> UserProfile {
        UserProfile {
            id: Uuid::new_v4(),
            terms_accepted_at: Some(Utc::now()),
            terms_version: Some(version.to_string()),
            ..UserProfile::default()
        }
    }

    #[test]
    fn admin_guard_waits_while_loading() {
        assert_eq!(AdminGuard.evaluate(&SessionState::loading()), GuardDecision::Loading);
    }

    #[test]
    fn admin_guard_sends_anonymous_to_admin_login() {
        assert_eq!(
            AdminGuard.evaluate(&SessionState::anonymous()),
            GuardDecision::redirect("/admin/login")
        );
    }

    #[test]
    fn admin_guard_sends_advisor_to_advisor_login() {
        assert_eq!(
            AdminGuard.evaluate(&signed_in(vec![Role::Advisor])),
            GuardDecision::redirect("/auth/advisor")
        );
    }

    #[test]
    fn admin_guard_renders_for_admin() {
        assert_eq!(AdminGuard.evaluate(&signed_in(vec![Role::Admin])), GuardDecision::Render);
    }

    #[test]
    fn admin_guard_roleless_user_goes_to_fallback_login() {
        assert_eq!(
            AdminGuard.evaluate(&signed_in(vec![])),
            GuardDecision::redirect("/auth/entrepreneur")
        );
    }

    #[test]
    fn role_guard_allows_listed_primary_role() {
        let guard = RoleGuard::new(vec![Role::Advisor, Role::Admin]);
        assert_eq!(guard.evaluate(&signed_in(vec![Role::Advisor])), GuardDecision::Render);
    }

    #[test]
    fn role_guard_checks_primary_role_only() {
        // An admin who also holds advisor is judged as admin.
        let guard = RoleGuard::new(vec![Role::Advisor]);
        assert_eq!(
            guard.evaluate(&signed_in(vec![Role::Advisor, Role::Admin])),
            GuardDecision::redirect("/admin")
        );
    }

    #[test]
    fn role_guard_uses_override_path() {
        let guard = RoleGuard::new(vec![Role::Admin]).with_redirect("/not-allowed");
        assert_eq!(
            guard.evaluate(&signed_in(vec![Role::Entrepreneur])),
            GuardDecision::redirect("/not-allowed")
        );
    }

    #[test]
    fn role_guard_redirects_roleless_to_root() {
        let guard = RoleGuard::new(vec![Role::Entrepreneur]);
        assert_eq!(guard.evaluate(&SessionState::anonymous()), GuardDecision::redirect("/"));
        assert_eq!(guard.evaluate(&SessionState::loading()), GuardDecision::Loading);
    }

    #[test]
    fn terms_gate_requires_matching_version() {
        let gate = TermsGate::new("2");
        assert!(!gate.is_satisfied(None));
        assert!(!gate.is_satisfied(Some(&accepted_profile("1"))));
        assert!(gate.is_satisfied(Some(&accepted_profile("2"))));
        let unaccepted = UserProfile {
            terms_accepted_at: None,
            ..accepted_profile("2")
        };
        assert!(!gate.is_satisfied(Some(&unaccepted)));
    }

    #[test]
    fn authenticated_guard_holds_redirect_for_grace_window() {
        let mut guard = AuthenticatedGuard::new(&GuardConfig::default());
        let start = Instant::now();
        let anonymous = SessionState::anonymous();

        assert_eq!(guard.observe(&anonymous, start), GuardDecision::Loading);
        assert_eq!(guard.pending_deadline(), Some(start + Duration::from_millis(1000)));
        assert_eq!(
            guard.observe(&anonymous, start + Duration::from_millis(999)),
            GuardDecision::Loading
        );
        assert_eq!(
            guard.observe(&anonymous, start + Duration::from_millis(1000)),
            GuardDecision::redirect("/auth/entrepreneur")
        );
    }

    #[test]
    fn authenticated_guard_cancels_on_login() {
        let mut guard = AuthenticatedGuard::new(&GuardConfig::default());
        let start = Instant::now();
        guard.observe(&SessionState::anonymous(), start);

        let session = signed_in(vec![Role::Entrepreneur]).with_profile(accepted_profile("1"));
        assert_eq!(
            guard.observe(&session, start + Duration::from_millis(500)),
            GuardDecision::Render
        );
        assert_eq!(guard.pending_deadline(), None);

        // A fresh logout arms a fresh window rather than reusing the old one.
        assert_eq!(
            guard.observe(&SessionState::anonymous(), start + Duration::from_millis(1200)),
            GuardDecision::Loading
        );
        assert_eq!(
            guard.pending_deadline(),
            Some(start + Duration::from_millis(2200))
        );
    }

    #[test]
    fn authenticated_guard_loading_never_redirects() {
        let mut guard = AuthenticatedGuard::new(&GuardConfig::default());
        let start = Instant::now();
        for offset in [0u64, 1_000, 5_000] {
            assert_eq!(
                guard.observe(&SessionState::loading(), start + Duration::from_millis(offset)),
                GuardDecision::Loading
            );
        }
        assert_eq!(guard.pending_deadline(), None);
    }

    #[test]
    fn authenticated_guard_gates_on_terms() {
        let guard = AuthenticatedGuard::new(&GuardConfig::new("3"));
        let session = signed_in(vec![Role::Advisor]).with_profile(accepted_profile("2"));
        assert_eq!(guard.evaluate_settled(&session), GuardDecision::AcceptTerms);
        assert_eq!(
            guard.evaluate_settled(&SessionState::anonymous()),
            GuardDecision::redirect("/auth/entrepreneur")
        );
    }

    #[test]
    fn decision_serializes_with_tag() {
        let json = serde_json::to_value(GuardDecision::redirect("/admin/login")).unwrap();
        assert_eq!(json, serde_json::json!({"decision": "redirect", "to": "/admin/login"}));
        let json = serde_json::to_value(GuardDecision::AcceptTerms).unwrap();
        assert_eq!(json, serde_json::json!({"decision": "accept_terms"}));
    }
}
