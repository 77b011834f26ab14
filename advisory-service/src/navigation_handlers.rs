use axum::{extract::State, response::Response, Json};
use common_auth::{
    dashboard_route, login_route, AdminGuard, AuthenticatedGuard, GuardDecision, Role, RoleGuard,
    SessionContext,
};
use common_http_errors::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct NavigationResponse {
    pub authenticated: bool,
    pub primary_role: Option<Role>,
    pub roles: Vec<Role>,
    pub dashboard_route: &'static str,
    pub login_route: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct RoleGuardRequest {
    pub allowed_roles: Vec<Role>,
    #[serde(default)]
    pub redirect_to: Option<String>,
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    state.metrics.render()
}

pub async fn session_navigation(ctx: SessionContext) -> Json<NavigationResponse> {
    let primary = ctx.primary_role();
    Json(NavigationResponse {
        authenticated: ctx.session.is_authenticated(),
        primary_role: primary,
        roles: ctx.session.roles.clone(),
        dashboard_route: dashboard_route(primary),
        login_route: login_route(primary),
    })
}

pub async fn admin_guard(State(state): State<AppState>, ctx: SessionContext) -> Json<GuardDecision> {
    let decision = AdminGuard.evaluate(&ctx.session);
    Json(record(&state, "admin", decision))
}

pub async fn authenticated_guard(State(state): State<AppState>, ctx: SessionContext) -> Json<GuardDecision> {
    let decision = AuthenticatedGuard::new(&state.guard_config).evaluate_settled(&ctx.session);
    Json(record(&state, "authenticated", decision))
}

pub async fn role_guard(
    State(state): State<AppState>,
    ctx: SessionContext,
    Json(req): Json<RoleGuardRequest>,
) -> ApiResult<Json<GuardDecision>> {
    let mut guard = RoleGuard::new(req.allowed_roles);
    if let Some(path) = req.redirect_to {
        if !path.starts_with('/') {
            return Err(ApiError::BadRequest {
                code: "invalid_redirect",
                trace_id: Some(ctx.trace_id),
                message: Some(format!("redirect_to must be an absolute path, got {path:?}")),
            });
        }
        guard = guard.with_redirect(path);
    }
    let decision = guard.evaluate(&ctx.session);
    Ok(Json(record(&state, "role", decision)))
}

fn record(state: &AppState, guard: &str, decision: GuardDecision) -> GuardDecision {
    debug!(guard, outcome = decision.outcome(), "guard evaluated");
    state.metrics.guard_decision(guard, decision.outcome());
    decision
}
