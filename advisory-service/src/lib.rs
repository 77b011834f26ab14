use std::sync::Arc;

use axum::{
    body::Body,
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use common_auth::{GuardConfig, Role, SessionContext};
use common_http_errors::ApiError;
use common_observability::AdvisoryMetrics;
use tracing::{field, Instrument};

pub mod approval_chain;
pub mod backend;
pub mod config;
pub mod navigation_handlers;
pub mod payment_status_handlers;
pub mod profile_completion;
pub mod profile_handlers;
pub mod proposal_handlers;
pub mod proposal_versions;

use crate::approval_chain::ApprovalChainCache;
use crate::backend::{MeteredTableReader, TableReader};

pub const PROPOSAL_ROLES: &[Role] = &[Role::Advisor, Role::Entrepreneur, Role::Admin];
pub const ADVISOR_ROLES: &[Role] = &[Role::Advisor];
pub const ADMIN_ROLES: &[Role] = &[Role::Admin];

#[derive(Clone)]
pub struct AppState {
    pub reader: Arc<dyn TableReader>,
    pub approval_chain: Arc<ApprovalChainCache>,
    pub guard_config: Arc<GuardConfig>,
    pub metrics: Arc<AdvisoryMetrics>,
}

impl AppState {
    /// Wraps `reader` with fetch metrics and builds the shared status cache.
    pub fn new(reader: Arc<dyn TableReader>, guard_config: GuardConfig, metrics: Arc<AdvisoryMetrics>) -> Self {
        let reader: Arc<dyn TableReader> = Arc::new(MeteredTableReader::new(reader, metrics.clone()));
        Self {
            approval_chain: Arc::new(ApprovalChainCache::new(reader.clone())),
            reader,
            guard_config: Arc::new(guard_config),
            metrics,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/metrics", get(navigation_handlers::metrics))
        .route("/session/navigation", get(navigation_handlers::session_navigation))
        .route("/guards/admin", get(navigation_handlers::admin_guard))
        .route("/guards/authenticated", get(navigation_handlers::authenticated_guard))
        .route("/guards/roles", post(navigation_handlers::role_guard))
        .route("/payment-statuses", get(payment_status_handlers::list_statuses))
        .route("/payment-statuses/:code", get(payment_status_handlers::get_status))
        .route("/payment-statuses/:code/next", get(payment_status_handlers::next_status))
        .route(
            "/admin/payment-statuses/refresh",
            post(payment_status_handlers::refresh_statuses),
        )
        .route("/proposals/:proposal_id/versions", get(proposal_handlers::list_versions))
        .route(
            "/proposals/:proposal_id/versions/:version_id",
            get(proposal_handlers::get_version),
        )
        .route(
            "/proposals/:proposal_id/latest-version",
            get(proposal_handlers::latest_version),
        )
        .route(
            "/proposals/:proposal_id/version-comparison",
            get(proposal_handlers::compare_versions),
        )
        .route(
            "/advisors/me/profile-completion",
            get(profile_handlers::profile_completion),
        )
        .layer(middleware::from_fn(request_span))
        .with_state(state)
}

/// Opens the per-request span that `SessionContext` fills with the trace and
/// user ids.
pub async fn request_span(req: Request<Body>, next: Next) -> Response {
    let span = tracing::info_span!(
        "request",
        method = %req.method(),
        path = %req.uri().path(),
        trace_id = field::Empty,
        user_id = field::Empty,
    );
    async move {
        let resp = next.run(req).await;
        tracing::debug!(status = resp.status().as_u16(), "request finished");
        resp
    }
    .instrument(span)
    .await
}

/// Rejects anonymous sessions, then sessions holding none of `allowed`.
pub fn ensure_any_role(ctx: &SessionContext, allowed: &[Role]) -> Result<(), ApiError> {
    let trace_id = Some(ctx.trace_id);
    if !ctx.session.is_authenticated() {
        return Err(ApiError::Unauthorized { trace_id });
    }
    if allowed.iter().any(|role| ctx.session.has_role(*role)) {
        return Ok(());
    }
    let role = allowed.first().map(Role::as_str).unwrap_or("unknown");
    tracing::warn!(user_id = ?ctx.session.user_id(), required = role, "role check failed");
    Err(ApiError::ForbiddenMissingRole { role, trace_id })
}
