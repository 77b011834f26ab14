use axum::{
    extract::{Path, State},
    Json,
};
use common_auth::{RequireSession, SessionContext};
use common_http_errors::{ApiError, ApiResult};
use serde::Serialize;

use crate::approval_chain::{ApprovalChainSnapshot, NextStep, PaymentStatusDefinition};
use crate::{ensure_any_role, AppState, ADMIN_ROLES};

#[derive(Debug, Serialize)]
pub struct NextStatusResponse {
    pub code: String,
    pub is_terminal: bool,
    pub current_step_index: i32,
    pub total_steps: usize,
    pub next_step: Option<NextStep>,
}

pub async fn list_statuses(
    State(state): State<AppState>,
    RequireSession(_ctx): RequireSession,
) -> Json<ApprovalChainSnapshot> {
    Json(state.approval_chain.snapshot().await)
}

pub async fn get_status(
    State(state): State<AppState>,
    RequireSession(ctx): RequireSession,
    Path(code): Path<String>,
) -> ApiResult<Json<PaymentStatusDefinition>> {
    let chain = state.approval_chain.chain().await;
    chain
        .status_by_code(&code)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found("unknown_status", Some(ctx.trace_id)))
}

/// Unknown codes are not an error here: the chain answers with no next step
/// and index -1.
pub async fn next_status(
    State(state): State<AppState>,
    RequireSession(_ctx): RequireSession,
    Path(code): Path<String>,
) -> Json<NextStatusResponse> {
    let chain = state.approval_chain.chain().await;
    Json(NextStatusResponse {
        is_terminal: chain.is_terminal(&code),
        current_step_index: chain.current_step_index(&code),
        total_steps: chain.total_steps(),
        next_step: chain.next_step(&code),
        code,
    })
}

pub async fn refresh_statuses(
    State(state): State<AppState>,
    ctx: SessionContext,
) -> ApiResult<Json<ApprovalChainSnapshot>> {
    ensure_any_role(&ctx, ADMIN_ROLES)?;
    tracing::info!(user_id = ?ctx.session.user_id(), "refreshing payment status catalog");
    Ok(Json(state.approval_chain.refresh().await))
}
