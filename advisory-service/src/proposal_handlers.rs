use axum::{
    extract::{Path, Query, State},
    Json,
};
use common_auth::SessionContext;
use common_http_errors::{ApiError, ApiResult};
use serde::Deserialize;
use uuid::Uuid;

use crate::proposal_versions::{ProposalVersion, ProposalVersions, ProposalVersionsView, VersionComparison};
use crate::{ensure_any_role, AppState, PROPOSAL_ROLES};

#[derive(Debug, Deserialize)]
pub struct CompareQuery {
    pub from: Uuid,
    pub to: Uuid,
}

async fn load(state: &AppState, ctx: &SessionContext, proposal_id: Uuid) -> ApiResult<ProposalVersions> {
    ensure_any_role(ctx, PROPOSAL_ROLES)?;
    Ok(ProposalVersions::load(state.reader.clone(), proposal_id).await)
}

pub async fn list_versions(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(proposal_id): Path<Uuid>,
) -> ApiResult<Json<ProposalVersionsView>> {
    let versions = load(&state, &ctx, proposal_id).await?;
    Ok(Json(versions.view()))
}

pub async fn get_version(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path((proposal_id, version_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<ProposalVersion>> {
    let versions = load(&state, &ctx, proposal_id).await?;
    versions
        .version_by_id(version_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found("unknown_version", Some(ctx.trace_id)))
}

pub async fn latest_version(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(proposal_id): Path<Uuid>,
) -> ApiResult<Json<ProposalVersion>> {
    let versions = load(&state, &ctx, proposal_id).await?;
    if let Some(message) = versions.error() {
        if versions.versions().is_empty() {
            return Err(ApiError::upstream(message, Some(ctx.trace_id)));
        }
    }
    versions
        .latest()
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found("no_versions", Some(ctx.trace_id)))
}

pub async fn compare_versions(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(proposal_id): Path<Uuid>,
    Query(query): Query<CompareQuery>,
) -> ApiResult<Json<VersionComparison>> {
    let versions = load(&state, &ctx, proposal_id).await?;
    versions
        .compare(query.from, query.to)
        .map(Json)
        .ok_or_else(|| ApiError::not_found("unknown_version", Some(ctx.trace_id)))
}
