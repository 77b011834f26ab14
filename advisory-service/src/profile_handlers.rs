use axum::{extract::State, Json};
use common_auth::SessionContext;
use common_http_errors::{ApiError, ApiResult};

use crate::profile_completion::{load_profile_completion, ProfileCompletionView};
use crate::{ensure_any_role, AppState, ADVISOR_ROLES};

pub async fn profile_completion(
    State(state): State<AppState>,
    ctx: SessionContext,
) -> ApiResult<Json<ProfileCompletionView>> {
    ensure_any_role(&ctx, ADVISOR_ROLES)?;
    let user_id = ctx
        .session
        .user_id()
        .ok_or(ApiError::Unauthorized { trace_id: Some(ctx.trace_id) })?;
    Ok(Json(load_profile_completion(state.reader.as_ref(), user_id).await))
}
