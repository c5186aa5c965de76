use axum::extract::{Path, State};

use crate::auth::AuthUser;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{VariableSeries, VariableService};

/// GET /api/cenotes/:_key/data/:theme - Measurement series of one theme at one cenote
pub async fn cenote_data(
    State(variables): State<VariableService>,
    user: AuthUser,
    Path((key, theme)): Path<(String, String)>,
) -> ApiResult<Vec<VariableSeries>> {
    Ok(ApiResponse::success(variables.get_data(&user, &key, &theme).await?))
}
