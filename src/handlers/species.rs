use axum::extract::{Path, State};

use crate::database::models::Species;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::SpeciesService;

/// GET /api/species/inaturalist/:id
pub async fn by_inaturalist_id(State(species): State<SpeciesService>, Path(id): Path<i64>) -> ApiResult<Species> {
    Ok(ApiResponse::success(species.get_by_inaturalist_id(id).await?))
}

/// GET /api/species/aphia/:id
pub async fn by_aphia_id(State(species): State<SpeciesService>, Path(id): Path<i64>) -> ApiResult<Species> {
    Ok(ApiResponse::success(species.get_by_aphia_id(id).await?))
}
