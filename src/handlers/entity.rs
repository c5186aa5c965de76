use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRef, Path, Query, State,
    },
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;

use crate::app::AppState;
use crate::auth::AuthUser;
use crate::database::Page;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CsvResponse};
use crate::services::EntityService;

use super::{json_body, query_params};

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<usize>,
    pub continuation_token: Option<String>,
}

/// The REST surface shared by every entity: list, get, create, update,
/// delete and the CSV pair.
pub fn entity_routes<S>() -> Router<AppState>
where
    S: EntityService + Clone + FromRef<AppState> + 'static,
{
    Router::new()
        .route("/", get(list::<S>).post(create::<S>))
        .route("/csv", get(export_csv::<S>).put(import_csv::<S>))
        .route("/:_key", get(show::<S>).put(update::<S>).delete(remove::<S>))
}

/// GET /api/<entity> - One page of visible documents
async fn list<S>(
    State(service): State<S>,
    user: AuthUser,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Page<S::Entity>>
where
    S: EntityService + Clone + 'static,
{
    let query = query_params(query)?;
    let page = service.page_request(query.limit, query.continuation_token);
    Ok(ApiResponse::success(service.list(&user, page).await?))
}

/// GET /api/<entity>/:_key
async fn show<S>(State(service): State<S>, user: AuthUser, Path(key): Path<String>) -> ApiResult<S::Entity>
where
    S: EntityService + Clone + 'static,
{
    Ok(ApiResponse::success(service.get(&user, &key).await?))
}

/// POST /api/<entity>
async fn create<S>(
    State(service): State<S>,
    user: AuthUser,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<S::Entity>
where
    S: EntityService + Clone + 'static,
{
    let data = json_body(body)?;
    Ok(ApiResponse::created(service.create(&user, data).await?))
}

/// PUT /api/<entity>/:_key
async fn update<S>(
    State(service): State<S>,
    user: AuthUser,
    Path(key): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<S::Entity>
where
    S: EntityService + Clone + 'static,
{
    let data = json_body(body)?;
    Ok(ApiResponse::success(service.update(&user, &key, data).await?))
}

/// DELETE /api/<entity>/:_key
async fn remove<S>(State(service): State<S>, user: AuthUser, Path(key): Path<String>) -> ApiResult<()>
where
    S: EntityService + Clone + 'static,
{
    service.delete(&user, &key).await?;
    Ok(ApiResponse::no_content())
}

/// GET /api/<entity>/csv - Every visible document as `text/csv`
async fn export_csv<S>(State(service): State<S>, user: AuthUser) -> Result<CsvResponse, ApiError>
where
    S: EntityService + Clone + 'static,
{
    Ok(CsvResponse(service.to_csv(&user).await?))
}

/// PUT /api/<entity>/csv - Merge a CSV body into the collection
async fn import_csv<S>(State(service): State<S>, user: AuthUser, body: String) -> ApiResult<Vec<S::Entity>>
where
    S: EntityService + Clone + 'static,
{
    Ok(ApiResponse::success(service.from_csv(&user, &body).await?))
}
