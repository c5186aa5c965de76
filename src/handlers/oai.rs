use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::header,
    response::IntoResponse,
};

use crate::error::ApiError;
use crate::oai::{OaiError, OaiProvider, OaiRequest};

/// GET /oai/request - OAI-PMH endpoint. Protocol errors are still 200 with an `<error>` element,
/// including query strings that do not parse (repeated arguments).
pub async fn request(
    State(provider): State<Arc<OaiProvider>>,
    query: Result<Query<OaiRequest>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let body = match query {
        Ok(Query(request)) => provider.handle(&request).await?,
        Err(rejection) => provider.reject(OaiError::BadArgument(rejection.body_text()))?,
    };
    Ok(([(header::CONTENT_TYPE, "text/xml; charset=utf-8")], body))
}
