pub mod auth;
pub mod entity;
pub mod oai;
pub mod species;
pub mod system;
pub mod variables;

pub use entity::{entity_routes, PageQuery};

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query,
    },
    Json,
};

use crate::error::ApiError;

/// Turn a rejected JSON body into the API's own 400
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

/// Same for query strings: `?limit=abc` is a 400 with the usual error body
pub fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query
        .map(|Query(value)| value)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}
