use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::database::DocumentStore;
use crate::middleware::{ApiResponse, ApiResult};

/// GET / - Service information
pub async fn root() -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "name": "Cenoteando API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Catalogue of cenotes, species, variables and references",
        "endpoints": {
            "auth": "/api/auth/login, /api/auth/signup, /api/auth/whoami",
            "cenotes": "/api/cenotes[/:_key][/csv][/:_key/data/:theme]",
            "species": "/api/species[/:_key][/csv][/inaturalist/:id][/aphia/:id]",
            "users": "/api/users[/:_key][/csv]",
            "variables": "/api/variables[/:_key][/csv]",
            "references": "/api/references[/:_key][/csv]",
            "oai": "/oai/request?verb=...",
        }
    })))
}

/// GET /health - Store reachability
pub async fn health(State(store): State<Arc<dyn DocumentStore>>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": store.backend()
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": true,
                    "message": "Database unavailable",
                    "code": "SERVICE_UNAVAILABLE",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "database": store.backend()
                    }
                })),
            )
        }
    }
}
