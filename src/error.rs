// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::database::DatabaseError;
use crate::oai::OaiError;
use crate::services::ServiceError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 501 Not Implemented
    NotImplemented(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::InternalServerError(_) => 500,
            ApiError::NotImplemented(_) => 501,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::ValidationError(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::InternalServerError(msg)
            | ApiError::NotImplemented(msg)
            | ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::NotImplemented(_) => "NOT_IMPLEMENTED",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        json!({
            "error": true,
            "message": self.message(),
            "code": self.error_code()
        })
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        ApiError::ValidationError(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn not_implemented(message: impl Into<String>) -> Self {
        ApiError::NotImplemented(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(id) => ApiError::not_found(format!("{} not found", id)),
            ServiceError::PermissionDenied { anonymous: true, .. } => {
                ApiError::unauthorized(format!("{} (authentication required)", err))
            }
            ServiceError::PermissionDenied { .. } => ApiError::forbidden(err.to_string()),
            ServiceError::Validation(msg) => ApiError::validation_error(msg),
            ServiceError::Conflict(msg) => ApiError::conflict(msg),
            ServiceError::Unimplemented { .. } => ApiError::not_implemented(err.to_string()),
            ServiceError::InvalidCredentials => ApiError::unauthorized(err.to_string()),
            ServiceError::Store(db_err) => db_err.into(),
            ServiceError::Password(e) => {
                tracing::error!("Password hashing error: {}", e);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            ServiceError::Token(e) => {
                tracing::error!("Session token error: {}", e);
                ApiError::internal_server_error("Unable to issue session token")
            }
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(id) => ApiError::not_found(format!("{} not found", id)),
            DatabaseError::Conflict(id) => ApiError::conflict(format!("{} already exists", id)),
            DatabaseError::ConfigMissing(name) => {
                tracing::error!("Store misconfigured: {} missing", name);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            DatabaseError::Sqlx(
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_),
            ) => ApiError::service_unavailable("Database temporarily unavailable"),
            DatabaseError::QueryError(msg) => {
                // Don't expose internal SQL errors to clients
                tracing::error!("Database query error: {}", msg);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            DatabaseError::Sqlx(sqlx_err) => {
                // Log the real error but return generic message
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_server_error("Database error occurred")
            }
            DatabaseError::Serialization(e) => {
                tracing::error!("Stored document does not decode: {}", e);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
        }
    }
}

impl From<OaiError> for ApiError {
    fn from(err: OaiError) -> Self {
        match err {
            OaiError::Service(service_err) => service_err.into(),
            other => {
                tracing::error!("OAI-PMH rendering error: {}", other);
                ApiError::internal_server_error("Failed to render OAI-PMH response")
            }
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::CollectionName;
    use crate::types::Operation;

    fn status(err: ServiceError) -> u16 {
        ApiError::from(err).status_code()
    }

    #[test]
    fn service_errors_map_to_http_status() {
        let denied = |anonymous| ServiceError::PermissionDenied {
            operation: Operation::Create,
            collection: CollectionName::Species,
            anonymous,
        };
        assert_eq!(status(ServiceError::NotFound("Cenotes/x".into())), 404);
        assert_eq!(status(denied(false)), 403);
        assert_eq!(status(denied(true)), 401);
        assert_eq!(status(ServiceError::Validation("bad".into())), 400);
        assert_eq!(status(ServiceError::Conflict("dup".into())), 409);
        assert_eq!(
            status(ServiceError::Unimplemented {
                operation: Operation::Update,
                collection: CollectionName::Cenotes
            }),
            501
        );
        assert_eq!(status(ServiceError::InvalidCredentials), 401);
        assert_eq!(status(ServiceError::Store(DatabaseError::QueryError("boom".into()))), 500);
        assert_eq!(status(ServiceError::Store(DatabaseError::Sqlx(sqlx::Error::PoolTimedOut))), 503);
    }

    #[test]
    fn body_carries_code_and_message() {
        let body = ApiError::not_implemented("Not implemented: create on cenotes").to_json();
        assert_eq!(body["error"], json!(true));
        assert_eq!(body["code"], json!("NOT_IMPLEMENTED"));
    }
}
