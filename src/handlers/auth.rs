use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::auth::{generate_jwt, AuthUser, Claims, SessionUser};
use crate::config::AppConfig;
use crate::database::models::{Role, User};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{ServiceError, Signup, UserService};

use super::json_body;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub expires_in: u64,
    pub user: User,
}

fn issue_token(user: User, config: &AppConfig) -> Result<TokenResponse, ApiError> {
    let session = SessionUser::from(user.clone());
    let claims = Claims::new(&session, config.security.jwt_expiry_hours);
    let token = generate_jwt(&claims, &config.security).map_err(ServiceError::from)?;

    Ok(TokenResponse {
        token,
        expires_in: config.security.jwt_expiry_hours * 3600,
        user,
    })
}

/// POST /api/auth/login - Exchange credentials for a session token
pub async fn login(
    State(config): State<Arc<AppConfig>>,
    State(users): State<UserService>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<TokenResponse> {
    let request = json_body(body)?;
    let user = users.verify(&request.email, &request.password).await?;
    info!("Login for user {}", user.key);
    Ok(ApiResponse::success(issue_token(user, &config)?))
}

/// POST /api/auth/signup - Self-registration as a regular user
pub async fn signup(
    State(config): State<Arc<AppConfig>>,
    State(users): State<UserService>,
    body: Result<Json<Signup>, JsonRejection>,
) -> ApiResult<TokenResponse> {
    let user = users.register(json_body(body)?, Role::Regular).await?;
    Ok(ApiResponse::created(issue_token(user, &config)?))
}

/// GET /api/auth/whoami - The caller as the server sees it
pub async fn whoami(user: AuthUser) -> ApiResult<Value> {
    let data = match &user {
        AuthUser::Anonymous => json!({ "authenticated": false, "role": user.role_name() }),
        AuthUser::Authenticated(session) => json!({
            "authenticated": true,
            "_key": session.key,
            "email": session.email,
            "name": session.name,
            "role": user.role_name(),
        }),
    };
    Ok(ApiResponse::success(data))
}
