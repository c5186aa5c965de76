use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use tracing::debug;

use crate::auth::{validate_jwt, AuthUser};
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::services::UserService;

/// Resolve the caller from `Authorization: Bearer <token>`.
///
/// No header yields [`AuthUser::Anonymous`]; a header that is present but
/// malformed, expired or badly signed is rejected with 401, as is a token
/// whose user no longer exists. The role comes from the stored user, not
/// the token.
#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    Arc<AppConfig>: FromRef<S>,
    UserService: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = match bearer_token(&parts.headers).map_err(ApiError::unauthorized)? {
            Some(token) => token,
            None => return Ok(AuthUser::Anonymous),
        };

        let config = Arc::<AppConfig>::from_ref(state);
        let claims = validate_jwt(token, &config.security).map_err(|e| {
            debug!("Rejected session token: {}", e);
            ApiError::unauthorized(e.to_string())
        })?;

        let session = UserService::from_ref(state)
            .session(&claims.sub)
            .await?
            .ok_or_else(|| {
                debug!("Session token for unknown user {}", claims.sub);
                ApiError::unauthorized("Session user no longer exists")
            })?;

        Ok(AuthUser::Authenticated(session))
    }
}

/// Extract JWT token from Authorization header, `None` when the header is absent
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, String> {
    let Some(auth_header) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(Some(token.trim())),
        Some(_) => Err("Empty JWT token".to_string()),
        None => Err("Authorization header must use Bearer token format".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn missing_header_is_anonymous() {
        assert_eq!(bearer_token(&HeaderMap::new()), Ok(None));
    }

    #[test]
    fn bearer_prefix_is_required() {
        assert_eq!(bearer_token(&headers("Bearer abc.def")), Ok(Some("abc.def")));
        assert!(bearer_token(&headers("Basic dXNlcg==")).is_err());
        assert!(bearer_token(&headers("Bearer   ")).is_err());
    }
}
