use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::SessionUser;
use crate::config::SecurityConfig;
use crate::database::models::Role;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User `_key`
    pub sub: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user: &SessionUser, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: user.key.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),

    #[error("JWT secret not configured")]
    InvalidSecret,
}

pub fn generate_jwt(claims: &Claims, security: &SecurityConfig) -> Result<String, JwtError> {
    if security.jwt_secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(security.jwt_secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key)
        .map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

/// Validate signature and expiry, returning the claims
pub fn validate_jwt(token: &str, security: &SecurityConfig) -> Result<Claims, JwtError> {
    if security.jwt_secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(security.jwt_secret.as_bytes());
    let token_data = decode::<Claims>(token, &decoding_key, &Validation::default())
        .map_err(|e| JwtError::InvalidToken(e.to_string()))?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn session() -> SessionUser {
        SessionUser {
            key: "u1".into(),
            email: "ana@cenoteando.org".into(),
            name: "Ana".into(),
            role: Role::Admin,
        }
    }

    #[test]
    fn token_round_trip() {
        let security = AppConfig::development().security;
        let token = generate_jwt(&Claims::new(&session(), 1), &security).unwrap();
        let claims = validate_jwt(&token, &security).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.role, Role::Admin);
    }

    #[test]
    fn rejects_foreign_signature() {
        let security = AppConfig::development().security;
        let token = generate_jwt(&Claims::new(&session(), 1), &security).unwrap();

        let mut other = security.clone();
        other.jwt_secret = "another-secret".into();
        assert!(matches!(validate_jwt(&token, &other), Err(JwtError::InvalidToken(_))));
    }

    #[test]
    fn empty_secret_is_refused() {
        let mut security = AppConfig::development().security;
        security.jwt_secret.clear();
        assert!(matches!(
            generate_jwt(&Claims::new(&session(), 1), &security),
            Err(JwtError::InvalidSecret)
        ));
    }
}
