use bcrypt::{hash, verify};
use thiserror::Error;

/// bcrypt rejects costs below this
pub const MIN_BCRYPT_COST: u32 = 4;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

/// Hash on the blocking pool; bcrypt is CPU bound.
pub async fn hash_password(password: &str, cost: u32) -> Result<String, PasswordError> {
    let password = password.to_string();
    let cost = cost.max(MIN_BCRYPT_COST);

    tokio::task::spawn_blocking(move || hash(password, cost).map_err(|e| PasswordError::Hashing(e.to_string())))
        .await
        .map_err(|e| PasswordError::Hashing(format!("Task join error: {}", e)))?
}

/// `Ok(false)` on mismatch; a malformed stored hash also counts as a mismatch.
pub async fn verify_password(password: &str, hashed: &str) -> Result<bool, PasswordError> {
    let password = password.to_string();
    let hashed = hashed.to_string();

    tokio::task::spawn_blocking(move || verify(password, &hashed).unwrap_or(false))
        .await
        .map_err(|e| PasswordError::Hashing(format!("Task join error: {}", e)))
}
