use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{AuthUser, JwtError, PasswordError};
use crate::csv_exchange::{self, CsvError, CsvRecord};
use crate::database::models::{merge_documents, Document};
use crate::database::{CollectionName, DatabaseError, Page, PageRequest, Repository};
use crate::types::Operation;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: cannot {operation} {collection}")]
    PermissionDenied {
        operation: Operation,
        collection: CollectionName,
        anonymous: bool,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not implemented: {operation} on {collection}")]
    Unimplemented {
        operation: Operation,
        collection: CollectionName,
    },

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error(transparent)]
    Store(DatabaseError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Token(#[from] JwtError),
}

impl From<DatabaseError> for ServiceError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(id) => ServiceError::NotFound(id),
            DatabaseError::Conflict(id) => ServiceError::Conflict(format!("{} already exists", id)),
            other => ServiceError::Store(other),
        }
    }
}

impl From<CsvError> for ServiceError {
    fn from(err: CsvError) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

/// Operations every catalogue entity exposes over REST.
///
/// `Entity` is the caller-facing representation; services decode request
/// bodies themselves so each can apply its own write rules.
#[async_trait]
pub trait EntityService: Send + Sync {
    type Entity: Serialize + Send + Sync + 'static;

    const COLLECTION: CollectionName;
    const DEFAULT_LIMIT: usize;

    fn max_limit(&self) -> usize;

    /// Resolve a requested window against the entity default and the configured cap
    fn page_request(&self, limit: Option<usize>, continuation_token: Option<String>) -> PageRequest {
        let max = self.max_limit().max(1);
        PageRequest {
            limit: Some(limit.unwrap_or(Self::DEFAULT_LIMIT).clamp(1, max)),
            continuation_token,
        }
    }

    async fn list(&self, user: &AuthUser, page: PageRequest) -> Result<Page<Self::Entity>, ServiceError>;

    async fn get(&self, user: &AuthUser, key: &str) -> Result<Self::Entity, ServiceError>;

    async fn create(&self, user: &AuthUser, data: Value) -> Result<Self::Entity, ServiceError>;

    async fn update(&self, user: &AuthUser, key: &str, data: Value) -> Result<Self::Entity, ServiceError>;

    async fn delete(&self, user: &AuthUser, key: &str) -> Result<(), ServiceError>;

    async fn to_csv(&self, user: &AuthUser) -> Result<String, ServiceError>;

    async fn from_csv(&self, user: &AuthUser, text: &str) -> Result<Vec<Self::Entity>, ServiceError>;
}

pub fn require_admin(user: &AuthUser, operation: Operation, collection: CollectionName) -> Result<(), ServiceError> {
    if user.is_admin() {
        return Ok(());
    }
    warn!(
        "Denied {} on {} for {} caller {}",
        operation,
        collection,
        user.role_name(),
        user.key().unwrap_or("-")
    );
    Err(ServiceError::PermissionDenied {
        operation,
        collection,
        anonymous: user.is_anonymous(),
    })
}

pub fn unimplemented(operation: Operation, collection: CollectionName) -> ServiceError {
    ServiceError::Unimplemented { operation, collection }
}

pub fn new_key() -> String {
    Uuid::new_v4().simple().to_string()
}

/// A body `_key` must agree with the path key
pub fn check_body_key(key: &str, data: &Value) -> Result<(), ServiceError> {
    match data.get("_key") {
        None | Some(Value::Null) => Ok(()),
        Some(Value::String(body_key)) if body_key == key => Ok(()),
        Some(other) => Err(ServiceError::Validation(format!(
            "Body _key {} does not match path key '{}'",
            other, key
        ))),
    }
}

pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ServiceError> {
    serde_json::from_value(value).map_err(|e| ServiceError::Validation(e.to_string()))
}

pub fn require_object(data: Value) -> Result<Map<String, Value>, ServiceError> {
    match data {
        Value::Object(map) => Ok(map),
        other => Err(ServiceError::Validation(format!(
            "Expected a JSON object, got {}",
            json_type(&other)
        ))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Empty strings are stored as null, the only form a CSV cell can carry back
fn blank_to_null(fields: &mut Map<String, Value>) {
    for value in fields.values_mut() {
        if matches!(value, Value::String(s) if s.is_empty()) {
            *value = Value::Null;
        }
    }
}

/// Insert `data` as a new document, generating `_key` when absent
pub async fn create_document<T: Document>(repo: &Repository<T>, data: Value) -> Result<T, ServiceError> {
    let mut data = require_object(data)?;
    blank_to_null(&mut data);
    if !matches!(data.get("_key"), Some(Value::String(k)) if !k.is_empty()) {
        data.insert("_key".to_string(), Value::String(new_key()));
    }
    let document: T = decode(Value::Object(data))?;
    repo.insert(&document).await?;
    info!("Created {}", document.document_id());
    Ok(document)
}

/// Shallow-merge `patch` over the stored document, or create it when missing
pub async fn upsert_document<T: Document>(repo: &Repository<T>, key: &str, patch: Value) -> Result<T, ServiceError> {
    let mut patch = require_object(patch)?;
    blank_to_null(&mut patch);
    patch.insert("_key".to_string(), Value::String(key.to_string()));
    let patch = Value::Object(patch);

    match repo.get_raw(key).await? {
        Some(mut stored) => {
            merge_documents(&mut stored, &patch);
            let document: T = decode(stored)?;
            repo.replace(&document).await?;
            info!("Updated {}", document.document_id());
            Ok(document)
        }
        None => {
            let document: T = decode(patch)?;
            repo.insert(&document).await?;
            info!("Created {}", document.document_id());
            Ok(document)
        }
    }
}

/// Apply CSV rows one at a time: merge into existing keys, create the rest.
pub async fn import_csv<T: Document + CsvRecord>(repo: &Repository<T>, text: &str) -> Result<Vec<T>, ServiceError> {
    let rows = csv_exchange::parse_rows(T::COLUMNS, text)?;
    let mut imported = Vec::with_capacity(rows.len());

    for (idx, mut row) in rows.into_iter().enumerate() {
        let key = match row.remove("_key") {
            Some(Value::String(key)) if !key.is_empty() => key,
            _ => new_key(),
        };
        let document = upsert_document(repo, &key, Value::Object(row))
            .await
            .map_err(|e| match e {
                ServiceError::Validation(msg) => ServiceError::Validation(format!("Row {}: {}", idx + 1, msg)),
                other => other,
            })?;
        imported.push(document);
    }

    info!("Imported {} {} rows", imported.len(), T::COLLECTION);
    Ok(imported)
}
