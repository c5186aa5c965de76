use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Document;
use crate::csv_exchange::{column, CsvColumn, CsvKind, CsvRecord};
use crate::database::store::CollectionName;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    #[serde(alias = "CENOTERO", alias = "cenotero", alias = "REGULAR")]
    Regular,
    #[serde(alias = "ADMIN")]
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Regular => "regular",
            Role::Admin => "admin",
        }
    }
}

/// Stored user document, including the password hash
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(rename = "_key", default)]
    pub key: String,
    pub email: String,
    pub name: String,
    #[serde(rename = "password")]
    pub password_hash: String,
    #[serde(default)]
    pub role: Role,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Document for UserRecord {
    const COLLECTION: CollectionName = CollectionName::Users;

    fn key(&self) -> &str {
        &self.key
    }

    fn set_key(&mut self, key: String) {
        self.key = key;
    }
}

/// User as returned to callers: never carries the password
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_key")]
    pub key: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        Self {
            key: record.key,
            email: record.email,
            name: record.name,
            role: record.role,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

impl CsvRecord for User {
    const COLUMNS: &'static [CsvColumn] = &[
        column("_key", CsvKind::Text),
        column("email", CsvKind::Text),
        column("name", CsvKind::Text),
        column("role", CsvKind::Text),
        column("created_at", CsvKind::Timestamp),
        column("updated_at", CsvKind::Timestamp),
    ];
}
