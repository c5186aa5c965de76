use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::database::manager::DatabaseError;
use crate::filter::FilterData;

/// Persisted collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectionName {
    Users,
    Cenotes,
    Species,
    Variables,
    MeasurementsOrFacts,
    References,
}

impl CollectionName {
    pub const ALL: [CollectionName; 6] = [
        CollectionName::Users,
        CollectionName::Cenotes,
        CollectionName::Species,
        CollectionName::Variables,
        CollectionName::MeasurementsOrFacts,
        CollectionName::References,
    ];

    pub fn table_name(&self) -> &'static str {
        match self {
            CollectionName::Users => "users",
            CollectionName::Cenotes => "cenotes",
            CollectionName::Species => "species",
            CollectionName::Variables => "variables",
            CollectionName::MeasurementsOrFacts => "measurements_or_facts",
            CollectionName::References => "references",
        }
    }

    /// Prefix used in document ids (`Cenotes/<key>`)
    pub fn id_prefix(&self) -> &'static str {
        match self {
            CollectionName::Users => "Users",
            CollectionName::Cenotes => "Cenotes",
            CollectionName::Species => "Species",
            CollectionName::Variables => "Variables",
            CollectionName::MeasurementsOrFacts => "MeasurementsOrFacts",
            CollectionName::References => "References",
        }
    }

    pub fn document_id(&self, key: &str) -> String {
        format!("{}/{}", self.id_prefix(), key)
    }
}

impl std::fmt::Display for CollectionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table_name())
    }
}

/// Key-addressed JSON document storage.
///
/// Backends only need single-document atomicity; nothing here batches
/// writes across calls.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Documents matching `filter`, ordered by `_key`
    async fn find(&self, collection: CollectionName, filter: FilterData) -> Result<Vec<Value>, DatabaseError>;

    async fn get(&self, collection: CollectionName, key: &str) -> Result<Option<Value>, DatabaseError>;

    /// Fails with `Conflict` when the key is taken
    async fn insert(&self, collection: CollectionName, key: &str, document: Value) -> Result<(), DatabaseError>;

    /// Fails with `NotFound` when the key is absent
    async fn replace(&self, collection: CollectionName, key: &str, document: Value) -> Result<(), DatabaseError>;

    /// Returns whether a document was removed
    async fn remove(&self, collection: CollectionName, key: &str) -> Result<bool, DatabaseError>;

    async fn health_check(&self) -> Result<(), DatabaseError>;

    fn backend(&self) -> &'static str;
}
