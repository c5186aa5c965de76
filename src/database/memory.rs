use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::database::manager::DatabaseError;
use crate::database::store::{CollectionName, DocumentStore};
use crate::filter::{Filter, FilterData};

/// Process-local store used when no database is configured and in tests
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<CollectionName, BTreeMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(&self, collection: CollectionName, filter_data: FilterData) -> Result<Vec<Value>, DatabaseError> {
        let mut filter = Filter::new(collection.table_name())?;
        filter.assign(filter_data)?;
        let limit = filter.limit().unwrap_or(usize::MAX);

        let collections = self.collections.read().await;
        let Some(documents) = collections.get(&collection) else {
            return Ok(vec![]);
        };

        // BTreeMap iteration is already `_key` ordered
        Ok(documents
            .iter()
            .filter(|(key, doc)| filter.matches(key, doc))
            .take(limit)
            .map(|(_, doc)| doc.clone())
            .collect())
    }

    async fn get(&self, collection: CollectionName, key: &str) -> Result<Option<Value>, DatabaseError> {
        let collections = self.collections.read().await;
        Ok(collections.get(&collection).and_then(|docs| docs.get(key)).cloned())
    }

    async fn insert(&self, collection: CollectionName, key: &str, document: Value) -> Result<(), DatabaseError> {
        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection).or_default();
        if documents.contains_key(key) {
            return Err(DatabaseError::Conflict(collection.document_id(key)));
        }
        documents.insert(key.to_string(), document);
        Ok(())
    }

    async fn replace(&self, collection: CollectionName, key: &str, document: Value) -> Result<(), DatabaseError> {
        let mut collections = self.collections.write().await;
        match collections.get_mut(&collection).and_then(|docs| docs.get_mut(key)) {
            Some(existing) => {
                *existing = document;
                Ok(())
            }
            None => Err(DatabaseError::NotFound(collection.document_id(key))),
        }
    }

    async fn remove(&self, collection: CollectionName, key: &str) -> Result<bool, DatabaseError> {
        let mut collections = self.collections.write().await;
        Ok(collections
            .get_mut(&collection)
            .map(|docs| docs.remove(key).is_some())
            .unwrap_or(false))
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
