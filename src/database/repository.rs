use std::marker::PhantomData;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::database::manager::DatabaseError;
use crate::database::models::Document;
use crate::database::store::DocumentStore;
use crate::filter::FilterData;

/// Requested page window. `limit: None` means every matching document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: Option<usize>,
    pub continuation_token: Option<String>,
}

impl PageRequest {
    pub fn first(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            continuation_token: None,
        }
    }

    pub fn unlimited() -> Self {
        Self::default()
    }
}

/// One page of a keyset-paginated listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuation_token: Option<String>,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            has_more: self.has_more,
            continuation_token: self.continuation_token,
        }
    }
}

/// Typed access to one collection of the document store
pub struct Repository<T> {
    store: Arc<dyn DocumentStore>,
    _phantom: PhantomData<T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _phantom: PhantomData,
        }
    }
}

impl<T: Document> Repository<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    pub async fn select_any(&self, filter_data: FilterData) -> Result<Vec<T>, DatabaseError> {
        let documents = self.store.find(T::COLLECTION, filter_data).await?;
        documents
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(DatabaseError::from))
            .collect()
    }

    pub async fn select_one(&self, filter_data: FilterData) -> Result<Option<T>, DatabaseError> {
        Ok(self.select_any(filter_data.limit(Some(1))).await?.into_iter().next())
    }

    /// Fetch `key` only if it also satisfies `access`
    pub async fn select_key(&self, key: &str, access: Option<Value>) -> Result<Option<T>, DatabaseError> {
        let mut filter = FilterData::matching(json!({ "_key": key }));
        if let Some(access) = access {
            filter = filter.and_where(access);
        }
        self.select_one(filter).await
    }

    pub async fn select_404(&self, key: &str, access: Option<Value>) -> Result<T, DatabaseError> {
        self.select_key(key, access)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(T::COLLECTION.document_id(key)))
    }

    /// Keyset page ordered by `_key`; one extra row is read to detect `has_more`.
    pub async fn paginate(&self, access: Option<Value>, request: &PageRequest) -> Result<Page<T>, DatabaseError> {
        let filter = FilterData {
            where_clause: access,
            after_key: request.continuation_token.clone(),
            limit: request.limit.map(|l| l + 1),
        };
        let mut data = self.select_any(filter).await?;

        let has_more = match request.limit {
            Some(limit) if data.len() > limit => {
                data.truncate(limit);
                true
            }
            _ => false,
        };
        let continuation_token = if has_more {
            data.last().map(|doc| doc.key().to_string())
        } else {
            None
        };

        Ok(Page {
            data,
            has_more,
            continuation_token,
        })
    }

    /// Raw stored document, bypassing any access filter
    pub async fn get_raw(&self, key: &str) -> Result<Option<Value>, DatabaseError> {
        self.store.get(T::COLLECTION, key).await
    }

    pub async fn insert(&self, document: &T) -> Result<(), DatabaseError> {
        let value = serde_json::to_value(document)?;
        self.store.insert(T::COLLECTION, document.key(), value).await
    }

    pub async fn replace(&self, document: &T) -> Result<(), DatabaseError> {
        let value = serde_json::to_value(document)?;
        self.store.replace(T::COLLECTION, document.key(), value).await
    }

    pub async fn delete(&self, key: &str) -> Result<bool, DatabaseError> {
        self.store.remove(T::COLLECTION, key).await
    }
}
