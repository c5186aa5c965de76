use serde_json::json;

use super::catalogue_service::SpeciesService;
use super::entity::ServiceError;
use crate::database::models::Species;
use crate::database::CollectionName;
use crate::filter::FilterData;

impl SpeciesService {
    pub async fn get_by_inaturalist_id(&self, id: i64) -> Result<Species, ServiceError> {
        self.repo
            .select_one(FilterData::matching(json!({ "inaturalist_id": id })))
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Species with iNaturalist id {}", id)))
    }

    pub async fn get_by_aphia_id(&self, id: i64) -> Result<Species, ServiceError> {
        self.repo
            .select_one(FilterData::matching(json!({ "aphia_id": id })))
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Species with AphiaID {}", id)))
    }

    /// `Species/<key>`
    pub fn key_to_id(key: &str) -> String {
        CollectionName::Species.document_id(key)
    }

    pub fn id_to_key(id: &str) -> Option<&str> {
        let (collection, key) = id.split_once('/')?;
        if collection != CollectionName::Species.id_prefix() || key.is_empty() || key.contains('/') {
            return None;
        }
        Some(key)
    }
}
