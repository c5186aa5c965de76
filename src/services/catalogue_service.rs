use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use super::entity::{
    check_body_key, create_document, import_csv, require_admin, upsert_document, EntityService, ServiceError,
};
use crate::auth::AuthUser;
use crate::csv_exchange::{self, CsvRecord};
use crate::database::models::{Document, Reference, Species};
use crate::database::{CollectionName, DocumentStore, Page, PageRequest, Repository};
use crate::types::Operation;

/// Openly readable collection whose writes are admin-only; `update` upserts.
pub struct CatalogueService<T> {
    pub(super) repo: Repository<T>,
    max_limit: usize,
}

pub type SpeciesService = CatalogueService<Species>;
pub type ReferenceService = CatalogueService<Reference>;

impl<T> Clone for CatalogueService<T> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            max_limit: self.max_limit,
        }
    }
}

impl<T: Document> CatalogueService<T> {
    pub fn new(store: Arc<dyn DocumentStore>, max_limit: usize) -> Self {
        Self {
            repo: Repository::new(store),
            max_limit,
        }
    }
}

#[async_trait]
impl<T: Document + CsvRecord> EntityService for CatalogueService<T> {
    type Entity = T;

    const COLLECTION: CollectionName = T::COLLECTION;
    const DEFAULT_LIMIT: usize = 250;

    fn max_limit(&self) -> usize {
        self.max_limit
    }

    async fn list(&self, _user: &AuthUser, page: PageRequest) -> Result<Page<T>, ServiceError> {
        Ok(self.repo.paginate(None, &page).await?)
    }

    async fn get(&self, _user: &AuthUser, key: &str) -> Result<T, ServiceError> {
        Ok(self.repo.select_404(key, None).await?)
    }

    async fn create(&self, user: &AuthUser, data: Value) -> Result<T, ServiceError> {
        require_admin(user, Operation::Create, T::COLLECTION)?;
        create_document(&self.repo, data).await
    }

    async fn update(&self, user: &AuthUser, key: &str, data: Value) -> Result<T, ServiceError> {
        require_admin(user, Operation::Update, T::COLLECTION)?;
        check_body_key(key, &data)?;
        upsert_document(&self.repo, key, data).await
    }

    async fn delete(&self, user: &AuthUser, key: &str) -> Result<(), ServiceError> {
        require_admin(user, Operation::Delete, T::COLLECTION)?;
        if !self.repo.delete(key).await? {
            return Err(ServiceError::NotFound(T::COLLECTION.document_id(key)));
        }
        info!("Deleted {}", T::COLLECTION.document_id(key));
        Ok(())
    }

    async fn to_csv(&self, user: &AuthUser) -> Result<String, ServiceError> {
        let all = self.list(user, PageRequest::unlimited()).await?;
        Ok(csv_exchange::to_csv(&all.data)?)
    }

    async fn from_csv(&self, user: &AuthUser, text: &str) -> Result<Vec<T>, ServiceError> {
        require_admin(user, Operation::Import, T::COLLECTION)?;
        import_csv(&self.repo, text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{admin, regular, TestContext};
    use serde_json::json;

    #[tokio::test]
    async fn non_admin_writes_are_denied() {
        let ctx = TestContext::new();
        let species = &ctx.services.species;

        for user in [AuthUser::Anonymous, regular("u1")] {
            assert!(matches!(
                species.create(&user, json!({ "scientific_name": "Astyanax" })).await,
                Err(ServiceError::PermissionDenied { .. })
            ));
            assert!(matches!(
                species.update(&user, "s1", json!({})).await,
                Err(ServiceError::PermissionDenied { .. })
            ));
            assert!(matches!(
                species.from_csv(&user, "_key\ns1\n").await,
                Err(ServiceError::PermissionDenied { .. })
            ));
        }
    }

    #[tokio::test]
    async fn update_upserts_and_merges() {
        let ctx = TestContext::new();
        let refs = &ctx.services.references;
        let root = admin("a1");

        let created = refs.update(&root, "r1", json!({ "title": "Cenotes of Yucatan" })).await.unwrap();
        assert_eq!(created.key, "r1");

        let merged = refs.update(&root, "r1", json!({ "year": 2019 })).await.unwrap();
        assert_eq!(merged.title.as_deref(), Some("Cenotes of Yucatan"));
        assert_eq!(merged.year, Some(2019));

        assert!(matches!(
            refs.update(&root, "r1", json!({ "_key": "r2" })).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn create_generates_key_and_rejects_duplicates() {
        let ctx = TestContext::new();
        let refs = &ctx.services.references;
        let root = admin("a1");

        let generated = refs.create(&root, json!({ "title": "Karst" })).await.unwrap();
        assert_eq!(generated.key.len(), 32);

        refs.create(&root, json!({ "_key": "r9", "title": "A" })).await.unwrap();
        assert!(matches!(
            refs.create(&root, json!({ "_key": "r9", "title": "B" })).await,
            Err(ServiceError::Conflict(_))
        ));
        assert!(matches!(refs.delete(&root, "missing").await, Err(ServiceError::NotFound(_))));
        refs.delete(&root, "r9").await.unwrap();
    }

    #[tokio::test]
    async fn csv_round_trip_reproduces_visible_set() {
        let source = TestContext::new();
        let root = admin("a1");
        source
            .services
            .species
            .update(&root, "s1", json!({ "scientific_name": "Typhlias pearsei", "inaturalist_id": 47178 }))
            .await
            .unwrap();
        source
            .services
            .species
            .update(&root, "s2", json!({ "scientific_name": "Ogilbia pearsei, var.", "kingdom": "Animalia" }))
            .await
            .unwrap();
        let blank = source
            .services
            .species
            .create(&root, json!({ "_key": "s3", "scientific_name": "", "common_name": "Blind eel" }))
            .await
            .unwrap();
        assert_eq!(blank.scientific_name, None);

        let exported = source.services.species.to_csv(&AuthUser::Anonymous).await.unwrap();

        let target = TestContext::new();
        target.services.species.from_csv(&root, &exported).await.unwrap();
        let before = source.services.species.list(&AuthUser::Anonymous, PageRequest::unlimited()).await.unwrap();
        let after = target.services.species.list(&AuthUser::Anonymous, PageRequest::unlimited()).await.unwrap();
        assert_eq!(before.data, after.data);
        assert_eq!(target.services.species.to_csv(&AuthUser::Anonymous).await.unwrap(), exported);
    }

    #[tokio::test]
    async fn csv_import_reports_bad_row() {
        let ctx = TestContext::new();
        let err = ctx
            .services
            .species
            .from_csv(&admin("a1"), "_key,inaturalist_id\ns1,12\ns2,twelve\n")
            .await
            .unwrap_err();
        match err {
            ServiceError::Validation(msg) => assert!(msg.contains("Row 2"), "{msg}"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
