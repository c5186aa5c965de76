use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::access::cenote_filter;
use super::entity::{require_admin, unimplemented, EntityService, ServiceError};
use crate::auth::AuthUser;
use crate::csv_exchange;
use crate::database::models::Cenote;
use crate::database::{CollectionName, DocumentStore, Page, PageRequest, Repository};
use crate::types::Operation;

/// Cenote catalogue. Writes are not supported yet; they fail after the admin check.
#[derive(Clone)]
pub struct CenoteService {
    repo: Repository<Cenote>,
    max_limit: usize,
}

impl CenoteService {
    pub fn new(store: Arc<dyn DocumentStore>, max_limit: usize) -> Self {
        Self {
            repo: Repository::new(store),
            max_limit,
        }
    }

    /// Every cenote visible to `user`, in key order
    pub async fn list_all(&self, user: &AuthUser) -> Result<Vec<Cenote>, ServiceError> {
        Ok(self.list(user, PageRequest::unlimited()).await?.data)
    }

    /// `None` when absent or hidden from `user`
    pub async fn find(&self, user: &AuthUser, key: &str) -> Result<Option<Cenote>, ServiceError> {
        Ok(self.repo.select_key(key, cenote_filter(user)).await?)
    }

    fn reject_write(&self, user: &AuthUser, operation: Operation) -> ServiceError {
        match require_admin(user, operation, CollectionName::Cenotes) {
            Err(denied) => denied,
            Ok(()) => unimplemented(operation, CollectionName::Cenotes),
        }
    }
}

#[async_trait]
impl EntityService for CenoteService {
    type Entity = Cenote;

    const COLLECTION: CollectionName = CollectionName::Cenotes;
    const DEFAULT_LIMIT: usize = 250;

    fn max_limit(&self) -> usize {
        self.max_limit
    }

    async fn list(&self, user: &AuthUser, page: PageRequest) -> Result<Page<Cenote>, ServiceError> {
        debug!("Listing cenotes for {} caller", user.role_name());
        Ok(self.repo.paginate(cenote_filter(user), &page).await?)
    }

    async fn get(&self, user: &AuthUser, key: &str) -> Result<Cenote, ServiceError> {
        self.find(user, key)
            .await?
            .ok_or_else(|| ServiceError::NotFound(CollectionName::Cenotes.document_id(key)))
    }

    async fn create(&self, user: &AuthUser, _data: Value) -> Result<Cenote, ServiceError> {
        Err(self.reject_write(user, Operation::Create))
    }

    async fn update(&self, user: &AuthUser, _key: &str, _data: Value) -> Result<Cenote, ServiceError> {
        Err(self.reject_write(user, Operation::Update))
    }

    async fn delete(&self, user: &AuthUser, _key: &str) -> Result<(), ServiceError> {
        Err(self.reject_write(user, Operation::Delete))
    }

    async fn to_csv(&self, user: &AuthUser) -> Result<String, ServiceError> {
        let cenotes = self.list_all(user).await?;
        Ok(csv_exchange::to_csv(&cenotes)?)
    }

    async fn from_csv(&self, user: &AuthUser, _text: &str) -> Result<Vec<Cenote>, ServiceError> {
        Err(self.reject_write(user, Operation::Import))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{admin, regular, TestContext};
    use serde_json::json;

    async fn context() -> TestContext {
        let ctx = TestContext::new();
        ctx.seed_cenote("c1", "Dos Ojos", true).await;
        ctx.seed_cenote("c2", "Private Sinkhole", false).await;
        ctx.seed_cenote("c3", "Ik Kil", true).await;
        ctx
    }

    #[tokio::test]
    async fn anonymous_never_sees_non_touristic() {
        let ctx = context().await;
        let cenotes = &ctx.services.cenotes;

        let page = cenotes.list(&AuthUser::Anonymous, PageRequest::first(10)).await.unwrap();
        assert!(page.data.iter().all(|c| c.touristic));
        assert_eq!(page.data.len(), 2);

        assert!(matches!(
            cenotes.get(&AuthUser::Anonymous, "c2").await,
            Err(ServiceError::NotFound(_))
        ));
        assert_eq!(cenotes.get(&regular("u1"), "c2").await.unwrap().name, "Private Sinkhole");
    }

    #[tokio::test]
    async fn writes_check_admin_then_report_unimplemented() {
        let ctx = context().await;
        let cenotes = &ctx.services.cenotes;

        assert!(matches!(
            cenotes.create(&regular("u1"), json!({ "name": "x" })).await,
            Err(ServiceError::PermissionDenied { .. })
        ));
        assert!(matches!(
            cenotes.delete(&admin("a1"), "c1").await,
            Err(ServiceError::Unimplemented { operation: Operation::Delete, .. })
        ));
        assert!(matches!(
            cenotes.from_csv(&admin("a1"), "_key\n").await,
            Err(ServiceError::Unimplemented { .. })
        ));
    }

    #[tokio::test]
    async fn csv_export_contains_visible_set_only() {
        let ctx = context().await;
        let text = ctx.services.cenotes.to_csv(&AuthUser::Anonymous).await.unwrap();
        assert!(text.starts_with("_key,name,touristic,"));
        assert!(text.contains("Dos Ojos"));
        assert!(!text.contains("Private Sinkhole"));
        assert_eq!(text.lines().count(), 3);
    }
}
