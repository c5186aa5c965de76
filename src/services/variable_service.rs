use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use super::access::{cenote_filter, variable_filter};
use super::entity::{require_admin, unimplemented, EntityService, ServiceError};
use crate::auth::AuthUser;
use crate::csv_exchange;
use crate::database::models::{Cenote, MeasurementOrFact, Variable};
use crate::database::{CollectionName, DocumentStore, Page, PageRequest, Repository};
use crate::filter::FilterData;
use crate::types::Operation;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataPoint {
    pub timestamp: DateTime<Utc>,
    pub value: Value,
}

/// Measurements of one variable at one cenote, oldest first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableSeries {
    pub variable: Variable,
    pub values: Vec<DataPoint>,
}

#[derive(Clone)]
pub struct VariableService {
    repo: Repository<Variable>,
    measurements: Repository<MeasurementOrFact>,
    cenotes: Repository<Cenote>,
    max_limit: usize,
}

impl VariableService {
    pub fn new(store: Arc<dyn DocumentStore>, max_limit: usize) -> Self {
        Self {
            repo: Repository::new(store.clone()),
            measurements: Repository::new(store.clone()),
            cenotes: Repository::new(store),
            max_limit,
        }
    }

    fn reject_write(&self, user: &AuthUser, operation: Operation) -> ServiceError {
        match require_admin(user, operation, CollectionName::Variables) {
            Err(denied) => denied,
            Ok(()) => unimplemented(operation, CollectionName::Variables),
        }
    }

    /// Series for every visible variable of `theme` measured at `cenote_key`
    pub async fn get_data(
        &self,
        user: &AuthUser,
        cenote_key: &str,
        theme: &str,
    ) -> Result<Vec<VariableSeries>, ServiceError> {
        let cenote = self
            .cenotes
            .select_key(cenote_key, cenote_filter(user))
            .await?
            .ok_or_else(|| ServiceError::NotFound(CollectionName::Cenotes.document_id(cenote_key)))?;

        let mut filter = FilterData::matching(json!({ "theme": theme }));
        if let Some(access) = variable_filter(user) {
            filter = filter.and_where(access);
        }
        let variables: BTreeMap<String, Variable> = self
            .repo
            .select_any(filter)
            .await?
            .into_iter()
            .map(|v| (v.key.clone(), v))
            .collect();

        let measurements = self
            .measurements
            .select_any(FilterData::matching(json!({ "_to": CollectionName::Cenotes.document_id(&cenote.key) })))
            .await?;

        let mut grouped: BTreeMap<String, VariableSeries> = BTreeMap::new();
        for measurement in measurements {
            let Some(variable) = measurement.variable_key().and_then(|k| variables.get(k)) else {
                continue;
            };
            grouped
                .entry(variable.key.clone())
                .or_insert_with(|| VariableSeries {
                    variable: variable.clone(),
                    values: vec![],
                })
                .values
                .push(DataPoint {
                    timestamp: measurement.timestamp,
                    value: measurement.value,
                });
        }

        let mut series: Vec<VariableSeries> = grouped.into_values().collect();
        for s in &mut series {
            s.values.sort_by_key(|p| p.timestamp);
        }
        debug!("Found {} {} series for cenote {}", series.len(), theme, cenote.key);
        Ok(series)
    }
}

#[async_trait]
impl EntityService for VariableService {
    type Entity = Variable;

    const COLLECTION: CollectionName = CollectionName::Variables;
    const DEFAULT_LIMIT: usize = 50;

    fn max_limit(&self) -> usize {
        self.max_limit
    }

    async fn list(&self, user: &AuthUser, page: PageRequest) -> Result<Page<Variable>, ServiceError> {
        Ok(self.repo.paginate(variable_filter(user), &page).await?)
    }

    async fn get(&self, user: &AuthUser, key: &str) -> Result<Variable, ServiceError> {
        self.repo
            .select_key(key, variable_filter(user))
            .await?
            .ok_or_else(|| ServiceError::NotFound(CollectionName::Variables.document_id(key)))
    }

    async fn create(&self, user: &AuthUser, _data: Value) -> Result<Variable, ServiceError> {
        Err(self.reject_write(user, Operation::Create))
    }

    async fn update(&self, user: &AuthUser, _key: &str, _data: Value) -> Result<Variable, ServiceError> {
        Err(self.reject_write(user, Operation::Update))
    }

    async fn delete(&self, user: &AuthUser, _key: &str) -> Result<(), ServiceError> {
        Err(self.reject_write(user, Operation::Delete))
    }

    async fn to_csv(&self, user: &AuthUser) -> Result<String, ServiceError> {
        let variables = self.list(user, PageRequest::unlimited()).await?;
        Ok(csv_exchange::to_csv(&variables.data)?)
    }

    async fn from_csv(&self, user: &AuthUser, _text: &str) -> Result<Vec<Variable>, ServiceError> {
        Err(self.reject_write(user, Operation::Import))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::AccessLevel;
    use crate::testing::{admin, regular, TestContext};

    async fn context() -> TestContext {
        let ctx = TestContext::new();
        ctx.seed_cenote("c1", "Dos Ojos", true).await;
        ctx.seed_cenote("c2", "Closed", false).await;
        ctx.seed_variable("temp", "WATER", AccessLevel::Public).await;
        ctx.seed_variable("ph", "WATER", AccessLevel::Private).await;
        ctx.seed_variable("depth", "GEOMORPHOLOGY", AccessLevel::Public).await;
        ctx.seed_variable("owner", "WATER", AccessLevel::Sensitive).await;
        ctx.seed_measurement("m1", "temp", "c1", 3, json!(24.5)).await;
        ctx.seed_measurement("m2", "temp", "c1", 1, json!(25.1)).await;
        ctx.seed_measurement("m3", "ph", "c1", 2, json!(7.2)).await;
        ctx.seed_measurement("m4", "depth", "c1", 2, json!(40)).await;
        ctx.seed_measurement("m5", "owner", "c1", 2, json!("ejido")).await;
        ctx.seed_measurement("m6", "temp", "c2", 2, json!(22.0)).await;
        ctx
    }

    #[tokio::test]
    async fn visibility_tiers() {
        let ctx = context().await;
        let vars = &ctx.services.variables;
        let count = |page: Page<Variable>| page.data.len();

        assert_eq!(count(vars.list(&AuthUser::Anonymous, PageRequest::first(50)).await.unwrap()), 2);
        assert_eq!(count(vars.list(&regular("u1"), PageRequest::first(50)).await.unwrap()), 3);
        assert_eq!(count(vars.list(&admin("a1"), PageRequest::first(50)).await.unwrap()), 4);
        assert!(matches!(vars.get(&AuthUser::Anonymous, "ph").await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn get_data_groups_visible_series_by_theme() {
        let ctx = context().await;
        let vars = &ctx.services.variables;

        let anon = vars.get_data(&AuthUser::Anonymous, "c1", "WATER").await.unwrap();
        assert_eq!(anon.len(), 1);
        assert_eq!(anon[0].variable.key, "temp");
        let values: Vec<_> = anon[0].values.iter().map(|p| p.value.clone()).collect();
        assert_eq!(values, vec![json!(25.1), json!(24.5)]);

        let user = vars.get_data(&regular("u1"), "c1", "WATER").await.unwrap();
        let keys: Vec<_> = user.iter().map(|s| s.variable.key.as_str()).collect();
        assert_eq!(keys, vec!["ph", "temp"]);

        assert!(matches!(
            vars.get_data(&AuthUser::Anonymous, "c2", "WATER").await,
            Err(ServiceError::NotFound(_))
        ));
        assert_eq!(vars.get_data(&regular("u1"), "c2", "WATER").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn writes_are_unimplemented_for_admins() {
        let ctx = context().await;
        let vars = &ctx.services.variables;
        assert!(matches!(
            vars.update(&regular("u1"), "temp", json!({})).await,
            Err(ServiceError::PermissionDenied { .. })
        ));
        assert!(matches!(
            vars.create(&admin("a1"), json!({})).await,
            Err(ServiceError::Unimplemented { .. })
        ));
    }
}
