use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde_json::Value;

use crate::app::AppState;
use crate::auth::{AuthUser, SessionUser};
use crate::config::AppConfig;
use crate::database::models::{AccessLevel, Cenote, MeasurementOrFact, Role, Variable};
use crate::database::{DocumentStore, MemoryStore, Repository};
use crate::services::Services;

pub fn admin(key: &str) -> AuthUser {
    session(key, Role::Admin)
}

pub fn regular(key: &str) -> AuthUser {
    session(key, Role::Regular)
}

fn session(key: &str, role: Role) -> AuthUser {
    AuthUser::Authenticated(SessionUser {
        key: key.to_string(),
        email: format!("{key}@cenoteando.test"),
        name: key.to_uppercase(),
        role,
    })
}

/// Development config with the cheapest bcrypt cost
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.security.bcrypt_cost = crate::auth::password::MIN_BCRYPT_COST;
    config
}

/// Services over a fresh in-memory store
pub struct TestContext {
    pub store: Arc<dyn DocumentStore>,
    pub services: Services,
}

impl TestContext {
    pub fn new() -> Self {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let services = Services::new(store.clone(), &test_config());
        Self { store, services }
    }

    /// Router state sharing this context's store
    pub fn state(&self) -> AppState {
        AppState::new(test_config(), self.store.clone())
    }

    pub async fn seed_cenote(&self, key: &str, name: &str, touristic: bool) -> Cenote {
        let cenote = Cenote {
            key: key.to_string(),
            name: name.to_string(),
            touristic,
            latitude: Some(20.6296),
            longitude: Some(-87.0739),
            state: Some("Quintana Roo".to_string()),
            municipality: None,
            created_at: Some(Utc.with_ymd_and_hms(2021, 3, 1, 0, 0, 0).unwrap()),
            updated_at: Some(Utc.with_ymd_and_hms(2022, 6, 15, 12, 0, 0).unwrap()),
        };
        Repository::<Cenote>::new(self.store.clone()).insert(&cenote).await.unwrap();
        cenote
    }

    pub async fn seed_variable(&self, key: &str, theme: &str, access_level: AccessLevel) -> Variable {
        let variable = Variable {
            key: key.to_string(),
            name: format!("Variable {key}"),
            description: None,
            theme: theme.to_string(),
            units: Some("°C".to_string()),
            access_level,
        };
        Repository::<Variable>::new(self.store.clone()).insert(&variable).await.unwrap();
        variable
    }

    pub async fn seed_measurement(&self, key: &str, variable: &str, cenote: &str, day: u32, value: Value) {
        let measurement = MeasurementOrFact {
            key: key.to_string(),
            from: format!("Variables/{variable}"),
            to: format!("Cenotes/{cenote}"),
            timestamp: Utc.with_ymd_and_hms(2023, 1, day, 0, 0, 0).unwrap(),
            value,
        };
        Repository::<MeasurementOrFact>::new(self.store.clone())
            .insert(&measurement)
            .await
            .unwrap();
    }
}
