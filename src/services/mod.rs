pub mod access;
pub mod catalogue_service;
pub mod cenote_service;
pub mod entity;
pub mod species_service;
pub mod user_service;
pub mod variable_service;

pub use catalogue_service::{CatalogueService, ReferenceService, SpeciesService};
pub use cenote_service::CenoteService;
pub use entity::{EntityService, ServiceError};
pub use user_service::{Signup, UserService};
pub use variable_service::{DataPoint, VariableSeries, VariableService};

use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::DocumentStore;

/// Every entity service over one shared store
#[derive(Clone)]
pub struct Services {
    pub cenotes: CenoteService,
    pub species: SpeciesService,
    pub users: UserService,
    pub variables: VariableService,
    pub references: ReferenceService,
}

impl Services {
    pub fn new(store: Arc<dyn DocumentStore>, config: &AppConfig) -> Self {
        let max_limit = config.api.max_limit;
        Self {
            cenotes: CenoteService::new(store.clone(), max_limit),
            species: SpeciesService::new(store.clone(), max_limit),
            users: UserService::new(store.clone(), max_limit, config.security.bcrypt_cost),
            variables: VariableService::new(store.clone(), max_limit),
            references: ReferenceService::new(store, max_limit),
        }
    }
}
