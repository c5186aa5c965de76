use std::sync::Arc;

use axum::{
    extract::FromRef,
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::config::{AppConfig, SecurityConfig};
use crate::database::DocumentStore;
use crate::error::ApiError;
use crate::handlers::{auth, entity_routes, oai, species, system, variables};
use crate::oai::{OaiProvider, OaiRepository};
use crate::services::{
    CenoteService, ReferenceService, Services, SpeciesService, UserService, VariableService,
};

/// Shared handler state. Cloned per request; every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn DocumentStore>,
    pub services: Services,
    pub oai: Arc<OaiProvider>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn DocumentStore>) -> Self {
        let services = Services::new(store.clone(), &config);
        let oai = OaiProvider::new(OaiRepository::new(services.cenotes.clone()), config.oai.clone());
        Self {
            config: Arc::new(config),
            store,
            services,
            oai: Arc::new(oai),
        }
    }
}

impl FromRef<AppState> for Arc<AppConfig> {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Arc<dyn DocumentStore> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Arc<OaiProvider> {
    fn from_ref(state: &AppState) -> Self {
        state.oai.clone()
    }
}

impl FromRef<AppState> for CenoteService {
    fn from_ref(state: &AppState) -> Self {
        state.services.cenotes.clone()
    }
}

impl FromRef<AppState> for SpeciesService {
    fn from_ref(state: &AppState) -> Self {
        state.services.species.clone()
    }
}

impl FromRef<AppState> for UserService {
    fn from_ref(state: &AppState) -> Self {
        state.services.users.clone()
    }
}

impl FromRef<AppState> for VariableService {
    fn from_ref(state: &AppState) -> Self {
        state.services.variables.clone()
    }
}

impl FromRef<AppState> for ReferenceService {
    fn from_ref(state: &AppState) -> Self {
        state.services.references.clone()
    }
}

pub fn app(state: AppState) -> Router {
    let request_logging = state.config.api.enable_request_logging;
    let cors = cors_layer(&state.config.security);

    let router = Router::new()
        // Public
        .route("/", get(system::root))
        .route("/health", get(system::health))
        .merge(auth_routes())
        .merge(entity_api_routes())
        .route("/oai/request", get(oai::request))
        .fallback(|| async { ApiError::not_found("Route not found") })
        .layer(cors);

    let router = if request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    };

    router.with_state(state)
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/whoami", get(auth::whoami))
}

fn entity_api_routes() -> Router<AppState> {
    Router::new()
        .nest(
            "/api/cenotes",
            entity_routes::<CenoteService>().route("/:_key/data/:theme", get(variables::cenote_data)),
        )
        .nest(
            "/api/species",
            entity_routes::<SpeciesService>()
                .route("/inaturalist/:id", get(species::by_inaturalist_id))
                .route("/aphia/:id", get(species::by_aphia_id)),
        )
        .nest("/api/users", entity_routes::<UserService>())
        .nest("/api/variables", entity_routes::<VariableService>())
        .nest("/api/references", entity_routes::<ReferenceService>())
}

/// Configured origins, `*` for any, nothing when CORS is disabled
fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if !security.enable_cors {
        return CorsLayer::new();
    }
    if security.cors_origins.is_empty() || security.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
}
