#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

use cenoteando::config::AppConfig;
use cenoteando::database::models::{Cenote, Role};
use cenoteando::database::{DocumentStore, MemoryStore, Repository};
use cenoteando::services::Signup;
use cenoteando::{app, AppState};

pub const ADMIN_EMAIL: &str = "admin@cenoteando.test";
pub const REGULAR_EMAIL: &str = "diver@cenoteando.test";
pub const PASSWORD: &str = "s3cret-pass";

/// A router served on a free port over a fresh in-memory store
pub struct TestServer {
    pub base_url: String,
    pub state: AppState,
    pub client: reqwest::Client,
    pub admin_key: String,
    pub regular_key: String,
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.security.bcrypt_cost = 4;
    config.api.enable_request_logging = false;
    config
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
            .with_test_writer()
            .try_init();

        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let state = AppState::new(test_config(), store);

        let admin = state
            .services
            .users
            .register(signup(ADMIN_EMAIL, "Admin"), Role::Admin)
            .await?;
        let regular = state
            .services
            .users
            .register(signup(REGULAR_EMAIL, "Diver"), Role::Regular)
            .await?;

        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test port")?;
        let router = app(state.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        let server = Self {
            base_url: format!("http://127.0.0.1:{}", port),
            state,
            client: reqwest::Client::builder().timeout(Duration::from_secs(10)).build()?,
            admin_key: admin.key,
            regular_key: regular.key,
        };
        server.wait_ready().await?;
        tracing::debug!("test server ready at {}", server.base_url);
        Ok(server)
    }

    async fn wait_ready(&self) -> Result<()> {
        for _ in 0..50 {
            if let Ok(res) = self.client.get(self.url("/health")).send().await {
                if res.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        anyhow::bail!("server did not become ready on {}", self.base_url)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn login(&self, email: &str) -> Result<String> {
        let res = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": PASSWORD }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "login failed: {}", res.status());
        let body: Value = res.json().await?;
        body["data"]["token"]
            .as_str()
            .map(str::to_string)
            .context("login response without token")
    }

    pub async fn admin_token(&self) -> Result<String> {
        self.login(ADMIN_EMAIL).await
    }

    pub async fn regular_token(&self) -> Result<String> {
        self.login(REGULAR_EMAIL).await
    }

    pub async fn seed_cenote(&self, key: &str, name: &str, touristic: bool, updated: (i32, u32, u32)) -> Result<()> {
        let (year, month, day) = updated;
        let cenote = Cenote {
            key: key.to_string(),
            name: name.to_string(),
            touristic,
            latitude: Some(20.5),
            longitude: Some(-87.3),
            state: Some("Quintana Roo".to_string()),
            municipality: Some("Tulum".to_string()),
            created_at: Some(Utc.with_ymd_and_hms(2021, 1, 15, 0, 0, 0).unwrap()),
            updated_at: Some(Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()),
        };
        Repository::<Cenote>::new(self.state.store.clone()).insert(&cenote).await?;
        Ok(())
    }

    /// GET with an optional bearer token, returning status and JSON body
    pub async fn get_json(&self, path: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        let mut req = self.client.get(self.url(path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        let res = req.send().await?;
        let status = res.status();
        let body = res.json::<Value>().await.unwrap_or(Value::Null);
        Ok((status, body))
    }

    pub async fn send_json(
        &self,
        method: reqwest::Method,
        path: &str,
        token: Option<&str>,
        body: Value,
    ) -> Result<(StatusCode, Value)> {
        let mut req = self.client.request(method, self.url(path)).json(&body);
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        let res = req.send().await?;
        let status = res.status();
        let body = res.json::<Value>().await.unwrap_or(Value::Null);
        Ok((status, body))
    }
}

fn signup(email: &str, name: &str) -> Signup {
    Signup {
        email: email.to_string(),
        name: name.to_string(),
        password: PASSWORD.to_string(),
    }
}

/// `_key`s of a listed page body
pub fn keys(body: &Value) -> Vec<String> {
    body["data"]["data"]
        .as_array()
        .map(|docs| {
            docs.iter()
                .filter_map(|d| d["_key"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
