use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use reqwest::{header, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::config::ClientConfig;
use crate::database::models::User;
use crate::database::Page;

/// Where the frontend navigates after a 403
pub const FORBIDDEN_REDIRECT: &str = "/";

/// Failures surfaced to the user. `Display` is the message shown on screen.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Unable to connect to server")]
    Network,

    #[error("Unauthorized access or expired token")]
    Forbidden,

    #[error("Request timeout - Server took too long to respond")]
    Timeout,

    #[error("{message}")]
    Server { status: u16, message: String },

    #[error("{message}")]
    Protocol { code: String, message: String },

    #[error("Invalid API base URL: {0}")]
    InvalidUrl(String),

    #[error("Unknown Error - Contact admin")]
    Unknown(String),
}

impl ClientError {
    /// Route the frontend should move to after this error, if any
    pub fn redirect(&self) -> Option<&'static str> {
        match self {
            ClientError::Forbidden => Some(FORBIDDEN_REDIRECT),
            _ => None,
        }
    }

    /// Map a non-success HTTP status and its body
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        if status == StatusCode::FORBIDDEN {
            return ClientError::Forbidden;
        }
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string));
        match message {
            Some(message) => ClientError::Server {
                status: status.as_u16(),
                message,
            },
            None => ClientError::Unknown(format!("HTTP {} without message", status)),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_connect() {
            ClientError::Network
        } else {
            error!("Unexpected client error: {}", err);
            ClientError::Unknown(err.to_string())
        }
    }
}

/// Messages pushed by `{notification, response}` envelopes
#[derive(Debug, Clone, Default)]
pub struct Notifications {
    messages: Arc<Mutex<Vec<String>>>,
}

impl Notifications {
    pub fn push(&self, messages: impl IntoIterator<Item = String>) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(messages);
    }

    /// Drain everything pushed so far
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.messages.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Strip the `{notification, response}` wrapper, forwarding error messages
/// to `notifications`. Other bodies pass through unchanged.
pub fn unwrap_envelope(body: Value, notifications: &Notifications) -> Value {
    let Value::Object(mut map) = body else {
        return body;
    };
    let Some(notification) = map.remove("notification") else {
        return Value::Object(map);
    };

    let messages: Vec<String> = notification
        .get("errorMessages")
        .and_then(Value::as_array)
        .map(|list| list.iter().filter_map(|m| m.as_str().map(str::to_string)).collect())
        .unwrap_or_default();
    if !messages.is_empty() {
        notifications.push(messages);
    }

    map.remove("response").unwrap_or(Value::Null)
}

/// `{"success": true, "data": ...}` to `...`
fn unwrap_data(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.get("success") == Some(&Value::Bool(true)) && map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyDto {
    #[serde(rename = "repositoryName")]
    pub repository_name: String,
    #[serde(rename = "baseURL")]
    pub base_url: String,
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    #[serde(rename = "adminEmail")]
    pub admin_email: String,
    #[serde(rename = "earliestDatestamp")]
    pub earliest_datestamp: String,
    #[serde(rename = "deletedRecord")]
    pub deleted_record: String,
    pub granularity: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OaiHeaderDto {
    pub identifier: String,
    pub datestamp: String,
    #[serde(rename = "setSpec", default)]
    pub set_specs: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListIdentifiersDto {
    #[serde(rename = "header", default)]
    pub headers: Vec<OaiHeaderDto>,
}

#[derive(Debug, Deserialize)]
struct OaiErrorElement {
    #[serde(rename = "@code")]
    code: String,
    #[serde(rename = "$text", default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct OaiDocument {
    #[serde(default)]
    error: Option<OaiErrorElement>,
    #[serde(rename = "Identify", default)]
    identify: Option<IdentifyDto>,
    #[serde(rename = "ListIdentifiers", default)]
    list_identifiers: Option<ListIdentifiersDto>,
}

impl OaiDocument {
    fn parse(xml: &str) -> Result<Self, ClientError> {
        let document: OaiDocument = quick_xml::de::from_str(xml).map_err(|e| {
            error!("Unreadable OAI-PMH response: {}", e);
            ClientError::Unknown(e.to_string())
        })?;
        match document.error {
            Some(OaiErrorElement { code, message }) => Err(ClientError::Protocol { code, message }),
            None => Ok(document),
        }
    }
}

/// A logged-in session as returned by the login endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub expires_in: u64,
    pub user: User,
}

/// HTTP client for the catalogue API with the frontend's conventions:
/// fixed timeout, JSON bodies, envelope unwrapping and user-facing errors.
#[derive(Debug, Clone)]
pub struct RemoteServices {
    http: Client,
    base_url: Url,
    token: Option<String>,
    notifications: Notifications,
}

impl RemoteServices {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let base_url =
            Url::parse(&config.api_base_url).map_err(|e| ClientError::InvalidUrl(format!("{}: {}", config.api_base_url, e)))?;

        let mut headers = header::HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(ClientError::from)?;

        Ok(Self {
            http,
            base_url,
            token: None,
            notifications: Notifications::default(),
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn notifications(&self) -> &Notifications {
        &self.notifications
    }

    /// Paths are appended to the base URL, keeping any base path prefix
    fn url(&self, path: &str) -> Result<Url, ClientError> {
        let joined = format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path);
        Url::parse(&joined).map_err(|e| ClientError::InvalidUrl(format!("{}: {}", joined, e)))
    }

    fn request(&self, method: reqwest::Method, path: &str) -> Result<reqwest::RequestBuilder, ClientError> {
        let builder = self.http.request(method, self.url(path)?);
        Ok(match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<Response, ClientError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        debug!("Request failed with status {}", status);
        Err(ClientError::from_status(status, &body))
    }

    async fn json<T: DeserializeOwned>(&self, builder: reqwest::RequestBuilder) -> Result<T, ClientError> {
        let body: Value = self.send(builder).await?.json().await?;
        let body = unwrap_data(unwrap_envelope(body, &self.notifications));
        serde_json::from_value(body).map_err(|e| ClientError::Unknown(e.to_string()))
    }

    async fn oai(&self, query: &[(&str, &str)]) -> Result<OaiDocument, ClientError> {
        let builder = self.request(reqwest::Method::GET, "/oai/request")?.query(query);
        let xml = self.send(builder).await?.text().await?;
        OaiDocument::parse(&xml)
    }

    // OAI-PMH

    pub async fn identify(&self) -> Result<IdentifyDto, ClientError> {
        self.oai(&[("verb", "Identify")])
            .await?
            .identify
            .ok_or_else(|| ClientError::Unknown("Identify element missing".to_string()))
    }

    pub async fn list_identifiers(&self) -> Result<ListIdentifiersDto, ClientError> {
        let document = self
            .oai(&[("verb", "ListIdentifiers"), ("metadataPrefix", "oai_datacite")])
            .await?;
        Ok(document.list_identifiers.unwrap_or_default())
    }

    // REST

    /// Log in and keep the issued token for later calls
    pub async fn login(&mut self, email: &str, password: &str) -> Result<Session, ClientError> {
        let builder = self
            .request(reqwest::Method::POST, "/api/auth/login")?
            .json(&serde_json::json!({ "email": email, "password": password }));
        let session: Session = self.json(builder).await?;
        self.token = Some(session.token.clone());
        Ok(session)
    }

    pub async fn list(
        &self,
        entity: &str,
        limit: Option<usize>,
        continuation_token: Option<&str>,
    ) -> Result<Page<Value>, ClientError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(token) = continuation_token {
            query.push(("continuation_token", token.to_string()));
        }
        let builder = self.request(reqwest::Method::GET, &format!("/api/{}", entity))?.query(&query);
        self.json(builder).await
    }

    pub async fn get(&self, entity: &str, key: &str) -> Result<Value, ClientError> {
        let builder = self.request(reqwest::Method::GET, &format!("/api/{}/{}", entity, key))?;
        self.json(builder).await
    }

    pub async fn export_csv(&self, entity: &str) -> Result<String, ClientError> {
        let builder = self.request(reqwest::Method::GET, &format!("/api/{}/csv", entity))?;
        Ok(self.send(builder).await?.text().await?)
    }

    pub async fn import_csv(&self, entity: &str, csv: String) -> Result<Vec<Value>, ClientError> {
        let builder = self
            .request(reqwest::Method::PUT, &format!("/api/{}/csv", entity))?
            .header(header::CONTENT_TYPE, "text/csv")
            .body(csv);
        self.json(builder).await
    }
}
