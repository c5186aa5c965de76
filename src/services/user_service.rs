use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::access::user_filter;
use super::entity::{
    check_body_key, decode, new_key, require_admin, require_object, unimplemented, EntityService, ServiceError,
};
use crate::auth::{hash_password, verify_password, AuthUser, SessionUser};
use crate::csv_exchange;
use crate::database::models::{merge_documents, Role, User, UserRecord};
use crate::database::{CollectionName, DocumentStore, Page, PageRequest, Repository};
use crate::filter::FilterData;
use crate::types::Operation;

/// Self-registration payload
#[derive(Debug, Deserialize)]
pub struct Signup {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Clone)]
pub struct UserService {
    repo: Repository<UserRecord>,
    max_limit: usize,
    bcrypt_cost: u32,
}

impl UserService {
    pub fn new(store: Arc<dyn DocumentStore>, max_limit: usize, bcrypt_cost: u32) -> Self {
        Self {
            repo: Repository::new(store),
            max_limit,
            bcrypt_cost,
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, ServiceError> {
        Ok(self.repo.select_one(FilterData::matching(json!({ "email": email }))).await?)
    }

    /// Lowercased, trimmed email that no user other than `owner` holds
    async fn claim_email(&self, email: &str, owner: Option<&str>) -> Result<String, ServiceError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(ServiceError::Validation("A valid email is required".to_string()));
        }
        match self.find_by_email(&email).await? {
            Some(existing) if Some(existing.key.as_str()) != owner => {
                Err(ServiceError::Conflict(format!("User with email {} already exists", email)))
            }
            _ => Ok(email),
        }
    }

    /// Register a new user with the given role
    pub async fn register(&self, signup: Signup, role: Role) -> Result<User, ServiceError> {
        if signup.password.is_empty() {
            return Err(ServiceError::Validation("Password must not be empty".to_string()));
        }
        let email = self.claim_email(&signup.email, None).await?;

        let now = Utc::now();
        let record = UserRecord {
            key: new_key(),
            email,
            name: signup.name,
            password_hash: hash_password(&signup.password, self.bcrypt_cost).await?,
            role,
            created_at: Some(now),
            updated_at: Some(now),
        };
        self.repo.insert(&record).await?;
        info!("Registered user {} ({})", record.key, role.as_str());
        Ok(record.into())
    }

    /// Check login credentials
    pub async fn verify(&self, email: &str, password: &str) -> Result<User, ServiceError> {
        let email = email.trim().to_lowercase();
        let record = self.find_by_email(&email).await?.ok_or(ServiceError::InvalidCredentials)?;
        if !verify_password(password, &record.password_hash).await? {
            return Err(ServiceError::InvalidCredentials);
        }
        Ok(record.into())
    }

    /// Current identity of a token subject, `None` once the user is deleted.
    /// Role changes apply to tokens already issued.
    pub async fn session(&self, key: &str) -> Result<Option<SessionUser>, ServiceError> {
        let record = self.repo.select_key(key, None).await?;
        Ok(record.map(|record| SessionUser::from(User::from(record))))
    }

    /// Create the configured administrator unless that email is already registered.
    /// Returns whether a user was created.
    pub async fn bootstrap_admin(&self, email: &str, password: &str) -> Result<bool, ServiceError> {
        if self.find_by_email(&email.trim().to_lowercase()).await?.is_some() {
            return Ok(false);
        }
        let signup = Signup {
            email: email.to_string(),
            name: "Administrator".to_string(),
            password: password.to_string(),
        };
        self.register(signup, Role::Admin).await?;
        Ok(true)
    }
}

#[async_trait]
impl EntityService for UserService {
    type Entity = User;

    const COLLECTION: CollectionName = CollectionName::Users;
    const DEFAULT_LIMIT: usize = 250;

    fn max_limit(&self) -> usize {
        self.max_limit
    }

    async fn list(&self, user: &AuthUser, page: PageRequest) -> Result<Page<User>, ServiceError> {
        let page = self.repo.paginate(user_filter(user), &page).await?;
        Ok(page.map(User::from))
    }

    async fn get(&self, user: &AuthUser, key: &str) -> Result<User, ServiceError> {
        self.repo
            .select_key(key, user_filter(user))
            .await?
            .map(User::from)
            .ok_or_else(|| ServiceError::NotFound(CollectionName::Users.document_id(key)))
    }

    /// Self-registration: open to anyone, always creates a regular user
    async fn create(&self, _user: &AuthUser, data: Value) -> Result<User, ServiceError> {
        let signup: Signup = decode(data)?;
        self.register(signup, Role::Regular).await
    }

    async fn update(&self, user: &AuthUser, key: &str, data: Value) -> Result<User, ServiceError> {
        require_admin(user, Operation::Update, CollectionName::Users)?;
        check_body_key(key, &data)?;

        let mut patch = require_object(data)?;
        patch.remove("created_at");
        if let Some(email) = patch.remove("email") {
            let email = email
                .as_str()
                .ok_or_else(|| ServiceError::Validation("Email must be a string".to_string()))?;
            let email = self.claim_email(email, Some(key)).await?;
            patch.insert("email".to_string(), Value::String(email));
        }
        if let Some(password) = patch.remove("password") {
            let password = password
                .as_str()
                .filter(|p| !p.is_empty())
                .ok_or_else(|| ServiceError::Validation("Password must be a non-empty string".to_string()))?;
            patch.insert("password".to_string(), Value::String(hash_password(password, self.bcrypt_cost).await?));
        }
        patch.insert("updated_at".to_string(), json!(Utc::now()));

        let mut stored = self
            .repo
            .get_raw(key)
            .await?
            .ok_or_else(|| ServiceError::NotFound(CollectionName::Users.document_id(key)))?;
        merge_documents(&mut stored, &Value::Object(patch));

        let record: UserRecord = decode(stored)?;
        self.repo.replace(&record).await?;
        info!("Updated user {}", key);
        Ok(record.into())
    }

    async fn delete(&self, user: &AuthUser, key: &str) -> Result<(), ServiceError> {
        require_admin(user, Operation::Delete, CollectionName::Users)?;
        if !self.repo.delete(key).await? {
            return Err(ServiceError::NotFound(CollectionName::Users.document_id(key)));
        }
        info!("Deleted user {}", key);
        Ok(())
    }

    async fn to_csv(&self, user: &AuthUser) -> Result<String, ServiceError> {
        require_admin(user, Operation::Export, CollectionName::Users)?;
        let users = self.list(user, PageRequest::unlimited()).await?;
        Ok(csv_exchange::to_csv(&users.data)?)
    }

    async fn from_csv(&self, user: &AuthUser, _text: &str) -> Result<Vec<User>, ServiceError> {
        require_admin(user, Operation::Import, CollectionName::Users)?;
        Err(unimplemented(Operation::Import, CollectionName::Users))
    }
}
