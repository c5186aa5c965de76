pub mod jwt;
pub mod password;

pub use jwt::{generate_jwt, validate_jwt, Claims, JwtError};
pub use password::{hash_password, verify_password, PasswordError};

use serde::{Deserialize, Serialize};

use crate::database::models::{Role, User};

/// Identity resolved from a valid session token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    #[serde(rename = "_key")]
    pub key: String,
    pub email: String,
    pub name: String,
    pub role: Role,
}

/// The caller of a service operation. Extracted once per request.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthUser {
    Anonymous,
    Authenticated(SessionUser),
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        matches!(self, AuthUser::Authenticated(user) if user.role == Role::Admin)
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, AuthUser::Anonymous)
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            AuthUser::Anonymous => None,
            AuthUser::Authenticated(user) => Some(&user.key),
        }
    }

    /// Role name used in logs and `whoami`
    pub fn role_name(&self) -> &'static str {
        match self {
            AuthUser::Anonymous => "anonymous",
            AuthUser::Authenticated(user) => user.role.as_str(),
        }
    }
}

impl From<User> for SessionUser {
    fn from(user: User) -> Self {
        Self {
            key: user.key,
            email: user.email,
            name: user.name,
            role: user.role,
        }
    }
}
