//! Per-entity read restrictions derived from the caller.
//!
//! Each function returns a where clause to AND into the store query, or
//! `None` when the caller is unrestricted.

use serde_json::{json, Value};

use crate::auth::AuthUser;
use crate::database::models::{AccessLevel, Role};

/// Anonymous callers only see touristic cenotes
pub fn cenote_filter(user: &AuthUser) -> Option<Value> {
    match user {
        AuthUser::Anonymous => Some(json!({ "touristic": true })),
        AuthUser::Authenticated(_) => None,
    }
}

pub fn visible_access_levels(user: &AuthUser) -> Vec<AccessLevel> {
    match user {
        AuthUser::Anonymous => vec![AccessLevel::Public],
        AuthUser::Authenticated(session) if session.role == Role::Admin => {
            vec![AccessLevel::Public, AccessLevel::Private, AccessLevel::Sensitive]
        }
        AuthUser::Authenticated(_) => vec![AccessLevel::Public, AccessLevel::Private],
    }
}

pub fn variable_filter(user: &AuthUser) -> Option<Value> {
    let levels: Vec<&str> = visible_access_levels(user).iter().map(|l| l.as_str()).collect();
    Some(json!({ "access_level": { "$in": levels } }))
}

/// Admins see everyone, users see themselves, anonymous callers see nobody
pub fn user_filter(user: &AuthUser) -> Option<Value> {
    match user {
        AuthUser::Anonymous => Some(json!({ "_key": { "$in": [] } })),
        AuthUser::Authenticated(session) if session.role == Role::Admin => None,
        AuthUser::Authenticated(session) => Some(json!({ "_key": session.key })),
    }
}
