use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
    #[serde(rename = "$eq")] Eq,
    #[serde(rename = "$ne")] Ne,
    #[serde(rename = "$in")] In,
    #[serde(rename = "$nin")] NIn,
    #[serde(rename = "$exists")] Exists,

    #[serde(rename = "$and")] And,
    #[serde(rename = "$or")] Or,
    #[serde(rename = "$not")] Not,
}

/// Query against a single collection. Results are always ordered by `_key`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterData {
    #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<Value>,
    /// Keyset cursor: only documents whose `_key` sorts after this value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl FilterData {
    pub fn matching(where_clause: Value) -> Self {
        Self {
            where_clause: Some(where_clause),
            ..Default::default()
        }
    }

    /// Restrict the current where clause further with `extra`.
    pub fn and_where(mut self, extra: Value) -> Self {
        self.where_clause = Some(match self.where_clause.take() {
            None => extra,
            Some(existing) => json!({ "$and": [existing, extra] }),
        });
        self
    }

    pub fn after(mut self, key: Option<String>) -> Self {
        self.after_key = key;
        self
    }

    pub fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }
}

/// Bound parameter for generated SQL
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Json(Value),
    Text(String),
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<SqlParam>,
}
