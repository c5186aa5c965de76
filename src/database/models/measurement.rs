use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Document;
use crate::database::store::CollectionName;

/// Edge from a variable to a cenote carrying one observed value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementOrFact {
    #[serde(rename = "_key", default)]
    pub key: String,
    /// `Variables/<key>`
    #[serde(rename = "_from")]
    pub from: String,
    /// `Cenotes/<key>`
    #[serde(rename = "_to")]
    pub to: String,
    pub timestamp: DateTime<Utc>,
    pub value: Value,
}

impl MeasurementOrFact {
    pub fn variable_key(&self) -> Option<&str> {
        self.from.strip_prefix("Variables/")
    }
}

impl Document for MeasurementOrFact {
    const COLLECTION: CollectionName = CollectionName::MeasurementsOrFacts;

    fn key(&self) -> &str {
        &self.key
    }

    fn set_key(&mut self, key: String) {
        self.key = key;
    }
}
