use serde::{Deserialize, Serialize};

use super::Document;
use crate::csv_exchange::{column, CsvColumn, CsvKind, CsvRecord};
use crate::database::store::CollectionName;

/// Who may read a variable and its measurements
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    #[serde(alias = "PUBLIC")]
    Public,
    #[serde(alias = "PRIVATE")]
    Private,
    /// Missing levels are treated as the most restrictive tier
    #[default]
    #[serde(alias = "SENSITIVE")]
    Sensitive,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Public => "public",
            AccessLevel::Private => "private",
            AccessLevel::Sensitive => "sensitive",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    #[serde(rename = "_key", default)]
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    pub theme: String,
    pub units: Option<String>,
    #[serde(default)]
    pub access_level: AccessLevel,
}

impl Document for Variable {
    const COLLECTION: CollectionName = CollectionName::Variables;

    fn key(&self) -> &str {
        &self.key
    }

    fn set_key(&mut self, key: String) {
        self.key = key;
    }
}

impl CsvRecord for Variable {
    const COLUMNS: &'static [CsvColumn] = &[
        column("_key", CsvKind::Text),
        column("name", CsvKind::Text),
        column("description", CsvKind::Text),
        column("theme", CsvKind::Text),
        column("units", CsvKind::Text),
        column("access_level", CsvKind::Text),
    ];
}
