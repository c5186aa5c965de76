use serde::{Deserialize, Serialize};

use super::Document;
use crate::csv_exchange::{column, CsvColumn, CsvKind, CsvRecord};
use crate::database::store::CollectionName;

/// Bibliographic reference
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "_key", default)]
    pub key: String,
    pub authors: Option<String>,
    pub title: Option<String>,
    pub year: Option<i32>,
    pub doi: Option<String>,
    pub reference_type: Option<String>,
    pub url: Option<String>,
}

impl Document for Reference {
    const COLLECTION: CollectionName = CollectionName::References;

    fn key(&self) -> &str {
        &self.key
    }

    fn set_key(&mut self, key: String) {
        self.key = key;
    }
}

impl CsvRecord for Reference {
    const COLUMNS: &'static [CsvColumn] = &[
        column("_key", CsvKind::Text),
        column("authors", CsvKind::Text),
        column("title", CsvKind::Text),
        column("year", CsvKind::Integer),
        column("doi", CsvKind::Text),
        column("reference_type", CsvKind::Text),
        column("url", CsvKind::Text),
    ];
}
