use serde::{Deserialize, Serialize};

use super::Document;
use crate::csv_exchange::{column, CsvColumn, CsvKind, CsvRecord};
use crate::database::store::CollectionName;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Species {
    #[serde(rename = "_key", default)]
    pub key: String,
    pub inaturalist_id: Option<i64>,
    pub aphia_id: Option<i64>,
    pub scientific_name: Option<String>,
    pub common_name: Option<String>,
    pub kingdom: Option<String>,
    pub phylum: Option<String>,
    pub class: Option<String>,
    pub order: Option<String>,
    pub family: Option<String>,
    pub genus: Option<String>,
}

impl Document for Species {
    const COLLECTION: CollectionName = CollectionName::Species;

    fn key(&self) -> &str {
        &self.key
    }

    fn set_key(&mut self, key: String) {
        self.key = key;
    }
}

impl CsvRecord for Species {
    const COLUMNS: &'static [CsvColumn] = &[
        column("_key", CsvKind::Text),
        column("inaturalist_id", CsvKind::Integer),
        column("aphia_id", CsvKind::Integer),
        column("scientific_name", CsvKind::Text),
        column("common_name", CsvKind::Text),
        column("kingdom", CsvKind::Text),
        column("phylum", CsvKind::Text),
        column("class", CsvKind::Text),
        column("order", CsvKind::Text),
        column("family", CsvKind::Text),
        column("genus", CsvKind::Text),
    ];
}
