use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Document;
use crate::csv_exchange::{column, CsvColumn, CsvKind, CsvRecord};
use crate::database::store::CollectionName;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cenote {
    #[serde(rename = "_key", default)]
    pub key: String,
    pub name: String,
    /// Public visibility: anonymous callers only ever see touristic cenotes
    #[serde(default)]
    pub touristic: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub state: Option<String>,
    pub municipality: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Cenote {
    /// `"lat lon"` when both coordinates are known
    pub fn geolocation_point(&self) -> Option<String> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(format!("{} {}", lat, lon)),
            _ => None,
        }
    }
}

impl Document for Cenote {
    const COLLECTION: CollectionName = CollectionName::Cenotes;

    fn key(&self) -> &str {
        &self.key
    }

    fn set_key(&mut self, key: String) {
        self.key = key;
    }
}

impl CsvRecord for Cenote {
    const COLUMNS: &'static [CsvColumn] = &[
        column("_key", CsvKind::Text),
        column("name", CsvKind::Text),
        column("touristic", CsvKind::Boolean),
        column("latitude", CsvKind::Number),
        column("longitude", CsvKind::Number),
        column("state", CsvKind::Text),
        column("municipality", CsvKind::Text),
        column("created_at", CsvKind::Timestamp),
        column("updated_at", CsvKind::Timestamp),
    ];
}
