//! CSV encoding of documents.
//!
//! Export renders each document through its declared column list; import
//! decodes cells by column kind into JSON objects ready to be merged into
//! stored documents.

use chrono::DateTime;
use serde::Serialize;
use serde_json::{Map, Number, Value};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvKind {
    Text,
    Integer,
    Number,
    Boolean,
    Timestamp,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvColumn {
    pub name: &'static str,
    pub kind: CsvKind,
}

pub const fn column(name: &'static str, kind: CsvKind) -> CsvColumn {
    CsvColumn { name, kind }
}

/// A document type with a fixed CSV layout
pub trait CsvRecord: Serialize {
    const COLUMNS: &'static [CsvColumn];
}

#[derive(Debug, Error)]
pub enum CsvError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Row {row}, column '{column}': {message}")]
    Cell {
        row: usize,
        column: &'static str,
        message: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV output is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Header row plus one row per record, `\n` terminated.
pub fn to_csv<T: CsvRecord>(records: &[T]) -> Result<String, CsvError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(T::COLUMNS.iter().map(|c| c.name))?;
    for record in records {
        let value = serde_json::to_value(record)?;
        let row: Vec<String> = T::COLUMNS
            .iter()
            .map(|c| render_cell(value.get(c.name)))
            .collect();
        writer.write_record(&row)?;
    }

    let bytes = writer.into_inner().map_err(|e| CsvError::Io(e.into_error()))?;
    Ok(String::from_utf8(bytes)?)
}

fn render_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Decode every data row into a JSON object keyed by column name.
///
/// Unknown headers are skipped, empty cells become `null`. Row numbers in
/// errors are 1-based and exclude the header.
pub fn parse_rows(columns: &[CsvColumn], text: &str) -> Result<Vec<Map<String, Value>>, CsvError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let mapping: Vec<(usize, CsvColumn)> = headers
        .iter()
        .enumerate()
        .filter_map(|(idx, name)| {
            let name = name.trim().trim_start_matches('\u{feff}');
            columns.iter().find(|c| c.name == name).map(|c| (idx, *c))
        })
        .collect();

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        let row = idx + 1;
        let mut object = Map::new();
        for (cell_idx, column) in &mapping {
            let cell = record.get(*cell_idx).unwrap_or("");
            let value = decode_cell(column.kind, cell).map_err(|message| CsvError::Cell {
                row,
                column: column.name,
                message,
            })?;
            object.insert(column.name.to_string(), value);
        }
        rows.push(object);
    }
    Ok(rows)
}

fn decode_cell(kind: CsvKind, cell: &str) -> Result<Value, String> {
    if cell.is_empty() {
        return Ok(Value::Null);
    }
    let trimmed = cell.trim();
    match kind {
        CsvKind::Text => Ok(Value::String(cell.to_string())),
        CsvKind::Integer => trimmed
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| format!("'{}' is not an integer", cell)),
        CsvKind::Number => {
            if let Ok(i) = trimmed.parse::<i64>() {
                return Ok(Value::from(i));
            }
            trimmed
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| format!("'{}' is not a number", cell))
        }
        CsvKind::Boolean => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(Value::Bool(true)),
            "false" | "0" => Ok(Value::Bool(false)),
            _ => Err(format!("'{}' is not a boolean", cell)),
        },
        CsvKind::Timestamp => DateTime::parse_from_rfc3339(trimmed)
            .map(|_| Value::String(trimmed.to_string()))
            .map_err(|e| format!("'{}' is not an RFC 3339 timestamp: {}", cell, e)),
        CsvKind::Json => serde_json::from_str(cell).map_err(|e| format!("invalid JSON: {}", e)),
    }
}
