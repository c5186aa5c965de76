use serde_json::Value;

use super::error::FilterError;
use super::filter_where::{Condition, FilterWhere};
use super::types::{FilterData, SqlParam, SqlResult};

/// Compiled query over one collection table.
pub struct Filter {
    table_name: String,
    condition: Condition,
    where_data: Option<Value>,
    after_key: Option<String>,
    limit: Option<usize>,
}

impl Filter {
    pub fn new(table_name: impl Into<String>) -> Result<Self, FilterError> {
        let table_name = table_name.into();
        Self::validate_table_name(&table_name)?;
        Ok(Self {
            table_name,
            condition: Condition::And(vec![]),
            where_data: None,
            after_key: None,
            limit: None,
        })
    }

    pub fn assign(&mut self, data: FilterData) -> Result<&mut Self, FilterError> {
        if let Some(where_clause) = data.where_clause { self.where_clause(where_clause)?; }
        self.after_key = data.after_key;
        self.limit = data.limit;
        Ok(self)
    }

    pub fn where_clause(&mut self, conditions: Value) -> Result<&mut Self, FilterError> {
        self.condition = FilterWhere::parse(&conditions)?;
        self.where_data = Some(conditions);
        Ok(self)
    }

    pub fn after_key(&self) -> Option<&str> {
        self.after_key.as_deref()
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// True when `document` satisfies the where clause and sorts after the cursor.
    pub fn matches(&self, key: &str, document: &Value) -> bool {
        if let Some(after) = &self.after_key {
            if key <= after.as_str() {
                return false;
            }
        }
        self.condition.evaluate(document)
    }

    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        let (mut where_clause, mut params) = match &self.where_data {
            Some(where_data) => FilterWhere::generate(where_data, 0)?,
            None => ("TRUE".to_string(), vec![]),
        };

        if let Some(after) = &self.after_key {
            params.push(SqlParam::Text(after.clone()));
            where_clause = format!("{} AND \"_key\" > ${}", where_clause, params.len());
        }

        let query = [
            "SELECT data".to_string(),
            format!("FROM \"{}\"", self.table_name),
            format!("WHERE {}", where_clause),
            "ORDER BY \"_key\" ASC".to_string(),
            self.build_limit_clause(),
        ].into_iter().filter(|s| !s.is_empty()).collect::<Vec<_>>().join(" ");

        Ok(SqlResult { query, params })
    }

    fn validate_table_name(name: &str) -> Result<(), FilterError> {
        let mut chars = name.chars();
        let valid_start = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
        if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(FilterError::InvalidTableName(format!("Invalid table name format: {}", name)));
        }
        Ok(())
    }

    fn build_limit_clause(&self) -> String {
        match self.limit {
            Some(l) => format!("LIMIT {}", l),
            None => String::new(),
        }
    }
}
