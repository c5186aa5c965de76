use serde_json::{Map, Value};

use super::error::FilterError;
use super::types::{FilterOp, SqlParam};

/// Parsed form of a JSON where clause.
///
/// `{ "touristic": true }` is an implicit `$eq`; operator objects such as
/// `{ "access_level": { "$in": ["public", "private"] } }` and the logical
/// forms `$and` / `$or` / `$not` nest arbitrarily.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Field {
        path: Vec<String>,
        operator: FilterOp,
        data: Value,
    },
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
}

pub struct FilterWhere {
    param_values: Vec<SqlParam>,
    param_index: usize,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
        }
    }

    /// Generate a SQL predicate over the `data` JSONB column.
    /// Placeholders are numbered from `starting_param_index + 1`.
    pub fn generate(where_data: &Value, starting_param_index: usize) -> Result<(String, Vec<SqlParam>), FilterError> {
        let condition = Self::parse(where_data)?;
        let mut filter_where = Self::new(starting_param_index);
        let sql = filter_where.build_sql(&condition)?;
        Ok((sql, filter_where.param_values))
    }

    pub fn parse(where_data: &Value) -> Result<Condition, FilterError> {
        match where_data {
            Value::Null => Ok(Condition::And(vec![])),
            Value::Object(obj) => Self::parse_object(obj),
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    fn parse_object(obj: &Map<String, Value>) -> Result<Condition, FilterError> {
        let mut conditions = Vec::with_capacity(obj.len());
        for (key, value) in obj {
            if key.starts_with('$') {
                conditions.push(Self::parse_logical_operator(key, value)?);
            } else {
                conditions.extend(Self::parse_field_condition(key, value)?);
            }
        }
        Ok(match conditions.len() {
            1 => conditions.remove(0),
            _ => Condition::And(conditions),
        })
    }

    fn parse_logical_operator(key: &str, value: &Value) -> Result<Condition, FilterError> {
        match Self::operator(key)? {
            FilterOp::And | FilterOp::Or => {
                let items = value.as_array().ok_or_else(|| {
                    FilterError::InvalidOperatorData(format!("{} requires an array of conditions", key))
                })?;
                let parsed = items.iter().map(Self::parse).collect::<Result<Vec<_>, _>>()?;
                if key == "$and" {
                    Ok(Condition::And(parsed))
                } else {
                    Ok(Condition::Or(parsed))
                }
            }
            FilterOp::Not => Ok(Condition::Not(Box::new(Self::parse(value)?))),
            _ => Err(FilterError::UnsupportedOperator(format!("{} is not a logical operator", key))),
        }
    }

    fn parse_field_condition(field: &str, value: &Value) -> Result<Vec<Condition>, FilterError> {
        let path = Self::parse_path(field)?;

        let operators = match value {
            Value::Object(obj) if !obj.is_empty() && obj.keys().all(|k| k.starts_with('$')) => obj,
            _ => {
                return Ok(vec![Condition::Field {
                    path,
                    operator: FilterOp::Eq,
                    data: value.clone(),
                }])
            }
        };

        operators
            .iter()
            .map(|(op_key, data)| {
                let operator = Self::operator(op_key)?;
                match operator {
                    FilterOp::In | FilterOp::NIn if !data.is_array() => Err(FilterError::InvalidOperatorData(
                        format!("{} on '{}' requires an array", op_key, field),
                    )),
                    FilterOp::Exists if !data.is_boolean() => Err(FilterError::InvalidOperatorData(
                        format!("$exists on '{}' requires a boolean", field),
                    )),
                    FilterOp::And | FilterOp::Or | FilterOp::Not => Err(FilterError::UnsupportedOperator(
                        format!("{} cannot be applied to field '{}'", op_key, field),
                    )),
                    _ => Ok(Condition::Field {
                        path: path.clone(),
                        operator,
                        data: data.clone(),
                    }),
                }
            })
            .collect()
    }

    fn operator(key: &str) -> Result<FilterOp, FilterError> {
        serde_json::from_value(Value::String(key.to_string()))
            .map_err(|_| FilterError::UnsupportedOperator(key.to_string()))
    }

    fn parse_path(field: &str) -> Result<Vec<String>, FilterError> {
        let segments: Vec<String> = field.split('.').map(str::to_string).collect();
        for segment in &segments {
            let mut chars = segment.chars();
            let valid_start = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
            if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(FilterError::InvalidField(field.to_string()));
            }
        }
        Ok(segments)
    }

    fn build_sql(&mut self, condition: &Condition) -> Result<String, FilterError> {
        match condition {
            Condition::And(items) if items.is_empty() => Ok("TRUE".to_string()),
            Condition::Or(items) if items.is_empty() => Ok("FALSE".to_string()),
            Condition::And(items) => self.join_sql(items, " AND "),
            Condition::Or(items) => self.join_sql(items, " OR "),
            Condition::Not(inner) => Ok(format!("NOT ({})", self.build_sql(inner)?)),
            Condition::Field { path, operator, data } => self.build_field_sql(path, *operator, data),
        }
    }

    fn join_sql(&mut self, items: &[Condition], separator: &str) -> Result<String, FilterError> {
        let parts = items
            .iter()
            .map(|c| self.build_sql(c))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(format!("({})", parts.join(separator)))
    }

    fn build_field_sql(&mut self, path: &[String], operator: FilterOp, data: &Value) -> Result<String, FilterError> {
        // Path segments are validated identifiers, safe to inline
        let column = format!("(data #> '{{{}}}')", path.join(","));

        let sql = match operator {
            FilterOp::Eq if data.is_null() => format!("({0} IS NULL OR {0} = 'null'::jsonb)", column),
            FilterOp::Eq => format!("{} = {}", column, self.push_param(data.clone())),
            FilterOp::Ne if data.is_null() => format!("({0} IS NOT NULL AND {0} <> 'null'::jsonb)", column),
            FilterOp::Ne => format!("{} IS DISTINCT FROM {}", column, self.push_param(data.clone())),
            FilterOp::In | FilterOp::NIn => {
                let values = data.as_array().cloned().unwrap_or_default();
                let negate = operator == FilterOp::NIn;
                if values.is_empty() {
                    return Ok(if negate { "TRUE" } else { "FALSE" }.to_string());
                }
                let placeholders = values
                    .into_iter()
                    .map(|v| self.push_param(v))
                    .collect::<Vec<_>>()
                    .join(", ");
                if negate {
                    format!("({0} IS NULL OR {0} NOT IN ({1}))", column, placeholders)
                } else {
                    format!("{} IN ({})", column, placeholders)
                }
            }
            FilterOp::Exists => {
                if data.as_bool().unwrap_or(false) {
                    format!("({0} IS NOT NULL AND {0} <> 'null'::jsonb)", column)
                } else {
                    format!("({0} IS NULL OR {0} = 'null'::jsonb)", column)
                }
            }
            other => {
                return Err(FilterError::UnsupportedOperator(format!("{:?}", other)));
            }
        };
        Ok(sql)
    }

    fn push_param(&mut self, value: Value) -> String {
        self.param_values.push(SqlParam::Json(value));
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}

impl Condition {
    pub fn evaluate(&self, document: &Value) -> bool {
        match self {
            Condition::And(items) => items.iter().all(|c| c.evaluate(document)),
            Condition::Or(items) => items.iter().any(|c| c.evaluate(document)),
            Condition::Not(inner) => !inner.evaluate(document),
            Condition::Field { path, operator, data } => {
                let actual = value_at(document, path).filter(|v| !v.is_null());
                match operator {
                    FilterOp::Eq => equals(actual, data),
                    FilterOp::Ne => !equals(actual, data),
                    FilterOp::In => contains(actual, data),
                    FilterOp::NIn => !contains(actual, data),
                    FilterOp::Exists => actual.is_some() == data.as_bool().unwrap_or(false),
                    _ => false,
                }
            }
        }
    }
}

fn value_at<'a>(document: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(document, |current, segment| current.get(segment.as_str()))
}

fn equals(actual: Option<&Value>, expected: &Value) -> bool {
    match actual {
        None => expected.is_null(),
        Some(value) => value == expected,
    }
}

fn contains(actual: Option<&Value>, candidates: &Value) -> bool {
    match (actual, candidates.as_array()) {
        (Some(value), Some(list)) => list.contains(value),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn matches(where_data: &Value, document: &Value) -> bool {
        FilterWhere::parse(where_data).unwrap().evaluate(document)
    }

    #[test]
    fn implicit_equality_generates_jsonb_comparison() {
        let (sql, params) = FilterWhere::generate(&json!({ "touristic": true }), 0).unwrap();
        assert_eq!(sql, "(data #> '{touristic}') = $1");
        assert_eq!(params, vec![SqlParam::Json(json!(true))]);
    }

    #[test]
    fn in_operator_expands_placeholders() {
        let where_data = json!({ "access_level": { "$in": ["public", "private"] } });
        let (sql, params) = FilterWhere::generate(&where_data, 2).unwrap();
        assert_eq!(sql, "(data #> '{access_level}') IN ($3, $4)");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn empty_in_matches_nothing() {
        let where_data = json!({ "_key": { "$in": [] } });
        let (sql, params) = FilterWhere::generate(&where_data, 0).unwrap();
        assert_eq!(sql, "FALSE");
        assert!(params.is_empty());
        assert!(!matches(&where_data, &json!({ "_key": "u1" })));
    }

    #[test]
    fn nested_logical_operators() {
        let where_data = json!({
            "$or": [
                { "touristic": true },
                { "$and": [{ "state": "Yucatan" }, { "municipality": { "$ne": null } }] }
            ]
        });
        let (sql, _) = FilterWhere::generate(&where_data, 0).unwrap();
        assert!(sql.starts_with("((data #> '{touristic}') = $1 OR ("));

        assert!(matches(&where_data, &json!({ "touristic": true })));
        assert!(matches(
            &where_data,
            &json!({ "touristic": false, "state": "Yucatan", "municipality": "Merida" })
        ));
        assert!(!matches(&where_data, &json!({ "touristic": false, "state": "Yucatan" })));
    }

    #[test]
    fn dotted_paths_reach_nested_fields() {
        let where_data = json!({ "location.country": "MX" });
        let (sql, _) = FilterWhere::generate(&where_data, 0).unwrap();
        assert_eq!(sql, "(data #> '{location,country}') = $1");
        assert!(matches(&where_data, &json!({ "location": { "country": "MX" } })));
    }

    #[test]
    fn missing_field_never_matches_a_value() {
        let where_data = json!({ "touristic": true });
        assert!(!matches(&where_data, &json!({ "name": "Ik Kil" })));
        assert!(matches(&json!({ "touristic": null }), &json!({})));
    }

    #[test]
    fn rejects_injection_in_field_names() {
        let where_data = json!({ "name'); DROP TABLE users; --": 1 });
        assert!(matches!(
            FilterWhere::generate(&where_data, 0),
            Err(FilterError::InvalidField(_))
        ));
    }

    #[test]
    fn rejects_unknown_operators() {
        let where_data = json!({ "name": { "$regex": "^I" } });
        assert!(matches!(
            FilterWhere::parse(&where_data),
            Err(FilterError::UnsupportedOperator(_))
        ));
    }
}
