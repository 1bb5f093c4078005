//! Column filters in the platform's own grammar.
//!
//! A filter maps a column to `[operator, value]`, or to a bare scalar as a
//! shorthand for `["eq", value]`. Columns combine with AND. The `in` operator
//! is the only one that needs reshaping: it becomes an `or` of equalities.

use std::collections::BTreeMap;
use std::fmt;

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::domain::query::Row;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    Eq,
    Neq,
    Like,
    Notlike,
    Reg,
    Nreg,
    Ireg,
    Nireg,
    Empty,
    In,
}

impl FilterOperator {
    pub const ALL: [FilterOperator; 10] = [
        FilterOperator::Eq,
        FilterOperator::Neq,
        FilterOperator::Like,
        FilterOperator::Notlike,
        FilterOperator::Reg,
        FilterOperator::Nreg,
        FilterOperator::Ireg,
        FilterOperator::Nireg,
        FilterOperator::Empty,
        FilterOperator::In,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Like => "like",
            Self::Notlike => "notlike",
            Self::Reg => "reg",
            Self::Nreg => "nreg",
            Self::Ireg => "ireg",
            Self::Nireg => "nireg",
            Self::Empty => "empty",
            Self::In => "in",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|operator| operator.as_str() == normalized)
    }

    fn is_regex(&self) -> bool {
        matches!(self, Self::Reg | Self::Nreg | Self::Ireg | Self::Nireg)
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("filter on `{column}` uses unsupported operator `{operator}`")]
    UnknownOperator { column: String, operator: String },
    #[error("filter on `{column}` is malformed: {reason}")]
    InvalidPredicate { column: String, reason: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Predicate {
    pub operator: FilterOperator,
    pub value: Value,
}

impl Predicate {
    pub fn new(operator: FilterOperator, value: impl Into<Value>) -> Self {
        Self { operator, value: value.into() }
    }

    fn parse(column: &str, raw: &Value) -> Result<Self, FilterError> {
        let predicate = match raw {
            Value::Array(items) => {
                let [operator, value] = items.as_slice() else {
                    return Err(invalid(column, "expected a two element [operator, value] array"));
                };
                let Some(operator_name) = operator.as_str() else {
                    return Err(invalid(column, "operator must be a string"));
                };
                let operator = FilterOperator::parse(operator_name).ok_or_else(|| {
                    FilterError::UnknownOperator {
                        column: column.to_string(),
                        operator: operator_name.to_string(),
                    }
                })?;
                Self { operator, value: value.clone() }
            }
            Value::Object(_) => {
                return Err(invalid(column, "nested filter objects are not supported"));
            }
            scalar => Self { operator: FilterOperator::Eq, value: scalar.clone() },
        };
        predicate.check(column)?;
        Ok(predicate)
    }

    fn check(&self, column: &str) -> Result<(), FilterError> {
        match self.operator {
            FilterOperator::Eq | FilterOperator::Neq => {
                if !is_scalar(&self.value) {
                    return Err(invalid(column, "value must be a string, number, boolean or null"));
                }
            }
            FilterOperator::Like | FilterOperator::Notlike => {
                if !self.value.is_string() {
                    return Err(invalid(column, "value must be a string"));
                }
            }
            FilterOperator::Reg
            | FilterOperator::Nreg
            | FilterOperator::Ireg
            | FilterOperator::Nireg => {
                let Some(pattern) = self.value.as_str() else {
                    return Err(invalid(column, "regular expression must be a string"));
                };
                RegexBuilder::new(pattern)
                    .build()
                    .map_err(|error| invalid(column, &format!("invalid regular expression: {error}")))?;
            }
            FilterOperator::Empty => {
                if !self.value.is_boolean() {
                    return Err(invalid(column, "`empty` expects true or false"));
                }
            }
            FilterOperator::In => {
                let Some(items) = self.value.as_array() else {
                    return Err(invalid(column, "`in` expects an array of values"));
                };
                if items.is_empty() || !items.iter().all(is_scalar) {
                    return Err(invalid(column, "`in` expects a non-empty array of scalar values"));
                }
            }
        }
        Ok(())
    }

    /// Evaluates the predicate against a row value the way the platform does.
    pub fn matches(&self, actual: Option<&Value>) -> bool {
        let actual = actual.unwrap_or(&Value::Null);
        match self.operator {
            FilterOperator::Eq => values_equal(actual, &self.value),
            FilterOperator::Neq => !values_equal(actual, &self.value),
            FilterOperator::Like => contains_ignore_case(actual, &self.value),
            FilterOperator::Notlike => !contains_ignore_case(actual, &self.value),
            FilterOperator::Reg | FilterOperator::Ireg => self.regex_matches(actual),
            FilterOperator::Nreg | FilterOperator::Nireg => !self.regex_matches(actual),
            FilterOperator::Empty => is_empty(actual) == self.value.as_bool().unwrap_or(true),
            FilterOperator::In => self
                .value
                .as_array()
                .map(|items| items.iter().any(|item| values_equal(actual, item)))
                .unwrap_or(false),
        }
    }

    fn regex_matches(&self, actual: &Value) -> bool {
        debug_assert!(self.operator.is_regex());
        let Some(pattern) = self.value.as_str() else {
            return false;
        };
        let case_insensitive = matches!(self.operator, FilterOperator::Ireg | FilterOperator::Nireg);
        match RegexBuilder::new(pattern).case_insensitive(case_insensitive).build() {
            Ok(regex) => regex.is_match(&display_value(actual)),
            Err(_) => false,
        }
    }

    fn to_backend(&self, column: &str) -> Value {
        match self.operator {
            FilterOperator::In => {
                let alternatives: Vec<Value> = self
                    .value
                    .as_array()
                    .map(|items| items.iter().map(|item| json!({ column: ["eq", item] })).collect())
                    .unwrap_or_default();
                json!({ "or": alternatives })
            }
            operator => json!({ column: [operator.as_str(), self.value] }),
        }
    }
}

/// A parsed filter document, keyed by column.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableFilter {
    predicates: BTreeMap<String, Predicate>,
}

impl TableFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(raw: &Map<String, Value>) -> Result<Self, FilterError> {
        let mut predicates = BTreeMap::new();
        for (column, value) in raw {
            if column.trim().is_empty() {
                return Err(invalid(column, "column name must not be empty"));
            }
            predicates.insert(column.clone(), Predicate::parse(column, value)?);
        }
        Ok(Self { predicates })
    }

    pub fn with(mut self, column: impl Into<String>, predicate: Predicate) -> Self {
        self.predicates.insert(column.into(), predicate);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.predicates.keys().map(String::as_str)
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.predicates.iter().all(|(column, predicate)| predicate.matches(row.get(column)))
    }

    /// Shapes the filter into the request envelope the table API expects.
    pub fn to_backend_json(&self) -> Value {
        let needs_conjunction =
            self.predicates.values().any(|predicate| predicate.operator == FilterOperator::In);

        if needs_conjunction {
            let clauses: Vec<Value> = self
                .predicates
                .iter()
                .map(|(column, predicate)| predicate.to_backend(column))
                .collect();
            return json!({ "and": clauses });
        }

        let mut envelope = Map::new();
        for (column, predicate) in &self.predicates {
            envelope.insert(column.clone(), json!([predicate.operator.as_str(), predicate.value]));
        }
        Value::Object(envelope)
    }
}

fn invalid(column: &str, reason: &str) -> FilterError {
    FilterError::InvalidPredicate { column: column.to_string(), reason: reason.to_string() }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn values_equal(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::String(_), Value::String(_)) => actual == expected,
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        // Numbers and booleans arrive as strings from some callers.
        _ => display_value(actual) == display_value(expected),
    }
}

fn contains_ignore_case(actual: &Value, needle: &Value) -> bool {
    let Some(needle) = needle.as_str() else {
        return false;
    };
    display_value(actual).to_lowercase().contains(&needle.to_lowercase())
}
