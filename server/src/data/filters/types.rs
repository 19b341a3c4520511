//! Filter type definitions
//!
//! Defines the clause, sort and translation types produced by the parameter
//! translator and consumed by query builders.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Format used when a date value is rendered as text (LIKE patterns, SQL binds)
pub const DATE_TEXT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Errors raised while translating query parameters
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("The {field} field is not a valid date: {value}")]
    InvalidDateFormat { field: String, value: String },
}

/// Comparator attached to a comparison clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ComparisonOp {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "LIKE")]
    Like,
    #[serde(rename = "NOT LIKE")]
    NotLike,
}

impl ComparisonOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
        }
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// How a clause combines with the clauses before it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Conjunction {
    #[default]
    And,
    Or,
}

impl Conjunction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Parse a direction keyword (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Scalar value of a comparison clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ClauseValue {
    Text(String),
    Date(DateTime<Utc>),
}

impl fmt::Display for ClauseValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Date(date) => write!(f, "{}", date.format(DATE_TEXT_FORMAT)),
        }
    }
}

/// Value list of a membership clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ListValue {
    Text(Vec<String>),
    Date(Vec<DateTime<Utc>>),
}

impl ListValue {
    pub fn len(&self) -> usize {
        match self {
            Self::Text(values) => values.len(),
            Self::Date(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render every element the way it is bound into SQL
    pub fn to_strings(&self) -> Vec<String> {
        match self {
            Self::Text(values) => values.clone(),
            Self::Date(values) => values
                .iter()
                .map(|d| d.format(DATE_TEXT_FORMAT).to_string())
                .collect(),
        }
    }
}

/// Condition carried by a clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    Compare {
        operator: ComparisonOp,
        value: ClauseValue,
    },
    IsNull,
    In {
        values: ListValue,
    },
    NotIn {
        values: ListValue,
    },
}

/// One filter condition translated from a query parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedClause {
    pub field: String,
    pub conjunction: Conjunction,
    #[serde(flatten)]
    pub predicate: Predicate,
}

impl ParsedClause {
    pub fn compare(
        field: impl Into<String>,
        operator: ComparisonOp,
        value: ClauseValue,
        conjunction: Conjunction,
    ) -> Self {
        Self {
            field: field.into(),
            conjunction,
            predicate: Predicate::Compare { operator, value },
        }
    }

    pub fn is_null(field: impl Into<String>, conjunction: Conjunction) -> Self {
        Self {
            field: field.into(),
            conjunction,
            predicate: Predicate::IsNull,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

/// Result of translating one request's parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Translation {
    pub clauses: Vec<ParsedClause>,
    pub sort: Option<SortSpec>,
    pub limit: Option<u64>,
}

/// Per-resource field configuration
///
/// `allowed_fields` is the only set of names that may be filtered or sorted
/// on. An empty set rejects every parameter.
#[derive(Debug, Clone, Default)]
pub struct FilterConfig {
    allowed_fields: HashSet<String>,
    date_fields: HashSet<String>,
}

impl FilterConfig {
    pub fn new<A, D, S, T>(allowed_fields: A, date_fields: D) -> Self
    where
        A: IntoIterator<Item = S>,
        D: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            allowed_fields: allowed_fields.into_iter().map(Into::into).collect(),
            date_fields: date_fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn allows(&self, field: &str) -> bool {
        self.allowed_fields.contains(field)
    }

    pub fn is_date(&self, field: &str) -> bool {
        self.date_fields.contains(field)
    }

    pub fn allowed_fields(&self) -> impl Iterator<Item = &str> {
        self.allowed_fields.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn comparison_op_sql() {
        assert_eq!(ComparisonOp::Ne.as_sql(), "!=");
        assert_eq!(ComparisonOp::NotLike.to_string(), "NOT LIKE");
    }

    #[test]
    fn sort_direction_parse() {
        assert_eq!(SortDirection::parse("DESC"), Some(SortDirection::Desc));
        assert_eq!(SortDirection::parse(" asc "), Some(SortDirection::Asc));
        assert_eq!(SortDirection::parse("sideways"), None);
    }

    #[test]
    fn date_value_renders_as_sql_text() {
        let date = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();
        assert_eq!(ClauseValue::Date(date).to_string(), "2024-03-09 14:05:00");
        assert_eq!(
            ListValue::Date(vec![date]).to_strings(),
            vec!["2024-03-09 14:05:00"]
        );
    }

    #[test]
    fn clause_serializes_flat() {
        let clause = ParsedClause::compare(
            "age",
            ComparisonOp::Gte,
            ClauseValue::Text("30".to_string()),
            Conjunction::Or,
        );
        let json = serde_json::to_value(&clause).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "field": "age",
                "conjunction": "OR",
                "kind": "compare",
                "operator": ">=",
                "value": "30"
            })
        );
    }

    #[test]
    fn empty_config_allows_nothing() {
        let config = FilterConfig::default();
        assert!(!config.allows("id"));
        assert!(!config.is_date("created_at"));
    }
}
