//! Request body validation rules
//!
//! Rules are written per field as pipe-separated strings
//! (`"required|string|max:255"`) or as arrays of rule strings.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};
use thiserror::Error;
use validator::{ValidateEmail, ValidateUrl};

use crate::api::types::FieldErrors;
use crate::data::Record;
use crate::data::filters::{ChronoDateParser, DateParser};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleParseError {
    #[error("Unknown validation rule '{0}'")]
    Unknown(String),

    #[error("Validation rule '{0}' requires an argument")]
    MissingArgument(String),

    #[error("Invalid argument '{arg}' for validation rule '{rule}'")]
    InvalidArgument { rule: String, arg: String },

    #[error("Rules for field '{0}' must be a string or an array of strings")]
    InvalidDefinition(String),
}

/// A single field rule
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    Required,
    /// Only validate the field when the key is present
    Sometimes,
    Nullable,
    String,
    Integer,
    Numeric,
    Boolean,
    Email,
    Url,
    Date,
    Min(f64),
    Max(f64),
    In(Vec<String>),
}

impl FromStr for Rule {
    type Err = RuleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (name, arg) = match s.split_once(':') {
            Some((name, arg)) => (name, Some(arg)),
            None => (s, None),
        };

        let number = |arg: Option<&str>| -> Result<f64, RuleParseError> {
            let arg = arg.ok_or_else(|| RuleParseError::MissingArgument(name.to_string()))?;
            arg.trim()
                .parse::<f64>()
                .map_err(|_| RuleParseError::InvalidArgument {
                    rule: name.to_string(),
                    arg: arg.to_string(),
                })
        };

        match name {
            "required" => Ok(Self::Required),
            "sometimes" => Ok(Self::Sometimes),
            "nullable" => Ok(Self::Nullable),
            "string" => Ok(Self::String),
            "integer" => Ok(Self::Integer),
            "numeric" => Ok(Self::Numeric),
            "boolean" => Ok(Self::Boolean),
            "email" => Ok(Self::Email),
            "url" => Ok(Self::Url),
            "date" => Ok(Self::Date),
            "min" => number(arg).map(Self::Min),
            "max" => number(arg).map(Self::Max),
            "in" => {
                let arg = arg.ok_or_else(|| RuleParseError::MissingArgument(name.to_string()))?;
                Ok(Self::In(
                    arg.split(',').map(|v| v.trim().to_string()).collect(),
                ))
            }
            other => Err(RuleParseError::Unknown(other.to_string())),
        }
    }
}

/// Ordered field rules for one action
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    fields: Vec<(String, Vec<Rule>)>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `{field: "rule|rule"}` or `{field: ["rule", ...]}` map
    pub fn from_config(map: &Map<String, Value>) -> Result<Self, RuleParseError> {
        let mut set = Self::new();
        for (field, definition) in map {
            let parts: Vec<&str> = match definition {
                Value::String(s) => s.split('|').filter(|p| !p.trim().is_empty()).collect(),
                Value::Array(items) => items
                    .iter()
                    .map(|item| {
                        item.as_str()
                            .ok_or_else(|| RuleParseError::InvalidDefinition(field.clone()))
                    })
                    .collect::<Result<_, _>>()?,
                _ => return Err(RuleParseError::InvalidDefinition(field.clone())),
            };
            let rules = parts
                .into_iter()
                .map(str::parse)
                .collect::<Result<Vec<Rule>, _>>()?;
            set.add(field.clone(), rules);
        }
        Ok(set)
    }

    pub fn add(&mut self, field: impl Into<String>, rules: Vec<Rule>) {
        self.fields.push((field.into(), rules));
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Check a request body, collecting every failed rule per field
    pub fn validate(&self, record: &Record) -> FieldErrors {
        let mut errors = FieldErrors::new();
        for (field, rules) in &self.fields {
            let value = record.get(field);
            if value.is_none() && rules.contains(&Rule::Sometimes) {
                continue;
            }

            let label = field.replace('_', " ");
            let Some(value) = value.filter(|v| is_filled(v)) else {
                if rules.contains(&Rule::Required) {
                    errors.add(field, format!("The {label} field is required."));
                }
                continue;
            };

            let numeric = rules
                .iter()
                .any(|r| matches!(r, Rule::Integer | Rule::Numeric));
            for rule in rules {
                if let Some(message) = check(rule, value, &label, numeric) {
                    errors.add(field, message);
                }
            }
        }
        errors
    }
}

/// Null, blank strings and empty arrays count as missing
fn is_filled(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn is_integer(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.is_i64() || n.is_u64(),
        Value::String(s) => s.trim().parse::<i64>().is_ok(),
        _ => false,
    }
}

fn is_boolean(value: &Value) -> bool {
    match value {
        Value::Bool(_) => true,
        Value::Number(n) => matches!(n.as_i64(), Some(0 | 1)),
        Value::String(s) => matches!(s.as_str(), "0" | "1" | "true" | "false"),
        _ => false,
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Measured size for min/max: numeric value, string length or item count
enum Size {
    Number(f64),
    Chars(usize),
    Items(usize),
}

impl Size {
    fn of(value: &Value, numeric: bool) -> Option<Self> {
        match value {
            Value::Array(items) => Some(Self::Items(items.len())),
            Value::String(s) if !numeric => Some(Self::Chars(s.chars().count())),
            other => as_number(other).map(Self::Number),
        }
    }

    fn amount(&self) -> f64 {
        match self {
            Self::Number(n) => *n,
            Self::Chars(n) | Self::Items(n) => *n as f64,
        }
    }

    fn unit(&self) -> &'static str {
        match self {
            Self::Number(_) => "",
            Self::Chars(_) => " characters",
            Self::Items(_) => " items",
        }
    }
}

struct Bound(f64);

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.fract() == 0.0 {
            write!(f, "{}", self.0 as i64)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

fn check(rule: &Rule, value: &Value, label: &str, numeric: bool) -> Option<String> {
    match rule {
        Rule::Required | Rule::Sometimes | Rule::Nullable => None,
        Rule::String => (!value.is_string()).then(|| format!("The {label} must be a string.")),
        Rule::Integer => (!is_integer(value)).then(|| format!("The {label} must be an integer.")),
        Rule::Numeric => {
            as_number(value)
                .is_none()
                .then(|| format!("The {label} must be a number."))
        }
        Rule::Boolean => {
            (!is_boolean(value)).then(|| format!("The {label} field must be true or false."))
        }
        Rule::Email => {
            let valid = value.as_str().is_some_and(|s| s.validate_email());
            (!valid).then(|| format!("The {label} must be a valid email address."))
        }
        Rule::Url => {
            let valid = value.as_str().is_some_and(|s| s.validate_url());
            (!valid).then(|| format!("The {label} format is invalid."))
        }
        Rule::Date => {
            let valid = value
                .as_str()
                .is_some_and(|s| ChronoDateParser.parse(label, s).is_ok());
            (!valid).then(|| format!("The {label} is not a valid date."))
        }
        Rule::Min(min) => {
            let size = Size::of(value, numeric)?;
            (size.amount() < *min).then(|| match size {
                Size::Items(_) => format!("The {label} must have at least {} items.", Bound(*min)),
                _ => format!("The {label} must be at least {}{}.", Bound(*min), size.unit()),
            })
        }
        Rule::Max(max) => {
            let size = Size::of(value, numeric)?;
            (size.amount() > *max).then(|| match size {
                Size::Items(_) => {
                    format!("The {label} may not have more than {} items.", Bound(*max))
                }
                _ => format!(
                    "The {label} may not be greater than {}{}.",
                    Bound(*max),
                    size.unit()
                ),
            })
        }
        Rule::In(options) => {
            let valid = as_text(value).is_some_and(|text| options.contains(&text));
            (!valid).then(|| format!("The selected {label} is invalid."))
        }
    }
}
