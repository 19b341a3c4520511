//! Insertion-ordered query parameter mapping
//!
//! Decoding rules for raw `key=value` pairs:
//! - `key[]=v` appends `v` to an array value
//! - a repeated key turns its value into an array
//! - a comma-separated value for a key ending in `_in` is split into an array

use axum::extract::Query;
use axum::extract::rejection::QueryRejection;
use axum::http::Uri;
use serde::Serialize;

const ARRAY_SUFFIX: &str = "[]";
const MEMBERSHIP_SUFFIX: &str = "_in";

/// A single decoded parameter value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Single(String),
    Many(Vec<String>),
}

impl ParamValue {
    pub fn as_single(&self) -> Option<&str> {
        match self {
            Self::Single(value) => Some(value),
            Self::Many(_) => None,
        }
    }

    /// The value that wins when a key is repeated
    pub fn last(&self) -> Option<&str> {
        match self {
            Self::Single(value) => Some(value),
            Self::Many(values) => values.last().map(String::as_str),
        }
    }

    fn append(&mut self, values: Vec<String>) {
        match self {
            Self::Single(current) => {
                let mut merged = vec![std::mem::take(current)];
                merged.extend(values);
                *self = Self::Many(merged);
            }
            Self::Many(current) => current.extend(values),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParameters {
    entries: Vec<(String, ParamValue)>,
}

impl QueryParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the query string of a request URI
    pub fn from_uri(uri: &Uri) -> Result<Self, QueryRejection> {
        let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(uri)?;
        Ok(Self::from_pairs(pairs))
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::new();
        for (key, value) in pairs {
            params.push(key.as_ref(), value.into());
        }
        params
    }

    /// Add one raw `key=value` pair, applying the array decoding rules
    pub fn push(&mut self, key: &str, value: String) {
        let (name, forced_array) = match key.strip_suffix(ARRAY_SUFFIX) {
            Some(name) => (name, true),
            None => (key, false),
        };

        let split = name.ends_with(MEMBERSHIP_SUFFIX) && value.contains(',');
        let values: Vec<String> = if split {
            value.split(',').map(|v| v.trim().to_string()).collect()
        } else {
            vec![value]
        };

        match self.entries.iter_mut().find(|(k, _)| k == name) {
            Some((_, existing)) => existing.append(values),
            None => {
                let value = if forced_array || split {
                    ParamValue::Many(values)
                } else {
                    ParamValue::Single(values.into_iter().next().unwrap_or_default())
                };
                self.entries.push((name.to_string(), value));
            }
        }
    }

    /// Set a value, replacing any existing value in place
    pub fn insert(&mut self, name: impl Into<String>, value: ParamValue) {
        let name = name.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Copy of the mapping without the given keys
    pub fn without(&self, names: &[&str]) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|(k, _)| !names.contains(&k.as_str()))
                .cloned()
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
