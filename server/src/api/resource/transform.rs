//! Record to response transformation

use std::collections::HashSet;

use serde_json::Value;

use crate::data::Record;

/// Shapes a stored record into its API representation.
///
/// Records are flat rows of one table, so relation includes are not
/// supported: the `include` query parameter is accepted and ignored.
pub trait Transformer: Send + Sync {
    fn transform(&self, record: Record) -> Value;
}

/// Removes hidden columns and passes everything else through
#[derive(Debug, Clone, Default)]
pub struct RecordTransformer {
    hidden: HashSet<String>,
}

impl RecordTransformer {
    pub fn new<I, S>(hidden: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hidden: hidden.into_iter().map(Into::into).collect(),
        }
    }
}

impl Transformer for RecordTransformer {
    fn transform(&self, mut record: Record) -> Value {
        if !self.hidden.is_empty() {
            record.retain(|key, _| !self.hidden.contains(key));
        }
        Value::Object(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hidden_fields_removed() {
        let transformer = RecordTransformer::new(["password"]);
        let record = json!({"id": 1, "name": "Ada", "password": "x"})
            .as_object()
            .unwrap()
            .clone();
        assert_eq!(
            transformer.transform(record),
            json!({"id": 1, "name": "Ada"})
        );
    }

    #[test]
    fn test_default_passes_through() {
        let record = json!({"id": 1}).as_object().unwrap().clone();
        assert_eq!(RecordTransformer::default().transform(record), json!({"id": 1}));
    }
}
