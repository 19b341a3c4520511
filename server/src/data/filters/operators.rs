//! Operator suffix vocabulary
//!
//! A filter parameter encodes its comparison in a trailing `_<operator>`
//! token (`age_gte`, `name_not_starts_with`) and an optional leading `or_`.

use super::types::{ComparisonOp, Conjunction};

const OR_PREFIX: &str = "or_";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Not,
    In,
    NotIn,
    Lt,
    Lte,
    Gt,
    Gte,
    Contains,
    NotContains,
    StartsWith,
    NotStartsWith,
    EndsWith,
    NotEndsWith,
}

impl Operator {
    pub const ALL: [Operator; 13] = [
        Self::Not,
        Self::In,
        Self::NotIn,
        Self::Lt,
        Self::Lte,
        Self::Gt,
        Self::Gte,
        Self::Contains,
        Self::NotContains,
        Self::StartsWith,
        Self::NotStartsWith,
        Self::EndsWith,
        Self::NotEndsWith,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Not => "not",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Contains => "contains",
            Self::NotContains => "not_contains",
            Self::StartsWith => "starts_with",
            Self::NotStartsWith => "not_starts_with",
            Self::EndsWith => "ends_with",
            Self::NotEndsWith => "not_ends_with",
        }
    }

    pub fn is_text_match(self) -> bool {
        matches!(
            self,
            Self::Contains
                | Self::NotContains
                | Self::StartsWith
                | Self::NotStartsWith
                | Self::EndsWith
                | Self::NotEndsWith
        )
    }

    /// Wrap a value in `%` wildcards for text-match operators
    pub fn wrap_wildcards(self, value: &str) -> String {
        match self {
            Self::Contains | Self::NotContains => format!("%{}%", value),
            Self::StartsWith | Self::NotStartsWith => format!("{}%", value),
            Self::EndsWith | Self::NotEndsWith => format!("%{}", value),
            _ => value.to_string(),
        }
    }
}

/// Comparator for a (possibly absent) operator suffix.
/// Membership operators on a scalar value fall back to equality.
pub fn comparator(operator: Option<Operator>) -> ComparisonOp {
    match operator {
        Some(Operator::Not) => ComparisonOp::Ne,
        Some(Operator::Lt) => ComparisonOp::Lt,
        Some(Operator::Lte) => ComparisonOp::Lte,
        Some(Operator::Gt) => ComparisonOp::Gt,
        Some(Operator::Gte) => ComparisonOp::Gte,
        Some(Operator::Contains | Operator::StartsWith | Operator::EndsWith) => ComparisonOp::Like,
        Some(Operator::NotContains | Operator::NotStartsWith | Operator::NotEndsWith) => {
            ComparisonOp::NotLike
        }
        Some(Operator::In | Operator::NotIn) | None => ComparisonOp::Eq,
    }
}

/// Split the trailing operator keyword off a parameter name.
///
/// The longest matching keyword wins, so `status_not_in` resolves to
/// `(status, NotIn)` rather than `(status_not, In)`.
pub fn split_operator(name: &str) -> (&str, Option<Operator>) {
    Operator::ALL
        .iter()
        .filter_map(|op| {
            let base = name.strip_suffix(op.keyword())?.strip_suffix('_')?;
            Some((base, *op))
        })
        .max_by_key(|(_, op)| op.keyword().len())
        .map(|(base, op)| (base, Some(op)))
        .unwrap_or((name, None))
}

/// Strip a single leading `or_` from a field name
pub fn split_conjunction(name: &str) -> (&str, Conjunction) {
    match name.strip_prefix(OR_PREFIX) {
        Some(field) => (field, Conjunction::Or),
        None => (name, Conjunction::And),
    }
}
