//! Query builder collaborator
//!
//! `QueryBuilder` is the receiving side of a `Translation`. `SqlQueryBuilder`
//! renders the calls into a parameterized SQLite `WHERE` / `ORDER BY` with
//! every value bound as a `?` placeholder.

use serde_json::Value;

use super::types::{
    ClauseValue, ComparisonOp, Conjunction, ListValue, ParsedClause, Predicate, SortDirection,
    Translation,
};
use crate::utils::sql::{placeholders, quote_identifier};

/// Receives translated clauses in order
pub trait QueryBuilder {
    fn add_and_where(&mut self, field: &str, op: ComparisonOp, value: &ClauseValue);
    fn add_or_where(&mut self, field: &str, op: ComparisonOp, value: &ClauseValue);
    fn add_where_null(&mut self, field: &str);
    fn add_or_where_null(&mut self, field: &str);
    fn add_where_in(&mut self, field: &str, values: &ListValue);
    fn add_where_not_in(&mut self, field: &str, values: &ListValue);
    fn set_order_by(&mut self, field: &str, direction: SortDirection);
    fn set_limit(&mut self, limit: u64);
}

impl ParsedClause {
    /// Forward this clause to a builder.
    ///
    /// Membership clauses always use the AND form; the builder has no OR
    /// variant for them.
    pub fn apply<B: QueryBuilder + ?Sized>(&self, builder: &mut B) {
        let field = self.field.as_str();
        match (&self.predicate, self.conjunction) {
            (Predicate::Compare { operator, value }, Conjunction::And) => {
                builder.add_and_where(field, *operator, value)
            }
            (Predicate::Compare { operator, value }, Conjunction::Or) => {
                builder.add_or_where(field, *operator, value)
            }
            (Predicate::IsNull, Conjunction::And) => builder.add_where_null(field),
            (Predicate::IsNull, Conjunction::Or) => builder.add_or_where_null(field),
            (Predicate::In { values }, _) => builder.add_where_in(field, values),
            (Predicate::NotIn { values }, _) => builder.add_where_not_in(field, values),
        }
    }
}

impl Translation {
    /// Replay clauses in order, then sort and limit
    pub fn apply<B: QueryBuilder + ?Sized>(&self, builder: &mut B) {
        for clause in &self.clauses {
            clause.apply(builder);
        }
        if let Some(sort) = &self.sort {
            builder.set_order_by(&sort.field, sort.direction);
        }
        if let Some(limit) = self.limit {
            builder.set_limit(limit);
        }
    }
}

/// A value bound to a `?` placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SqlValue {
    /// Map a JSON request value onto a SQLite storage class.
    /// Booleans become 0/1; arrays and objects are stored as JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Integer(i64::from(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => n.as_f64().map(Self::Real).unwrap_or(Self::Null),
            },
            Value::String(s) => Self::Text(s.clone()),
            Value::Array(_) | Value::Object(_) => Self::Text(value.to_string()),
        }
    }
}

impl From<&ClauseValue> for SqlValue {
    fn from(value: &ClauseValue) -> Self {
        match value {
            ClauseValue::Text(text) => Self::Text(text.clone()),
            date @ ClauseValue::Date(_) => Self::Text(date.to_string()),
        }
    }
}

/// Bind values in placeholder order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlParams {
    pub values: Vec<SqlValue>,
}

impl SqlParams {
    pub fn push(&mut self, value: SqlValue) {
        self.values.push(value);
    }

    pub fn extend(&mut self, other: SqlParams) {
        self.values.extend(other.values);
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Condition {
    conjunction: Conjunction,
    sql: String,
}

/// Renders builder calls as parameterized SQLite fragments
#[derive(Debug, Clone, Default)]
pub struct SqlQueryBuilder {
    conditions: Vec<Condition>,
    params: SqlParams,
    order_by: Option<(String, SortDirection)>,
    limit: Option<u64>,
}

impl SqlQueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder preloaded with a translation
    pub fn from_translation(translation: &Translation) -> Self {
        let mut builder = Self::new();
        translation.apply(&mut builder);
        builder
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    fn push(&mut self, conjunction: Conjunction, sql: String) {
        self.conditions.push(Condition { conjunction, sql });
    }

    fn compare(
        &mut self,
        conjunction: Conjunction,
        field: &str,
        op: ComparisonOp,
        value: &ClauseValue,
    ) {
        self.params.push(SqlValue::from(value));
        self.push(
            conjunction,
            format!("{} {} ?", quote_identifier(field), op.as_sql()),
        );
    }

    fn membership(&mut self, field: &str, values: &ListValue, negated: bool) {
        let sql = if values.is_empty() {
            // IN () is a syntax error in SQLite
            let sql = if negated { "1 = 1" } else { "1 = 0" };
            sql.to_string()
        } else {
            let keyword = if negated { "NOT IN" } else { "IN" };
            format!(
                "{} {} ({})",
                quote_identifier(field),
                keyword,
                placeholders(values.len())
            )
        };
        for value in values.to_strings() {
            self.params.push(SqlValue::Text(value));
        }
        self.push(Conjunction::And, sql);
    }

    /// AND another builder's conditions in as one parenthesized group.
    ///
    /// The group's OR clauses stay inside the parentheses. Its sort and limit
    /// replace this builder's when set.
    pub fn and_group(&mut self, group: SqlQueryBuilder) {
        if let Some(sql) = group.where_sql() {
            self.push(Conjunction::And, format!("({})", sql));
            self.params.extend(group.params);
        }
        if group.order_by.is_some() {
            self.order_by = group.order_by;
        }
        if group.limit.is_some() {
            self.limit = group.limit;
        }
    }

    /// Condition expression without the `WHERE` keyword.
    /// The first condition's conjunction is ignored.
    pub fn where_sql(&self) -> Option<String> {
        let mut conditions = self.conditions.iter();
        let first = conditions.next()?;
        let mut sql = first.sql.clone();
        for condition in conditions {
            sql.push(' ');
            sql.push_str(condition.conjunction.as_sql());
            sql.push(' ');
            sql.push_str(&condition.sql);
        }
        Some(sql)
    }

    /// ` WHERE ...` clause, or empty
    pub fn where_clause(&self) -> String {
        self.where_sql()
            .map(|sql| format!(" WHERE {}", sql))
            .unwrap_or_default()
    }

    /// ` ORDER BY ...` clause, or empty
    pub fn order_by_clause(&self) -> String {
        self.order_by
            .as_ref()
            .map(|(field, direction)| {
                format!(" ORDER BY {} {}", quote_identifier(field), direction.as_sql())
            })
            .unwrap_or_default()
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn params(&self) -> &SqlParams {
        &self.params
    }
}

impl QueryBuilder for SqlQueryBuilder {
    fn add_and_where(&mut self, field: &str, op: ComparisonOp, value: &ClauseValue) {
        self.compare(Conjunction::And, field, op, value);
    }

    fn add_or_where(&mut self, field: &str, op: ComparisonOp, value: &ClauseValue) {
        self.compare(Conjunction::Or, field, op, value);
    }

    fn add_where_null(&mut self, field: &str) {
        self.push(Conjunction::And, format!("{} IS NULL", quote_identifier(field)));
    }

    fn add_or_where_null(&mut self, field: &str) {
        self.push(Conjunction::Or, format!("{} IS NULL", quote_identifier(field)));
    }

    fn add_where_in(&mut self, field: &str, values: &ListValue) {
        self.membership(field, values, false);
    }

    fn add_where_not_in(&mut self, field: &str, values: &ListValue) {
        self.membership(field, values, true);
    }

    fn set_order_by(&mut self, field: &str, direction: SortDirection) {
        self.order_by = Some((field.to_string(), direction));
    }

    fn set_limit(&mut self, limit: u64) {
        self.limit = Some(limit);
    }
}
