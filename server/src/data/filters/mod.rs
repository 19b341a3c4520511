//! Query parameter filter translation
//!
//! Translates the query string of a listing request into whitelisted filter
//! clauses and renders them for SQLite.
//!
//! Parameter grammar: `[or_]<field>[_<operator>]=<value>` plus the reserved
//! `sort=<field>[,asc|desc]` and `limit=<n>`. Operators are `not`, `in`,
//! `not_in`, `lt`, `lte`, `gt`, `gte`, `contains`, `not_contains`,
//! `starts_with`, `not_starts_with`, `ends_with` and `not_ends_with`.
//!
//! ## Usage
//!
//! ```
//! use querygate_server::data::filters::{
//!     FilterConfig, QueryParameters, SqlQueryBuilder, translate,
//! };
//!
//! let config = FilterConfig::new(["name", "age"], Vec::<String>::new());
//! let params = QueryParameters::from_pairs([("name_contains", "jo"), ("or_age_gte", "30")]);
//! let translation = translate(&params, &config).unwrap();
//! let builder = SqlQueryBuilder::from_translation(&translation);
//! assert_eq!(builder.where_clause(), " WHERE \"name\" LIKE ? OR \"age\" >= ?");
//! ```

mod builder;
mod date;
mod operators;
mod params;
mod parser;
mod types;

pub use builder::{QueryBuilder, SqlParams, SqlQueryBuilder, SqlValue};
pub use date::{ChronoDateParser, DateParser};
pub use operators::Operator;
pub use params::{ParamValue, QueryParameters};
pub use parser::{LIMIT_PARAM, SORT_PARAM, translate, translate_with};
pub use types::{
    ClauseValue, ComparisonOp, Conjunction, DATE_TEXT_FORMAT, FilterConfig, FilterError,
    ListValue, ParsedClause, Predicate, SortDirection, SortSpec, Translation,
};
