//! Store trait for resource tables
//!
//! Handlers talk to storage only through `ResourceStore`, so tests and
//! alternative backends can stand in for SQLite.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::data::error::DataError;
use crate::data::filters::SqlQueryBuilder;

/// A row as an ordered JSON object (column name to value)
pub type Record = Map<String, Value>;

/// Table a resource is backed by
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub name: String,
    pub primary_key: String,
}

impl TableRef {
    pub fn new(name: impl Into<String>, primary_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: primary_key.into(),
        }
    }
}

/// 1-based page of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u64,
    pub per_page: u64,
}

impl Page {
    pub fn offset(&self) -> u64 {
        self.number.saturating_sub(1).saturating_mul(self.per_page)
    }
}

/// CRUD operations over one table at a time
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// List one page of filtered rows together with the total match count
    async fn list(
        &self,
        table: &TableRef,
        filter: &SqlQueryBuilder,
        page: Page,
    ) -> Result<(Vec<Record>, u64), DataError>;

    /// Get a single row by primary key
    async fn find(&self, table: &TableRef, key: &str) -> Result<Option<Record>, DataError>;

    /// Insert a row and return it as stored
    async fn insert(&self, table: &TableRef, record: &Record) -> Result<Record, DataError>;

    /// Update a row; `None` when no row has the key
    async fn update(
        &self,
        table: &TableRef,
        key: &str,
        record: &Record,
    ) -> Result<Option<Record>, DataError>;

    /// Delete a row; `false` when no row has the key
    async fn delete(&self, table: &TableRef, key: &str) -> Result<bool, DataError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_offset() {
        assert_eq!(Page { number: 1, per_page: 15 }.offset(), 0);
        assert_eq!(Page { number: 3, per_page: 10 }.offset(), 20);
        assert_eq!(Page { number: 0, per_page: 10 }.offset(), 0);
    }
}
