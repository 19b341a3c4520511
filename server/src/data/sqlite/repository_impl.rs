//! ResourceStore trait implementation for SQLite

use std::sync::Arc;

use async_trait::async_trait;

use crate::data::error::DataError;
use crate::data::filters::SqlQueryBuilder;
use crate::data::traits::{Page, Record, ResourceStore, TableRef};

use super::SqliteService;
use super::repositories::resource;

#[async_trait]
impl ResourceStore for Arc<SqliteService> {
    async fn list(
        &self,
        table: &TableRef,
        filter: &SqlQueryBuilder,
        page: Page,
    ) -> Result<(Vec<Record>, u64), DataError> {
        resource::list(self.pool(), table, filter, page)
            .await
            .map_err(Into::into)
    }

    async fn find(&self, table: &TableRef, key: &str) -> Result<Option<Record>, DataError> {
        resource::find(self.pool(), table, key)
            .await
            .map_err(Into::into)
    }

    async fn insert(&self, table: &TableRef, record: &Record) -> Result<Record, DataError> {
        resource::insert(self.pool(), table, record)
            .await
            .map_err(Into::into)
    }

    async fn update(
        &self,
        table: &TableRef,
        key: &str,
        record: &Record,
    ) -> Result<Option<Record>, DataError> {
        resource::update(self.pool(), table, key, record)
            .await
            .map_err(Into::into)
    }

    async fn delete(&self, table: &TableRef, key: &str) -> Result<bool, DataError> {
        resource::delete(self.pool(), table, key)
            .await
            .map_err(Into::into)
    }
}
