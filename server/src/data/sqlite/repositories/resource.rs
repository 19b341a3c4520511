//! Generic table repository
//!
//! Rows are read column by column into JSON objects so any configured table
//! can be served without a Rust model.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Number, Value};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Column, Row, Sqlite, SqlitePool, TypeInfo, ValueRef};

use crate::data::filters::{SqlQueryBuilder, SqlValue};
use crate::data::sqlite::SqliteError;
use crate::data::traits::{Page, Record, TableRef};
use crate::utils::sql::{placeholders, quote_identifier};

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

fn bind_value<'q>(query: SqliteQuery<'q>, value: &SqlValue) -> SqliteQuery<'q> {
    match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Integer(i) => query.bind(*i),
        SqlValue::Real(f) => query.bind(*f),
        SqlValue::Text(s) => query.bind(s.clone()),
    }
}

fn bind_all<'q>(query: SqliteQuery<'q>, values: &[SqlValue]) -> SqliteQuery<'q> {
    values.iter().fold(query, |query, value| bind_value(query, value))
}

fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Decode a row by the storage class of each value
pub fn row_to_record(row: &SqliteRow) -> Result<Record, SqliteError> {
    let mut record = Record::new();
    for (i, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(i)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            let type_name = raw.type_info().name().to_string();
            match type_name.as_str() {
                "INTEGER" | "BOOLEAN" => Value::from(row.try_get::<i64, _>(i)?),
                "REAL" | "NUMERIC" => Number::from_f64(row.try_get::<f64, _>(i)?)
                    .map(Value::Number)
                    .unwrap_or(Value::Null),
                "BLOB" => Value::String(BASE64.encode(row.try_get::<Vec<u8>, _>(i)?)),
                _ => Value::String(row.try_get::<String, _>(i)?),
            }
        };
        record.insert(column.name().to_string(), value);
    }
    Ok(record)
}

fn select_sql(table: &TableRef, filter: &SqlQueryBuilder) -> (String, Vec<SqlValue>) {
    let mut values = filter.params().values.clone();
    let base = format!(
        "SELECT * FROM {}{}{}",
        quote_identifier(&table.name),
        filter.where_clause(),
        filter.order_by_clause()
    );
    match filter.limit() {
        Some(limit) => {
            values.push(SqlValue::Integer(to_i64(limit)));
            (format!("SELECT * FROM ({} LIMIT ?)", base), values)
        }
        None => (base, values),
    }
}

/// List one page of rows matching the filter.
///
/// A filter limit caps the matching set before the page is cut, so `total`
/// never exceeds it.
pub async fn list(
    pool: &SqlitePool,
    table: &TableRef,
    filter: &SqlQueryBuilder,
    page: Page,
) -> Result<(Vec<Record>, u64), SqliteError> {
    let (select, values) = select_sql(table, filter);

    let count_sql = format!("SELECT COUNT(*) FROM ({})", select);
    let total: i64 = bind_all(sqlx::query(&count_sql), &values)
        .fetch_one(pool)
        .await?
        .try_get(0)?;

    // the subquery form needs the order repeated on the outer select
    let order = if filter.limit().is_some() {
        filter.order_by_clause()
    } else {
        String::new()
    };
    let page_sql = format!("{}{} LIMIT ? OFFSET ?", select, order);
    let rows = bind_all(sqlx::query(&page_sql), &values)
        .bind(to_i64(page.per_page))
        .bind(to_i64(page.offset()))
        .fetch_all(pool)
        .await?;

    let records = rows
        .iter()
        .map(row_to_record)
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(
        table = %table.name,
        total,
        returned = records.len(),
        "Listed rows"
    );
    Ok((records, u64::try_from(total).unwrap_or(0)))
}

pub async fn find(
    pool: &SqlitePool,
    table: &TableRef,
    key: &str,
) -> Result<Option<Record>, SqliteError> {
    let sql = format!(
        "SELECT * FROM {} WHERE {} = ?",
        quote_identifier(&table.name),
        quote_identifier(&table.primary_key)
    );
    let row = sqlx::query(&sql).bind(key).fetch_optional(pool).await?;
    row.as_ref().map(row_to_record).transpose()
}

pub async fn insert(
    pool: &SqlitePool,
    table: &TableRef,
    record: &Record,
) -> Result<Record, SqliteError> {
    let table_name = quote_identifier(&table.name);
    let sql = if record.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING *", table_name)
    } else {
        let columns: Vec<String> = record.keys().map(|k| quote_identifier(k)).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
            table_name,
            columns.join(", "),
            placeholders(record.len())
        )
    };

    let values: Vec<SqlValue> = record.values().map(SqlValue::from_json).collect();
    let row = bind_all(sqlx::query(&sql), &values)
        .fetch_one(pool)
        .await?;

    tracing::debug!(table = %table.name, "Inserted row");
    row_to_record(&row)
}

pub async fn update(
    pool: &SqlitePool,
    table: &TableRef,
    key: &str,
    record: &Record,
) -> Result<Option<Record>, SqliteError> {
    if record.is_empty() {
        return find(pool, table, key).await;
    }

    let assignments: Vec<String> = record
        .keys()
        .map(|k| format!("{} = ?", quote_identifier(k)))
        .collect();
    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ? RETURNING *",
        quote_identifier(&table.name),
        assignments.join(", "),
        quote_identifier(&table.primary_key)
    );

    let values: Vec<SqlValue> = record.values().map(SqlValue::from_json).collect();
    let row = bind_all(sqlx::query(&sql), &values)
        .bind(key)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(row_to_record).transpose()
}

pub async fn delete(pool: &SqlitePool, table: &TableRef, key: &str) -> Result<bool, SqliteError> {
    let sql = format!(
        "DELETE FROM {} WHERE {} = ?",
        quote_identifier(&table.name),
        quote_identifier(&table.primary_key)
    );
    let result = sqlx::query(&sql).bind(key).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}
