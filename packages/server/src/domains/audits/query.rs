//! Read-only ad hoc query gateway.
//!
//! The mutation guard is a normalized prefix check against a fixed
//! denylist. It is deliberately not a SQL parser: statements hiding
//! mutations behind comments, batches, or CTEs will pass it. This is an
//! accepted weak boundary for trusted analyst callers; exposing the
//! surface more widely requires a real parsing allow-list.

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{Column, PgPool, Row, TypeInfo, ValueRef};
use uuid::Uuid;

use crate::common::AppError;

const DENIED_PREFIXES: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "CREATE", "REPLACE",
];

#[derive(Debug, Serialize)]
pub struct QueryOutput {
    /// Inferred from the first row; an empty result set yields an empty
    /// column list (schema comes from data, not query metadata).
    pub columns: Vec<String>,
    pub rows: Vec<serde_json::Value>,
    pub count: usize,
}

/// Execute analyst-supplied SQL against the read path.
pub async fn run_query(pool: &PgPool, sql: &str) -> Result<QueryOutput, AppError> {
    if let Some(prefix) = denied_prefix(sql) {
        return Err(AppError::QueryRejected(format!(
            "{prefix} statements are not allowed"
        )));
    }

    let fetched = sqlx::query(sql)
        .fetch_all(pool)
        .await
        .context("Query execution failed")?;

    let columns = fetched
        .first()
        .map(|row| {
            row.columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect()
        })
        .unwrap_or_default();

    let rows: Vec<serde_json::Value> = fetched.iter().map(row_to_json).collect();
    let count = rows.len();

    Ok(QueryOutput {
        columns,
        rows,
        count,
    })
}

/// Returns the matched denylist keyword if the normalized statement starts
/// with one.
fn denied_prefix(sql: &str) -> Option<&'static str> {
    let normalized = sql.trim().to_uppercase();
    DENIED_PREFIXES
        .iter()
        .find(|prefix| normalized.starts_with(**prefix))
        .copied()
}

/// Project a row into a JSON object column-by-column.
///
/// Common scalar types are decoded natively; anything else falls back to
/// text, then null.
fn row_to_json(row: &PgRow) -> serde_json::Value {
    let mut object = serde_json::Map::new();

    for (i, column) in row.columns().iter().enumerate() {
        let value = match row.try_get_raw(i) {
            Ok(raw) if raw.is_null() => serde_json::Value::Null,
            Ok(raw) => {
                let type_name = raw.type_info().name().to_string();
                decode_column(row, i, &type_name)
            }
            Err(_) => serde_json::Value::Null,
        };
        object.insert(column.name().to_string(), value);
    }

    serde_json::Value::Object(object)
}

fn decode_column(row: &PgRow, i: usize, type_name: &str) -> serde_json::Value {
    match type_name {
        "INT2" => row
            .try_get::<i16, _>(i)
            .map(|v| serde_json::json!(v))
            .unwrap_or(serde_json::Value::Null),
        "INT4" => row
            .try_get::<i32, _>(i)
            .map(|v| serde_json::json!(v))
            .unwrap_or(serde_json::Value::Null),
        "INT8" => row
            .try_get::<i64, _>(i)
            .map(|v| serde_json::json!(v))
            .unwrap_or(serde_json::Value::Null),
        "FLOAT4" => row
            .try_get::<f32, _>(i)
            .map(|v| serde_json::json!(v))
            .unwrap_or(serde_json::Value::Null),
        "FLOAT8" => row
            .try_get::<f64, _>(i)
            .map(|v| serde_json::json!(v))
            .unwrap_or(serde_json::Value::Null),
        "BOOL" => row
            .try_get::<bool, _>(i)
            .map(|v| serde_json::json!(v))
            .unwrap_or(serde_json::Value::Null),
        "UUID" => row
            .try_get::<Uuid, _>(i)
            .map(|v| serde_json::json!(v))
            .unwrap_or(serde_json::Value::Null),
        "TIMESTAMPTZ" => row
            .try_get::<DateTime<Utc>, _>(i)
            .map(|v| serde_json::json!(v))
            .unwrap_or(serde_json::Value::Null),
        "JSON" | "JSONB" => row
            .try_get::<serde_json::Value, _>(i)
            .unwrap_or(serde_json::Value::Null),
        _ => row
            .try_get::<String, _>(i)
            .map(serde_json::Value::String)
            .unwrap_or(serde_json::Value::Null),
    }
}
