//! REST adapter for the ad hoc query gateway.

use axum::extract::Extension;
use axum::Json;
use serde::Deserialize;

use crate::common::AppError;
use crate::domains::audits::query::{run_query, QueryOutput};
use crate::server::app::AppState;

#[derive(Deserialize)]
pub struct QueryBody {
    pub sql: Option<String>,
}

/// POST /api/query
pub async fn query_handler(
    Extension(state): Extension<AppState>,
    Json(body): Json<QueryBody>,
) -> Result<Json<QueryOutput>, AppError> {
    let sql = body
        .sql
        .ok_or_else(|| AppError::InvalidInput("sql is required".to_string()))?;

    let output = run_query(&state.db_pool, &sql).await?;
    Ok(Json(output))
}
