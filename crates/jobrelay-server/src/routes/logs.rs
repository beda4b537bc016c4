use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub last_id: Option<String>,
    pub limit: Option<u32>,
}

/// Raw JSON passthrough from whichever log host answered.
fn passthrough(body: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

/// GET /api/v1/logs/:job_id?last_id=&limit= — page of log entries.
pub async fn get_logs(
    State(app): State<AppState>,
    Path(job_id): Path<String>,
    Query(query): Query<LogsQuery>,
) -> Result<Response, AppError> {
    let logs = app.logs.clone();
    let body = tokio::task::spawn_blocking(move || {
        logs.get_logs(&job_id, query.last_id.as_deref(), query.limit.unwrap_or(0))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(passthrough(body))
}

/// GET /api/v1/logs/:job_id/:id — single log entry.
pub async fn get_log(
    State(app): State<AppState>,
    Path((job_id, id)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let logs = app.logs.clone();
    let body = tokio::task::spawn_blocking(move || logs.get_log(&job_id, &id))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(passthrough(body))
}
