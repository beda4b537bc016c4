use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use jobrelay_core::saga::JobSpec;
use serde_json::Value;

use crate::error::AppError;
use crate::routes::ok;
use crate::state::AppState;

/// POST /api/v1/job — create a job with its action and trigger as one unit.
pub async fn create_job(
    State(app): State<AppState>,
    spec: Result<Json<JobSpec>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(spec) = spec.map_err(|e| AppError::bad_request(e.body_text()))?;

    let saga = app.saga.clone();
    let job_id = tokio::task::spawn_blocking(move || saga.create(&spec))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(ok(Value::String(job_id)))
}

/// DELETE /api/v1/job/:job_id — remove every row for the job. Unconditional
/// and idempotent: the response is `ok` whether or not anything existed.
pub async fn delete_job(
    State(app): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let saga = app.saga.clone();
    tokio::task::spawn_blocking(move || saga.delete(&job_id))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))?;

    Ok(ok(Value::String("ok".into())))
}
