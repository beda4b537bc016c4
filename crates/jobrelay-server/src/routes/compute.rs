use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::error::AppError;
use crate::routes::ok;
use crate::state::AppState;

fn timestamp_value(ts: DateTime<Utc>) -> Value {
    Value::String(ts.to_rfc3339_opts(SecondsFormat::Secs, true))
}

fn payload_or_400(body: Result<Json<Value>, JsonRejection>) -> Result<Value, AppError> {
    let Json(payload) = body.map_err(|e| AppError::bad_request(e.body_text()))?;
    Ok(payload)
}

/// POST /api/v1/pre-next/schedule/:name — next run time for a trigger
/// definition that hasn't been stored yet.
pub async fn pre_next_schedule(
    State(app): State<AppState>,
    Path(name): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let payload = payload_or_400(body)?;
    let compute = app.compute.clone();
    let ts = tokio::task::spawn_blocking(move || compute.pre_next_schedule(&name, &payload))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(ok(timestamp_value(ts)))
}

/// POST /api/v1/next/schedule/:job_id — next run time for a stored job.
pub async fn next_schedule(
    State(app): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let compute = app.compute.clone();
    let ts = tokio::task::spawn_blocking(move || compute.next_schedule(&job_id))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(ok(timestamp_value(ts)))
}

/// POST /api/v1/pre-next/info/:name — next-run detail for an action
/// definition that hasn't been stored yet.
pub async fn pre_next_info(
    State(app): State<AppState>,
    Path(name): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let payload = payload_or_400(body)?;
    let compute = app.compute.clone();
    let info = tokio::task::spawn_blocking(move || compute.pre_next_info(&name, &payload))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(ok(info))
}

/// POST /api/v1/next/info/:job_id — next-run detail for a stored job.
pub async fn next_info(
    State(app): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let compute = app.compute.clone();
    let info = tokio::task::spawn_blocking(move || compute.next_info(&job_id))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(ok(info))
}

/// POST /api/v1/progress/:job_id — kick a progress pass for one job.
pub async fn progress_once(
    State(app): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let compute = app.compute.clone();
    tokio::task::spawn_blocking(move || compute.progress_once(&job_id))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(ok(Value::String("ok".into())))
}
