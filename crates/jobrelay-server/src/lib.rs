pub mod error;
pub mod routes;
pub mod state;

use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};

use crate::state::AppState;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Jobs (saga)
        .route("/api/v1/job", post(routes::jobs::create_job))
        .route("/api/v1/job/{job_id}", delete(routes::jobs::delete_job))
        // Logs
        .route("/api/v1/logs/{job_id}", get(routes::logs::get_logs))
        .route("/api/v1/logs/{job_id}/{id}", get(routes::logs::get_log))
        // Schedules and next-run info
        .route(
            "/api/v1/pre-next/schedule/{name}",
            post(routes::compute::pre_next_schedule),
        )
        .route(
            "/api/v1/next/schedule/{job_id}",
            post(routes::compute::next_schedule),
        )
        .route(
            "/api/v1/pre-next/info/{name}",
            post(routes::compute::pre_next_info),
        )
        .route(
            "/api/v1/next/info/{job_id}",
            post(routes::compute::next_info),
        )
        // Progress
        .route(
            "/api/v1/progress/{job_id}",
            post(routes::compute::progress_once),
        )
        // Auth
        .route("/auth/providers", get(routes::auth::list_providers))
        .route("/auth/{name}/login", get(routes::auth::login))
        .fallback(not_found)
        .layer(cors)
        .with_state(app_state)
}

/// Envelope-shaped 404 for unknown routes.
async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "code": 404, "message": "no such page" })),
    )
}

/// Start the gateway on `port`.
pub async fn serve(app_state: AppState, port: u16) -> anyhow::Result<()> {
    let app = build_router(app_state);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("jobrelay gateway listening on http://localhost:{port}");

    axum::serve(listener, app).await?;
    Ok(())
}
