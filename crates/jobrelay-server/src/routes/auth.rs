use axum::extract::{Path, State};
use axum::response::Redirect;
use axum::Json;
use serde_json::Value;

use crate::error::AppError;
use crate::routes::ok;
use crate::state::AppState;

/// GET /auth/providers — configured identity providers and login URLs.
pub async fn list_providers(State(app): State<AppState>) -> Json<Value> {
    ok(serde_json::json!(app.registry.providers()))
}

/// GET /auth/:name/login — redirect the browser to the provider's login
/// page. Unknown providers produce a 404 envelope.
pub async fn login(
    State(app): State<AppState>,
    Path(name): Path<String>,
) -> Result<Redirect, AppError> {
    let url = app.registry.login_url(&name)?;
    Ok(Redirect::temporary(&url))
}
