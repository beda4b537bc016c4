pub mod auth;
pub mod compute;
pub mod jobs;
pub mod logs;

use axum::Json;
use serde_json::Value;

/// Success envelope shared by every JSON-producing route.
pub(crate) fn ok(data: Value) -> Json<Value> {
    Json(serde_json::json!({ "code": 200, "data": data }))
}
