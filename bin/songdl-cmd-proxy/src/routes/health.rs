use axum::Json;
use serde_json::{json, Value};

pub const SERVICE_NAME: &str = "songdl-cmd-proxy";

/// `GET /health`
pub async fn get_health() -> Json<Value> {
    Json(json!({ "status": "ok", "service": SERVICE_NAME }))
}
