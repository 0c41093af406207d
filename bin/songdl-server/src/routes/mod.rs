//! Axum router construction.
//!
//! [`build`] assembles the complete application router, including:
//! - Middleware layers (CORS, per-request trace-ID injection, hardening)
//! - Optional Swagger UI / OpenAPI spec endpoint (disable with `SONGDL_ENABLE_SWAGGER=false`)
//! - `/api/health`, `/api/download` and `/downloads/{filename}`
//! - The static frontend, with a JSON 404 for anything else

pub mod doc;
mod download;
mod files;
mod health;

use axum::handler::HandlerWithoutStateExt;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{middleware, Json, Router};
use serde_json::json;
use std::sync::Arc;
use tower_http::services::ServeDir;
use utoipa_swagger_ui::SwaggerUi;

use crate::middleware::{cors, security, trace};
use crate::state::AppState;

// ── Router builder ────────────────────────────────────────────────────────────

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .merge(health::router())
        .merge(download::router())
        .merge(files::router());

    // ── Swagger UI ────────────────────────────────────────────────────────────
    if state.config.enable_swagger {
        app = app.merge(
            SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", doc::get_docs()),
        );
    }

    // Static frontend (`/` → index.html); misses and non-GET requests fall
    // through to the JSON 404.
    let static_files = ServeDir::new(&state.config.public_dir)
        .call_fallback_on_method_not_allowed(true)
        .fallback(not_found.into_service());

    let app = app
        .fallback_service(static_files)
        // Outermost layers execute first on the way in.
        .layer(cors::cors_layer(state.clone()))
        .layer(middleware::from_fn(trace::trace_middleware))
        .with_state(state);

    security::harden(app)
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "endpoint not found" })),
    )
}
