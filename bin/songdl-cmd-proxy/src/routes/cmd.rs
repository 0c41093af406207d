//! `POST /cmd`: run one whitelisted command line.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use songdl_core::process;
use tracing::info;

use crate::auth::require_bearer;
use crate::error::ProxyError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CmdBody {
    pub cmd: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CmdOutput {
    pub ok: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Order matters: an empty body is a 400 and a non-whitelisted command a 403
/// before the token is looked at.
pub async fn run_command(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<CmdBody>, JsonRejection>,
) -> Result<Json<CmdOutput>, ProxyError> {
    let line = body
        .ok()
        .and_then(|Json(b)| b.cmd)
        .map(|c| c.trim().to_owned())
        .filter(|c| !c.is_empty())
        .ok_or(ProxyError::EmptyCommand)?;

    state.policy.check(&line)?;
    require_bearer(&headers, &state.config.token)?;

    info!(cmd = %line, "running command");
    let output = process::run(process::shell(&line), state.config.timeout).await?;

    Ok(Json(CmdOutput {
        ok: true,
        stdout: output.stdout,
        stderr: output.stderr,
    }))
}
