use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use super::build;
use crate::config::{Config, DEFAULT_ALLOW};
use crate::state::AppState;

const TOKEN: &str = "s3cret";

fn app_with(allow: &str, timeout: Duration) -> Router {
    let config = Config::from_vars(|key| match key {
        "CMD_PROXY_TOKEN" => Some(TOKEN.to_owned()),
        "CMD_PROXY_ALLOW" => Some(allow.to_owned()),
        _ => None,
    })
    .unwrap();
    let config = Config { timeout, ..config };
    build(Arc::new(AppState::new(config)))
}

fn app() -> Router {
    app_with(DEFAULT_ALLOW, Duration::from_secs(15))
}

fn cmd(body: &str, token: Option<&str>) -> Request<Body> {
    let mut req = Request::builder()
        .method("POST")
        .uri("/cmd")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(t) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    req.body(Body::from(body.to_owned())).unwrap()
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[cfg(unix)]
#[tokio::test]
async fn whitelisted_command_with_token_runs() {
    let (status, body) = send(app(), cmd(r#"{"cmd":"echo hello proxy"}"#, Some(TOKEN))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["stdout"], "hello proxy\n");
    assert_eq!(body["stderr"], "");
}

#[tokio::test]
async fn wrong_or_missing_token_is_unauthorized() {
    for token in [Some("wrong"), None] {
        let (status, body) = send(app(), cmd(r#"{"cmd":"echo hi"}"#, token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{token:?}");
        assert_eq!(body["ok"], false);
    }
}

#[tokio::test]
async fn non_whitelisted_is_forbidden_regardless_of_token() {
    for token in [Some(TOKEN), Some("wrong"), None] {
        let (status, body) = send(app(), cmd(r#"{"cmd":"rm -rf /tmp/x"}"#, token)).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{token:?}");
        assert_eq!(body["error"], "command not allowed: rm");
    }
}

#[tokio::test]
async fn chained_command_is_forbidden() {
    let (status, _) = send(app(), cmd(r#"{"cmd":"echo hi; cat /etc/shadow"}"#, Some(TOKEN))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn empty_command_is_bad_request() {
    for body in [r#"{}"#, r#"{"cmd":"   "}"#, "not json"] {
        let (status, json) = send(app(), cmd(body, Some(TOKEN))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(json["error"], "cmd is required");
    }
}

#[cfg(unix)]
#[tokio::test]
async fn failing_command_reports_stderr() {
    let (status, body) = send(
        app(),
        cmd(r#"{"cmd":"ls /songdl/definitely/missing"}"#, Some(TOKEN)),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["ok"], false);
    assert!(body["error"].as_str().unwrap().starts_with("process exited with"));
    assert!(!body["stderr"].as_str().unwrap().is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn slow_command_times_out() {
    let app = app_with("sleep", Duration::from_millis(200));
    let (status, body) = send(app, cmd(r#"{"cmd":"sleep 5"}"#, Some(TOKEN))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("timed out"));
}

#[tokio::test]
async fn health_is_open() {
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(app(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "songdl-cmd-proxy");
}
