use axum::{
    BoxError, Json,
    body::{Body, HttpBody},
    extract::Request,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::{BodyExt, Limited};
use serde_json::json;
use std::time::Instant;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

pub static X_TRACE_ID: &str = "x-trace-id";

/// JSON bodies up to this size are logged verbatim.
const MAX_LOGGED_BODY: usize = 1024;

pub async fn trace_middleware(req: Request<Body>, next: Next) -> Response {
    let start_time = Instant::now();

    // Reuse the caller's trace id when it is a valid UUID.
    let trace_id = req
        .headers()
        .get(X_TRACE_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);
    let trace_header = HeaderValue::from_str(&trace_id.to_string()).ok();

    let span = info_span!(
        "http_request",
        trace_id = %trace_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    async move {
        info!("→ request started");
        let mut response = run_logged(req, next, trace_header.as_ref()).await;
        if let Some(value) = trace_header {
            response.headers_mut().insert(X_TRACE_ID, value);
        }

        info!(
            status = response.status().as_u16(),
            latency_ms = start_time.elapsed().as_millis(),
            "← response finished"
        );
        response
    }
    .instrument(span)
    .await
}

async fn run_logged(
    req: Request<Body>,
    next: Next,
    trace_header: Option<&HeaderValue>,
) -> Response {
    let (parts, body) = req.into_parts();
    let body = match log_json_body("request", &parts.headers, body).await {
        Ok(body) => body,
        Err(e) => {
            warn!(error = %e, "failed to read request body");
            return body_error(StatusCode::BAD_REQUEST, "failed to read request body");
        }
    };
    let mut req = Request::from_parts(parts, body);
    if let Some(value) = trace_header {
        req.headers_mut().insert(X_TRACE_ID, value.clone());
    }

    let response = next.run(req).await;

    let (parts, body) = response.into_parts();
    match log_json_body("response", &parts.headers, body).await {
        Ok(body) => Response::from_parts(parts, body),
        Err(e) => {
            warn!(error = %e, "failed to read response body");
            body_error(StatusCode::INTERNAL_SERVER_ERROR, "failed to read response body")
        }
    }
}

fn body_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "success": false, "error": message }))).into_response()
}

/// Buffer and log small JSON bodies. Bodies that are not JSON, or whose size
/// is unknown or above [`MAX_LOGGED_BODY`], pass through without being read.
async fn log_json_body(
    direction: &str,
    headers: &HeaderMap,
    body: Body,
) -> Result<Body, BoxError> {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"));
    if !is_json {
        return Ok(body);
    }

    match body.size_hint().upper() {
        Some(size) if size <= MAX_LOGGED_BODY as u64 => {}
        Some(size) => {
            info!("{} body: [skipped: size={}]", direction, size);
            return Ok(body);
        }
        None => {
            info!("{} body: [skipped: size unknown]", direction);
            return Ok(body);
        }
    }

    let bytes = Limited::new(body, MAX_LOGGED_BODY).collect().await?.to_bytes();
    if let Ok(text) = std::str::from_utf8(&bytes) {
        info!("{} body: {}", direction, text);
    }
    Ok(Body::from(bytes))
}

#[cfg(test)]
mod test {
    use super::*;
    use axum::{Router, body::Bytes, routing::post};
    use tower::ServiceExt;
    use tracing_test::traced_test;

    fn echo() -> Router {
        Router::new()
            .route(
                "/echo",
                post(|body: Bytes| async move {
                    ([(header::CONTENT_TYPE, "application/json")], body)
                }),
            )
            .layer(axum::middleware::from_fn(trace_middleware))
    }

    fn json_request(body: Body) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/echo")
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .unwrap()
    }

    async fn bytes(resp: Response) -> Bytes {
        resp.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    #[traced_test]
    async fn small_json_is_logged_and_preserved() {
        let resp = echo()
            .oneshot(json_request(Body::from(r#"{"url":"x"}"#)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(&bytes(resp).await[..], br#"{"url":"x"}"#);
        assert!(logs_contain(r#"request body: {"url":"x"}"#));
        assert!(logs_contain(r#"response body: {"url":"x"}"#));
    }

    #[tokio::test]
    #[traced_test]
    async fn large_json_passes_through_unlogged() {
        let payload = format!(r#"{{"pad":"{}"}}"#, "a".repeat(4096));
        let resp = echo()
            .oneshot(json_request(Body::from(payload.clone())))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(bytes(resp).await.len(), payload.len());
        let skipped = format!("request body: [skipped: size={}]", payload.len());
        assert!(logs_contain(&skipped));
        assert!(!logs_contain("aaaaaaaa"));
    }

    #[tokio::test]
    #[traced_test]
    async fn streamed_json_is_not_buffered() {
        let stream = tokio_util::io::ReaderStream::new(&br#"{"url":"streamed"}"#[..]);
        let resp = echo()
            .oneshot(json_request(Body::from_stream(stream)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(&bytes(resp).await[..], br#"{"url":"streamed"}"#);
        assert!(logs_contain("request body: [skipped: size unknown]"));
    }

    #[tokio::test]
    #[traced_test]
    async fn unreadable_request_body_is_a_client_error() {
        // Claims ten bytes, then yields far more than the limit allows.
        let lying = Body::new(Limited::new(Body::from(vec![b' '; 4096]), 10));
        let resp = echo().oneshot(json_request(lying)).await.unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(resp.headers().contains_key(X_TRACE_ID));
        let body: serde_json::Value = serde_json::from_slice(&bytes(resp).await).unwrap();
        assert_eq!(body["error"], "failed to read request body");
        assert!(logs_contain("failed to read request body"));
    }
}
