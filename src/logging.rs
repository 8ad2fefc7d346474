//! Middleware for logging requests and responses.

use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::Error;

/// The number of characters of a body that are logged at the `info` level.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// If a body is longer than [LOG_BODY_LENGTH_LIMIT] characters, it is
/// truncated and the full body is logged at the `debug` level. CSV bodies
/// are only logged by size.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let body_bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::warn!("Could not read request body: {error}");
            return Error::InvalidRequest(error.to_string()).into_response();
        }
    };

    tracing::info!(
        "Received request: {} {}\nbody: {}",
        parts.method,
        parts.uri,
        loggable_body(&parts.headers, &body_bytes, "request")
    );

    let request = Request::from_parts(parts, Body::from(body_bytes));
    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    let body_bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::error!("Could not read response body: {error}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    tracing::info!(
        "Sending response: {}\nbody: {}",
        parts.status,
        loggable_body(&parts.headers, &body_bytes, "response")
    );

    Response::from_parts(parts, Body::from(body_bytes))
}

fn loggable_body(headers: &HeaderMap, body: &Bytes, label: &str) -> String {
    let is_csv = headers
        .get(CONTENT_TYPE)
        .and_then(|content_type| content_type.to_str().ok())
        .is_some_and(|content_type| content_type.starts_with("text/csv"));

    if is_csv {
        return format!("<{} bytes of CSV>", body.len());
    }

    let text = String::from_utf8_lossy(body);

    match text.char_indices().nth(LOG_BODY_LENGTH_LIMIT) {
        Some((cut, _)) => {
            tracing::debug!("Full {label} body: {text:?}");
            format!("{:?}...", &text[..cut])
        }
        None => format!("{text:?}"),
    }
}
