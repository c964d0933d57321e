//! Request ID middleware.
//!
//! Every request gets an `x-request-id` (incoming value preserved,
//! otherwise a fresh UUID v4), echoed back on the response so clients and
//! logs can be correlated.

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

/// Header the request ID travels in.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Attach a request ID to the request and propagate it to the response.
pub async fn propagate_request_id(mut request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    if let Ok(value) = HeaderValue::from_str(&id) {
        request.headers_mut().insert(X_REQUEST_ID, value.clone());
        let mut response = next.run(request).await;
        response.headers_mut().insert(X_REQUEST_ID, value);
        response
    } else {
        next.run(request).await
    }
}
