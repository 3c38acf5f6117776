use std::time::Instant;

use axum::{body::Body, extract::Request, middleware::Next, response::Response};

/// Logs every request on the way in and its status and latency on the way
/// out. Server errors are logged at `error`, so they also land in `error.log`.
pub async fn log_requests(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    tracing::info!("Incoming request: {} {}", method, uri);

    let started = Instant::now();
    let resp = next.run(req).await;
    let latency_ms = started.elapsed().as_millis() as u64;
    let status = resp.status();

    if status.is_server_error() {
        tracing::error!(%method, %uri, status = status.as_u16(), latency_ms, "request failed");
    } else {
        tracing::info!(%method, %uri, status = status.as_u16(), latency_ms, "request completed");
    }
    resp
}

#[cfg(feature = "cors")]
pub fn cors() -> tower_http::cors::CorsLayer {
    tower_http::cors::CorsLayer::permissive()
}
