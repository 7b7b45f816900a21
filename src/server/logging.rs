use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};

const LOG_TARGET: &str = "server::http";

/// Logs each request and its outcome. The SSE stream only logs its opening.
pub async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();

    tracing::debug!(target = LOG_TARGET, %method, %path, "incoming request");

    let start = Instant::now();
    let response = next.run(request).await;
    let status = response.status();

    tracing::info!(
        target = LOG_TARGET,
        %method,
        %path,
        status = status.as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        "request completed"
    );

    response
}
