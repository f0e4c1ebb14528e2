use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use rag_client::ConsoleMetrics;
use tracing::debug;

/// Counts every request by method and path and records its latency.
pub async fn track_requests(
    State(metrics): State<ConsoleMetrics>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    let latency = started.elapsed().as_secs_f64();
    metrics.request_completed(&method, &path, latency);
    debug!(
        "{method} {path} - Status: {} - Latency: {latency:.3}s",
        response.status()
    );
    response
}

/// `GET /metrics` in the Prometheus text format.
pub async fn handle_metrics(State(metrics): State<ConsoleMetrics>) -> Response {
    match metrics.encode_text() {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("{e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
