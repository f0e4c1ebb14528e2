//! Prometheus metrics for the console.
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `app_requests_total` | Counter | `method`, `endpoint` |
//! | `request_latency_seconds` | Histogram | |
//! | `login_attempts_total` | Counter | `status`, `role` |

use prometheus::{CounterVec, Encoder, Histogram, HistogramOpts, Opts, Registry, TextEncoder};
use rag_types::Role;
use thiserror::Error;

/// Longest label value kept; longer paths are cut.
pub const MAX_LABEL_VALUE_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("failed to register metric: {0}")]
    Registration(#[from] prometheus::Error),
    #[error("failed to encode metrics: {0}")]
    Encoding(String),
}

#[derive(Clone)]
pub struct ConsoleMetrics {
    registry: Registry,
    requests_total: CounterVec,
    request_latency: Histogram,
    login_attempts_total: CounterVec,
}

impl ConsoleMetrics {
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let requests_total = CounterVec::new(
            Opts::new("app_requests_total", "Total HTTP Requests"),
            &["method", "endpoint"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let request_latency = Histogram::with_opts(HistogramOpts::new(
            "request_latency_seconds",
            "Request Latency",
        ))?;
        registry.register(Box::new(request_latency.clone()))?;

        let login_attempts_total = CounterVec::new(
            Opts::new("login_attempts_total", "Total login attempts"),
            &["status", "role"],
        )?;
        registry.register(Box::new(login_attempts_total.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            request_latency,
            login_attempts_total,
        })
    }

    pub fn request_completed(&self, method: &str, endpoint: &str, latencySecs: f64) {
        self.requests_total
            .with_label_values(&[truncate_label(method), truncate_label(endpoint)])
            .inc();
        self.request_latency.observe(latencySecs);
    }

    /// `role` is `None` for failed attempts, reported as `unknown`.
    pub fn login_attempt(&self, succeeded: bool, role: Option<Role>) {
        let status = if succeeded { "success" } else { "failed" };
        let role = role.map(Role::as_str).unwrap_or("unknown");
        self.login_attempts_total
            .with_label_values(&[status, role])
            .inc();
    }

    pub fn login_attempts(&self, succeeded: bool, role: Option<Role>) -> f64 {
        let status = if succeeded { "success" } else { "failed" };
        let role = role.map(Role::as_str).unwrap_or("unknown");
        self.login_attempts_total
            .with_label_values(&[status, role])
            .get()
    }

    pub fn requests(&self, method: &str, endpoint: &str) -> f64 {
        self.requests_total
            .with_label_values(&[truncate_label(method), truncate_label(endpoint)])
            .get()
    }

    /// Text exposition format for `GET /metrics`.
    pub fn encode_text(&self) -> Result<String, MetricsError> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| MetricsError::Encoding(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| MetricsError::Encoding(e.to_string()))
    }
}

fn truncate_label(value: &str) -> &str {
    if value.len() <= MAX_LABEL_VALUE_LEN {
        return value;
    }
    let mut end = MAX_LABEL_VALUE_LEN;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}
