//! Request metrics
//!
//! Prometheus collectors owned by [`AppState`] and the middleware that feeds
//! them. Request count and latency are labelled by the matched route
//! template, so `/items/7` and `/items/8` share one series and paths that
//! match no route all land in `unmatched`.
//!
//! Author: hephaex@gmail.com

use crate::state::AppState;
use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::Instant;

/// Endpoint label for requests that matched no route
pub const UNMATCHED_ENDPOINT: &str = "unmatched";

/// Latency buckets in seconds
const LATENCY_BUCKETS: &[f64] = &[0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 2.5];

/// Collectors registered on a private registry
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    http_requests: IntCounterVec,
    http_latency: HistogramVec,
    auth_outcomes: IntCounterVec,
    uptime: IntGauge,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests = IntCounterVec::new(
            Opts::new("catalog_http_requests_total", "HTTP requests by endpoint and status"),
            &["method", "endpoint", "status"],
        )?;
        let http_latency = HistogramVec::new(
            HistogramOpts::new("catalog_http_request_duration_seconds", "HTTP request latency")
                .buckets(LATENCY_BUCKETS.to_vec()),
            &["method", "endpoint"],
        )?;
        let auth_outcomes = IntCounterVec::new(
            Opts::new("catalog_auth_outcomes_total", "Signup, signin and session guard outcomes"),
            &["flow", "outcome"],
        )?;
        let uptime = IntGauge::new("catalog_uptime_seconds", "Time since server start")?;

        registry.register(Box::new(http_requests.clone()))?;
        registry.register(Box::new(http_latency.clone()))?;
        registry.register(Box::new(auth_outcomes.clone()))?;
        registry.register(Box::new(uptime.clone()))?;

        Ok(Self {
            registry,
            http_requests,
            http_latency,
            auth_outcomes,
            uptime,
        })
    }

    /// Count one finished request
    pub fn record_request(&self, method: &str, endpoint: &str, status: u16, elapsed_secs: f64) {
        let status = status.to_string();
        self.http_requests
            .with_label_values(&[method, endpoint, status.as_str()])
            .inc();
        self.http_latency
            .with_label_values(&[method, endpoint])
            .observe(elapsed_secs);
    }

    /// Count an authentication outcome, e.g. `("signin", "denied")`
    pub fn record_auth(&self, flow: &str, outcome: &str) {
        self.auth_outcomes.with_label_values(&[flow, outcome]).inc();
    }

    /// Current value of an auth outcome counter
    pub fn auth_count(&self, flow: &str, outcome: &str) -> u64 {
        self.auth_outcomes.with_label_values(&[flow, outcome]).get()
    }

    /// Render every collector in the Prometheus text format
    pub fn render(&self, uptime_secs: u64) -> Result<String, prometheus::Error> {
        self.uptime.set(uptime_secs as i64);

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Metrics tracking middleware
///
/// Records request count per endpoint and status, and the latency
/// distribution per endpoint.
pub async fn metrics_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let endpoint = endpoint_label(&request);

    let response = next.run(request).await;

    state.metrics.record_request(
        &method,
        &endpoint,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}

/// Route template the request matched, e.g. `/items/:id`
pub fn endpoint_label(request: &Request) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ENDPOINT.to_string())
}
