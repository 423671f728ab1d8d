//! HTTP metrics and the Prometheus endpoint.
//!
//! Every request is counted by catalog resource and outcome. The catalog's
//! own mutation and tree-size metrics are registered alongside.

use std::sync::OnceLock;
use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Requests handled, labelled by `resource`, `route`, `method` and `outcome`.
pub const HTTP_REQUESTS: &str = "satcat_http_requests_total";

/// Request latency in seconds, labelled by `resource` and `method`.
pub const HTTP_LATENCY: &str = "satcat_http_request_seconds";

/// Requests currently being served.
pub const HTTP_IN_FLIGHT: &str = "satcat_http_in_flight";

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Catalog area a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resource {
    Components,
    Subsystems,
    Ops,
    Unmatched,
}

impl Resource {
    fn from_route(route: Option<&str>) -> Self {
        match route {
            None => Self::Unmatched,
            Some(r) if r.starts_with("/components") => Self::Components,
            Some(r) if r.starts_with("/subsystems") => Self::Subsystems,
            Some(_) => Self::Ops,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Components => "components",
            Self::Subsystems => "subsystems",
            Self::Ops => "ops",
            Self::Unmatched => "unmatched",
        }
    }
}

/// Collapses a status code into the outcome label.
///
/// 404 and 409 are the catalog's expected refusals and get their own
/// outcomes apart from other 4xx.
fn outcome(status: StatusCode) -> &'static str {
    match status {
        StatusCode::NOT_FOUND => "not_found",
        StatusCode::CONFLICT => "conflict",
        StatusCode::REQUEST_TIMEOUT | StatusCode::SERVICE_UNAVAILABLE => "shed",
        s if s.is_success() || s.is_redirection() => "ok",
        s if s.is_client_error() => "rejected",
        _ => "error",
    }
}

/// Holds one unit of the in-flight gauge until dropped.
struct InFlight;

impl InFlight {
    fn enter() -> Self {
        gauge!(HTTP_IN_FLIGHT).increment(1.0);
        Self
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        gauge!(HTTP_IN_FLIGHT).decrement(1.0);
    }
}

/// Initializes the global metrics recorder with Prometheus exporter.
///
/// Safe to call multiple times; subsequent calls are no-ops.
///
/// # Panics
///
/// Panics if the Prometheus recorder cannot be installed; the server should
/// not start without metrics.
#[allow(clippy::panic)]
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .unwrap_or_else(|e| panic!("failed to install prometheus recorder: {e}"));

            describe_counter!(HTTP_REQUESTS, "HTTP requests handled by the catalog API");
            describe_histogram!(HTTP_LATENCY, "HTTP request latency in seconds");
            describe_gauge!(HTTP_IN_FLIGHT, "HTTP requests currently in flight");
            satcat_catalog::metrics::register_metrics();

            tracing::info!("Prometheus metrics recorder initialized");
            handle
        })
        .clone()
}

/// Returns the global Prometheus handle, if initialized.
#[must_use]
pub fn prometheus_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

/// Middleware that records request metrics.
///
/// The `route` label is the matched template (`/components/:id`), never the
/// raw path, so ids do not multiply series.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned());
    let resource = Resource::from_route(route.as_deref()).as_str();
    let method = request.method().as_str().to_owned();

    let in_flight = InFlight::enter();
    let start = Instant::now();
    let response = next.run(request).await;
    let elapsed = start.elapsed().as_secs_f64();
    drop(in_flight);

    histogram!(HTTP_LATENCY, "resource" => resource, "method" => method.clone()).record(elapsed);
    counter!(
        HTTP_REQUESTS,
        "resource" => resource,
        "route" => route.unwrap_or_else(|| resource.to_owned()),
        "method" => method,
        "outcome" => outcome(response.status()),
    )
    .increment(1);

    response
}

/// Handler for the `/metrics` endpoint.
pub async fn serve_metrics() -> impl IntoResponse {
    let content_type = [("content-type", "text/plain; charset=utf-8")];
    match prometheus_handle() {
        Some(handle) => (StatusCode::OK, content_type, handle.render()),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            content_type,
            "Metrics not initialized".to_string(),
        ),
    }
}
