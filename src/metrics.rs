//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Auth Metrics
    pub static ref LOGINS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("cmsgate_logins_total", "Total number of login attempts"),
        &["outcome"]
    ).expect("metric can be created");
    pub static ref AUTH_FAILURES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("cmsgate_auth_failures_total", "Requests to protected paths rejected by the session gate"),
        &["reason"]
    ).expect("metric can be created");

    // Proxy Metrics
    pub static ref PROXY_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("cmsgate_proxy_requests_total", "Total number of CMS proxy requests"),
        &["route", "status"]
    ).expect("metric can be created");
    pub static ref PROXY_REQUEST_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "cmsgate_proxy_request_duration_seconds",
            "Upstream round-trip duration for forwarded requests"
        ).buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["method"]
    ).expect("metric can be created");

    // Import Metrics
    pub static ref IMPORT_ROWS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("cmsgate_import_rows_total", "Total number of imported CSV rows"),
        &["collection", "outcome"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("cmsgate_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
///
/// Safe to call more than once; later calls keep the existing registrations.
pub fn init_metrics() {
    let collectors: [Box<dyn prometheus::core::Collector>; 6] = [
        Box::new(LOGINS_TOTAL.clone()),
        Box::new(AUTH_FAILURES_TOTAL.clone()),
        Box::new(PROXY_REQUESTS_TOTAL.clone()),
        Box::new(PROXY_REQUEST_DURATION_SECONDS.clone()),
        Box::new(IMPORT_ROWS_TOTAL.clone()),
        Box::new(ERRORS_TOTAL.clone()),
    ];

    for collector in collectors {
        match REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(error) => tracing::error!(%error, "Failed to register metric"),
        }
    }

    tracing::info!("Metrics registry initialized");
}
