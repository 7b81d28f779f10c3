//! API layer
//!
//! HTTP handlers for:
//! - the CMS GitHub proxy
//! - CSV import
//! - Metrics (Prometheus)

mod import;
pub mod metrics;
mod proxy;

pub use import::{ImportResponse, import_router};
pub use metrics::metrics_router;
pub use proxy::{PROXY_PREFIX, ProxyRoute, proxy_router};
