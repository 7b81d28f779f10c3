//! cmsgate - a password gate and GitHub bridge for a git-backed CMS
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Access Middleware                          │
//! │  - Session cookie check on protected prefixes               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      HTTP Layer (Axum)                       │
//! │  - Login / logout                                           │
//! │  - /api/keystatic/* GitHub proxy                            │
//! │  - CSV import                                               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     GitHub Client                            │
//! │  - Static token, Accept and User-Agent injection            │
//! │  - Contents API reads and writes                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: proxy, import and metrics handlers
//! - `auth`: credentials, session tokens, cookies, login, access middleware
//! - `github`: REST client shared by proxy and importer
//! - `import`: CSV parsing, slugs and collection templates
//! - `config`: Configuration management
//! - `error`: Error types

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod github;
pub mod import;
pub mod metrics;

use std::sync::Arc;

/// Largest request body accepted (CSV uploads, proxied commits)
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Application state shared across all handlers
///
/// Cloned for each request; everything inside is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// GitHub client, built once per process
    pub github: Arc<github::GitHubClient>,
}

impl AppState {
    /// Initialize application state
    ///
    /// Secrets are not required here; handlers report missing ones.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be constructed
    pub fn from_config(config: config::AppConfig) -> Result<Self, error::AppError> {
        let github = github::GitHubClient::new(config.github.clone())?;

        Ok(Self {
            config: Arc::new(config),
            github: Arc::new(github),
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::{Router, extract::DefaultBodyLimit, middleware};
    use tower_http::{compression::CompressionLayer, trace::TraceLayer};

    let mut router = Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(auth::auth_router())
        .merge(api::proxy_router())
        .merge(api::import_router())
        .merge(api::metrics_router());

    if let Some(dir) = &state.config.cms.admin_dir {
        router = mount_admin_ui(router, &state.config.auth.admin_path, dir);
    }

    router
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_session,
        ))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the built admin UI under the admin path
///
/// Unknown paths fall back to `index.html` so client-side routes load.
fn mount_admin_ui(
    router: axum::Router<AppState>,
    admin_path: &str,
    dir: &std::path::Path,
) -> axum::Router<AppState> {
    use tower_http::services::{ServeDir, ServeFile};

    tracing::info!(dir = %dir.display(), %admin_path, "Serving admin UI");
    let service = ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html")));

    match admin_path.trim_end_matches('/') {
        "" => router.fallback_service(service),
        path => router.nest_service(path, service),
    }
}

async fn health_check() -> &'static str {
    "OK"
}
