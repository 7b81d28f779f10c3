//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)
//!
//! Secrets and repository coordinates are not checked at startup. Their
//! accessors return `AppError::Config` when empty, so a missing value turns
//! into a 500 at the handler that needs it.

use serde::Deserialize;
use std::path::PathBuf;

use crate::error::AppError;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub github: GitHubConfig,
    #[serde(default)]
    pub cms: CmsConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
    /// Protocol ("http" or "https")
    pub protocol: String,
}

impl ServerConfig {
    /// Cookies carry the `Secure` attribute only when served over TLS.
    pub fn secure_cookies(&self) -> bool {
        self.protocol.eq_ignore_ascii_case("https")
    }
}

/// Operator login and session cookie settings
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Operator email
    #[serde(default)]
    pub email: String,
    /// Operator password
    #[serde(default)]
    pub password: String,
    /// HMAC-SHA256 key for session tokens
    #[serde(default)]
    pub cookie_secret: String,
    /// Session cookie name (default: "session")
    pub session_cookie: String,
    /// Token and cookie lifetime in seconds (default: 86400 = 24h)
    pub session_ttl_seconds: i64,
    /// Path prefixes that require a valid session
    pub protected_prefixes: Vec<String>,
    /// Login page
    pub login_path: String,
    /// Where a successful login lands when no `next` is given
    pub admin_path: String,
}

impl AuthConfig {
    /// Signing secret, or a configuration error when unset
    pub fn secret(&self) -> Result<&str, AppError> {
        non_empty(&self.cookie_secret, "auth.cookie_secret")
    }

    /// Configured (email, password) pair
    pub fn credentials(&self) -> Result<(&str, &str), AppError> {
        Ok((
            non_empty(&self.email, "auth.email")?,
            non_empty(&self.password, "auth.password")?,
        ))
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.session_ttl_seconds)
    }

    /// Whether `path` falls under one of the protected prefixes
    pub fn is_protected(&self, path: &str) -> bool {
        self.protected_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }
}

/// Upstream content store (GitHub) settings
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubConfig {
    /// Static access token injected into every upstream call
    #[serde(default)]
    pub token: String,
    /// Repository owner
    #[serde(default)]
    pub owner: String,
    /// Repository name
    #[serde(default)]
    pub repo: String,
    /// Optional branch for importer commits (repository default when unset)
    pub branch: Option<String>,
    /// API origin, e.g. "https://api.github.com/"
    pub api_base: url::Url,
    /// User-Agent sent upstream
    pub user_agent: String,
    /// Name of the browser-readable token mirror cookie
    pub token_cookie: String,
}

impl GitHubConfig {
    /// Static token, or a configuration error when unset
    pub fn token(&self) -> Result<&str, AppError> {
        non_empty(&self.token, "github.token")
    }

    /// Repository coordinates as (owner, repo)
    pub fn repository(&self) -> Result<(&str, &str), AppError> {
        Ok((
            non_empty(&self.owner, "github.owner")?,
            non_empty(&self.repo, "github.repo")?,
        ))
    }
}

/// Admin UI hosting
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CmsConfig {
    /// Directory with the built admin UI, served under the admin path
    pub admin_dir: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

fn non_empty<'a>(value: &'a str, key: &str) -> Result<&'a str, AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Config(format!("{key} is not set")));
    }
    Ok(value)
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (CMSGATE__*)
    ///
    /// # Errors
    /// Returns error if configuration is structurally invalid
    pub fn load() -> Result<Self, AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.protocol", "http")?
            .set_default("auth.session_cookie", "session")?
            .set_default("auth.session_ttl_seconds", 86400)?
            .set_default(
                "auth.protected_prefixes",
                vec!["/keystatic", "/api/keystatic", "/import", "/api/import", "/metrics"],
            )?
            .set_default("auth.login_path", "/login")?
            .set_default("auth.admin_path", "/keystatic")?
            .set_default("github.api_base", "https://api.github.com/")?
            .set_default("github.user_agent", "cmsgate-proxy/1.0")?
            .set_default("github.token_cookie", "keystatic-gh-access-token")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (CMSGATE__*)
            .add_source(
                Environment::with_prefix("CMSGATE")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("auth.protected_prefixes")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.auth.session_ttl_seconds <= 0 {
            return Err(AppError::Config(
                "auth.session_ttl_seconds must be greater than 0".to_string(),
            ));
        }

        if !matches!(self.github.api_base.scheme(), "http" | "https") {
            return Err(AppError::Config(
                "github.api_base must be an http(s) URL".to_string(),
            ));
        }

        if self.auth.cookie_secret.is_empty() {
            tracing::warn!("auth.cookie_secret is not set; logins will fail until it is");
        }

        if !self.server.secure_cookies() {
            tracing::warn!(
                protocol = %self.server.protocol,
                "Using insecure session cookies"
            );
        }

        Ok(())
    }
}
