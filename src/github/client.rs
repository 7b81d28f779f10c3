//! GitHub REST client
//!
//! Built once per process and shared through `AppState`. Every request it
//! sends carries the static token, the GitHub v3 `Accept` header and the
//! configured `User-Agent`, whatever the caller passed in.

use axum::body::Bytes;
use http::{HeaderMap, HeaderValue, Method, header};
use url::Url;

use crate::config::GitHubConfig;
use crate::error::AppError;

/// Media type GitHub expects for the v3 REST API
pub const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

/// Request headers never copied from the browser to GitHub
const SKIPPED_REQUEST_HEADERS: [&str; 5] = [
    "host",
    "cookie",
    "connection",
    "content-length",
    "transfer-encoding",
];

/// A browser request to replay against the GitHub API
#[derive(Debug)]
pub struct ForwardRequest<'a> {
    pub method: Method,
    /// API path relative to the API origin, e.g. `repos/acme/site/git/trees/main`
    pub path: &'a str,
    /// Raw query string without the leading `?`
    pub query: Option<&'a str>,
    pub headers: &'a HeaderMap,
    pub body: Option<Bytes>,
}

/// Shared client for the content repository's API
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    config: GitHubConfig,
    api_base: Url,
}

impl GitHubClient {
    /// Build the client with its own connection pool
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be constructed
    pub fn new(config: GitHubConfig) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Internal(e.into()))?;
        Ok(Self::with_http(http, config))
    }

    /// Wrap an existing `reqwest::Client`
    pub fn with_http(http: reqwest::Client, config: GitHubConfig) -> Self {
        let mut api_base = config.api_base.clone();
        if !api_base.path().ends_with('/') {
            let path = format!("{}/", api_base.path());
            api_base.set_path(&path);
        }

        Self {
            http,
            config,
            api_base,
        }
    }

    pub fn config(&self) -> &GitHubConfig {
        &self.config
    }

    /// Resolve an API path against the API origin
    ///
    /// Rejects paths that would escape the configured origin (absolute
    /// URLs, scheme-relative `//host` paths, `..` above the base path), so
    /// the static token is only ever sent to GitHub.
    pub fn resolve(&self, path: &str, query: Option<&str>) -> Result<Url, AppError> {
        let mut url = self
            .api_base
            .join(path)
            .map_err(|_| AppError::Validation(format!("Invalid API path: {path}")))?;

        if url.origin() != self.api_base.origin() || !url.path().starts_with(self.api_base.path()) {
            return Err(AppError::Validation(format!(
                "API path leaves the upstream origin: {path}"
            )));
        }

        url.set_query(query.filter(|q| !q.is_empty()));
        Ok(url)
    }

    /// Start a request with the injected credentials
    pub(crate) fn request(&self, method: Method, url: Url) -> Result<reqwest::RequestBuilder, AppError> {
        let mut headers = HeaderMap::new();
        self.inject_headers(&mut headers)?;
        Ok(self.http.request(method, url).headers(headers))
    }

    fn inject_headers(&self, headers: &mut HeaderMap) -> Result<(), AppError> {
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.config.token()?))
            .map_err(|_| AppError::Config("github.token is not a valid header value".to_string()))?;
        let user_agent = HeaderValue::from_str(&self.config.user_agent).map_err(|_| {
            AppError::Config("github.user_agent is not a valid header value".to_string())
        })?;

        headers.insert(header::AUTHORIZATION, bearer);
        headers.insert(header::ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
        headers.insert(header::USER_AGENT, user_agent);
        Ok(())
    }

    /// Build the upstream request for a proxied browser call
    ///
    /// Inbound headers are copied except the hop-by-hop and cookie set;
    /// `Authorization`, `Accept` and `User-Agent` are always overwritten.
    pub fn build_forward(&self, forward: ForwardRequest<'_>) -> Result<reqwest::Request, AppError> {
        let url = self.resolve(forward.path, forward.query)?;

        let mut headers = filter_request_headers(forward.headers);
        self.inject_headers(&mut headers)?;

        let mut builder = self.http.request(forward.method, url).headers(headers);
        if let Some(body) = forward.body {
            builder = builder.body(body);
        }

        builder.build().map_err(AppError::HttpClient)
    }

    /// Send a prepared request; no retries
    pub async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response, reqwest::Error> {
        self.http.execute(request).await
    }
}

/// Copy headers except the ones that must not reach GitHub
pub fn filter_request_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(inbound.len());
    for (name, value) in inbound {
        if SKIPPED_REQUEST_HEADERS.contains(&name.as_str()) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}
