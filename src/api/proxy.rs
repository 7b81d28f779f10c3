//! CMS API proxy
//!
//! The admin UI talks to GitHub through `/api/keystatic/*`. Calls are
//! replayed against the GitHub REST API with the server's static token,
//! except the UI's own OAuth handshake routes, which are answered here as
//! if OAuth had already succeeded.

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri, header},
    response::{Html, IntoResponse, Response},
    routing::any,
};
use axum_extra::extract::CookieJar;

use crate::AppState;
use crate::auth::{self, found};
use crate::error::AppError;
use crate::github::ForwardRequest;
use crate::metrics::{PROXY_REQUEST_DURATION_SECONDS, PROXY_REQUESTS_TOTAL};

/// Mount point of the proxy
pub const PROXY_PREFIX: &str = "/api/keystatic";

/// Upstream response headers not relayed to the browser
const SKIPPED_RESPONSE_HEADERS: [&str; 4] =
    ["connection", "keep-alive", "transfer-encoding", "content-length"];

const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, PATCH, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type, Authorization";

/// Create proxy router
///
/// Routes:
/// - ANY /api/keystatic/*params
pub fn proxy_router() -> Router<AppState> {
    Router::new().route(&format!("{PROXY_PREFIX}/*params"), any(proxy))
}

/// Where a proxied sub-path goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyRoute {
    /// `github/login`: the UI's "sign in with GitHub" button
    Login,
    /// `github/refresh-token`: the UI asking for a fresh token
    RefreshToken,
    /// `github/logout`
    Logout,
    /// `github/repo-not-found`: the UI could not open the repository
    RepoNotFound,
    /// Anything else, relayed to the GitHub API
    Forward(String),
}

impl ProxyRoute {
    pub fn from_path(params: &str) -> Self {
        match params.trim_matches('/') {
            "github/login" => ProxyRoute::Login,
            "github/refresh-token" => ProxyRoute::RefreshToken,
            "github/logout" => ProxyRoute::Logout,
            "github/repo-not-found" => ProxyRoute::RepoNotFound,
            path => ProxyRoute::Forward(path.to_string()),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ProxyRoute::Login => "login",
            ProxyRoute::RefreshToken => "refresh_token",
            ProxyRoute::Logout => "logout",
            ProxyRoute::RepoNotFound => "repo_not_found",
            ProxyRoute::Forward(_) => "forward",
        }
    }
}

/// ANY /api/keystatic/*params
async fn proxy(
    State(state): State<AppState>,
    jar: CookieJar,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if method == Method::OPTIONS {
        return preflight();
    }

    // Raw path, so percent-encoding reaches GitHub as the UI sent it
    let params = uri.path().strip_prefix(PROXY_PREFIX).unwrap_or_default();
    let route = ProxyRoute::from_path(params);

    // Second check behind the access middleware: a session cookie must at
    // least be present.
    let response = if jar.get(&state.config.auth.session_cookie).is_none() {
        AppError::Unauthorized.into_response()
    } else {
        dispatch(&state, jar, &route, method, &uri, &headers, body)
            .await
            .unwrap_or_else(|error| error.into_response())
    };

    PROXY_REQUESTS_TOTAL
        .with_label_values(&[route.label(), response.status().as_str()])
        .inc();
    response
}

async fn dispatch(
    state: &AppState,
    jar: CookieJar,
    route: &ProxyRoute,
    method: Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let config = &state.config;

    match route {
        ProxyRoute::Login => {
            let jar = jar.add(auth::token_mirror_cookie(config, config.github.token()?));
            Ok((jar, found(&config.auth.admin_path)).into_response())
        }
        // The static token never expires, so a refresh always succeeds.
        ProxyRoute::RefreshToken => {
            let jar = jar.add(auth::token_mirror_cookie(config, config.github.token()?));
            Ok((jar, Json(serde_json::json!({ "ok": true }))).into_response())
        }
        ProxyRoute::Logout => {
            let jar = jar.remove(auth::token_mirror_removal(config));
            Ok((jar, found(&config.auth.admin_path)).into_response())
        }
        ProxyRoute::RepoNotFound => Ok(repo_not_found_page(&config.auth.admin_path).into_response()),
        ProxyRoute::Forward(path) => forward(state, path, method, uri, headers, body).await,
    }
}

/// Relay a call to the GitHub API and mirror the answer
///
/// Upstream HTTP errors pass through untouched; only a failure to reach
/// GitHub at all becomes a 502.
async fn forward(
    state: &AppState,
    path: &str,
    method: Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let carries_body = match method {
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE => true,
        Method::GET => false,
        _ => return Err(AppError::MethodNotAllowed),
    };

    let request = state.github.build_forward(ForwardRequest {
        method: method.clone(),
        path,
        query: uri.query(),
        headers,
        body: carries_body.then_some(body),
    })?;

    let timer = PROXY_REQUEST_DURATION_SECONDS
        .with_label_values(&[method.as_str()])
        .start_timer();
    let upstream = state.github.execute(request).await;
    timer.observe_duration();

    let upstream = match upstream {
        Ok(upstream) => upstream,
        Err(error) => {
            tracing::error!(%error, %method, path, "GitHub API proxy request failed");
            return Ok(proxy_error());
        }
    };

    let status = upstream.status();
    tracing::debug!(%method, path, %status, "Proxied GitHub API request");

    let mut response_headers = HeaderMap::with_capacity(upstream.headers().len() + 3);
    for (name, value) in upstream.headers() {
        if SKIPPED_RESPONSE_HEADERS.contains(&name.as_str()) {
            continue;
        }
        response_headers.append(name.clone(), value.clone());
    }
    apply_cors(&mut response_headers);

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = response_headers;
    Ok(response)
}

/// Fixed answer when GitHub cannot be reached
fn proxy_error() -> Response {
    (
        StatusCode::BAD_GATEWAY,
        Json(serde_json::json!({
            "error": "Proxy error",
            "message": "GitHub API request failed",
        })),
    )
        .into_response()
}

fn preflight() -> Response {
    let mut headers = HeaderMap::new();
    apply_cors(&mut headers);
    headers.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static("86400"),
    );
    (StatusCode::NO_CONTENT, headers).into_response()
}

fn apply_cors(headers: &mut HeaderMap) {
    let pairs: [(HeaderName, &'static str); 3] = [
        (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        (header::ACCESS_CONTROL_ALLOW_METHODS, ALLOWED_METHODS),
        (header::ACCESS_CONTROL_ALLOW_HEADERS, ALLOWED_HEADERS),
    ];
    for (name, value) in pairs {
        headers.insert(name, HeaderValue::from_static(value));
    }
}

/// Help page for an unreachable repository
///
/// Answered with 200 and a link back, not a redirect: the UI would bounce
/// straight back here.
fn repo_not_found_page(admin_path: &str) -> Html<String> {
    let admin_path = html_escape::encode_double_quoted_attribute(admin_path);
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Repository not found</title></head>
<body style="font-family:sans-serif;max-width:500px;margin:4rem auto;">
    <h1>Repository not found</h1>
    <p>The CMS cannot reach its GitHub repository. Check that:</p>
    <ul>
        <li><code>github.owner</code> and <code>github.repo</code> are correct;</li>
        <li><code>github.token</code> can access this repository;</li>
        <li>for a private repository, the token has <code>contents: read &amp; write</code>.</li>
    </ul>
    <a href="{admin_path}">Try again</a>
</body>
</html>
"#
    ))
}
