//! Common test utilities for E2E tests
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use cmsgate::{AppState, config};
use serde_json::json;
use tokio::net::TcpListener;

pub const EMAIL: &str = "editor@example.com";
pub const PASSWORD: &str = "correct horse battery";
pub const GITHUB_TOKEN: &str = "ghp_test_static_token";

/// A request as seen by the mock GitHub API
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("request body is JSON")
    }
}

#[derive(Default)]
struct MockState {
    requests: Mutex<Vec<RecordedRequest>>,
    existing_files: Mutex<HashSet<String>>,
}

/// Stand-in for api.github.com
///
/// - `GET repos/*/contents/<path>`: 200 with a SHA for files added via
///   `add_existing_file`, 404 otherwise
/// - `PUT repos/*/contents/<path>`: 201, or 422 when the path contains
///   "rejected"
/// - `*/missing`: 404 with a GitHub-style message
/// - anything else: 200 echoing method, path and query
#[derive(Clone)]
pub struct MockGitHub {
    pub base_url: String,
    state: Arc<MockState>,
}

pub const EXISTING_SHA: &str = "3b18e512dba79e4c8300dd08aeb37f8e728b8dad";

impl MockGitHub {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let app = axum::Router::new()
            .fallback(mock_handler)
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}/", addr),
            state,
        }
    }

    /// Make `GET .../contents/<path>` report an existing blob
    pub fn add_existing_file(&self, path: &str) {
        self.state
            .existing_files
            .lock()
            .unwrap()
            .insert(path.to_string());
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> RecordedRequest {
        self.requests().pop().expect("mock GitHub saw a request")
    }
}

async fn mock_handler(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    state.requests.lock().unwrap().push(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        query: uri.query().map(str::to_string),
        headers,
        body,
    });

    if let Some((_, file)) = path.split_once("/contents/") {
        let file = urlencoding::decode(file).unwrap().into_owned();
        return match method {
            Method::GET if state.existing_files.lock().unwrap().contains(&file) => {
                Json(json!({ "path": file, "sha": EXISTING_SHA })).into_response()
            }
            Method::GET => (StatusCode::NOT_FOUND, Json(json!({ "message": "Not Found" })))
                .into_response(),
            Method::PUT if file.contains("rejected") => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "message": "Invalid request" })),
            )
                .into_response(),
            Method::PUT => (StatusCode::CREATED, Json(json!({ "content": { "path": file } })))
                .into_response(),
            _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
        };
    }

    if path.ends_with("/missing") {
        return (StatusCode::NOT_FOUND, Json(json!({ "message": "Not Found" }))).into_response();
    }

    (
        [("x-github-request-id", "MOCK:1")],
        Json(json!({
            "method": method.as_str(),
            "path": path,
            "query": uri.query(),
        })),
    )
        .into_response()
}

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub github: MockGitHub,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance backed by a mock GitHub API
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server, adjusting the configuration first
    pub async fn with_config(adjust: impl FnOnce(&mut config::AppConfig)) -> Self {
        let github = MockGitHub::start().await;
        let mut config = test_config(&github.base_url);
        adjust(&mut config);

        let state = AppState::from_config(config).unwrap();

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = cmsgate::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            github,
            client,
        }
    }

    /// Get base URL for requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// A valid `Cookie` header value for the operator session
    pub fn session_cookie(&self) -> String {
        let token = cmsgate::auth::issue(EMAIL, self.state.config.auth.secret().unwrap())
            .expect("Failed to create test token");
        format!("{}={}", self.state.config.auth.session_cookie, token)
    }
}

/// Client that reports redirects instead of following them
pub fn no_redirect_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .expect("failed to build no-redirect client")
}

/// Address nothing listens on
pub async fn unreachable_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/", addr)
}

pub fn test_config(api_base: &str) -> config::AppConfig {
    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Let OS assign port
            protocol: "http".to_string(),
        },
        auth: config::AuthConfig {
            email: EMAIL.to_string(),
            password: PASSWORD.to_string(),
            cookie_secret: "test-secret-key-32-bytes-long!!".to_string(),
            session_cookie: "session".to_string(),
            session_ttl_seconds: 86_400,
            protected_prefixes: ["/keystatic", "/api/keystatic", "/import", "/api/import", "/metrics"]
                .into_iter()
                .map(String::from)
                .collect(),
            login_path: "/login".to_string(),
            admin_path: "/keystatic".to_string(),
        },
        github: config::GitHubConfig {
            token: GITHUB_TOKEN.to_string(),
            owner: "acme".to_string(),
            repo: "site".to_string(),
            branch: None,
            api_base: api_base.parse().unwrap(),
            user_agent: "cmsgate-proxy/1.0".to_string(),
            token_cookie: "keystatic-gh-access-token".to_string(),
        },
        cms: config::CmsConfig::default(),
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}

/// All `Set-Cookie` header values of a response
pub fn set_cookies(response: &reqwest::Response) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

pub fn location(response: &reqwest::Response) -> &str {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}
