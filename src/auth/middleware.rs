//! Access middleware
//!
//! Gates the admin surface. Requests outside the protected prefixes pass
//! through untouched; inside them, a missing, invalid, or expired session
//! redirects to the login page.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{Method, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;

use super::{cookies, found};
use super::session::{SessionClaims, Verification, verify};
use crate::AppState;
use crate::error::AppError;
use crate::metrics::AUTH_FAILURES_TOTAL;

/// Middleware enforcing a valid session on protected paths
///
/// Adds `SessionClaims` to request extensions if valid.
///
/// # Usage
/// ```ignore
/// let app = Router::new()
///     .route("/keystatic", ...)
///     .layer(middleware::from_fn_with_state(state, require_session));
/// ```
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let config = &state.config;
    let path = request.uri().path().to_owned();

    // CORS preflights never carry cookies
    if !config.auth.is_protected(&path) || request.method() == Method::OPTIONS {
        return next.run(request).await;
    }

    let login = found(&config.auth.login_path);

    let Some(token) = jar.get(&config.auth.session_cookie).map(|c| c.value().to_owned()) else {
        tracing::debug!(%path, "No session cookie; redirecting to login");
        AUTH_FAILURES_TOTAL.with_label_values(&["missing"]).inc();
        return login;
    };

    let secret = match config.auth.secret() {
        Ok(secret) => secret,
        Err(error) => {
            tracing::error!(%error, "Cannot verify sessions");
            AUTH_FAILURES_TOTAL.with_label_values(&["unconfigured"]).inc();
            return login;
        }
    };

    match verify(&token, secret) {
        Verification::Valid(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Verification::Expired => {
            tracing::info!(%path, "Session expired; clearing cookie");
            AUTH_FAILURES_TOTAL.with_label_values(&["expired"]).inc();
            let jar = jar.remove(cookies::session_removal(config));
            (jar, login).into_response()
        }
        Verification::Invalid => {
            tracing::info!(%path, "Invalid session token; redirecting to login");
            AUTH_FAILURES_TOTAL.with_label_values(&["invalid"]).inc();
            login
        }
    }
}

/// Extractor for the authenticated session
///
/// Only succeeds behind `require_session`.
///
/// # Usage
/// ```ignore
/// async fn handler(CurrentSession(claims): CurrentSession) -> impl IntoResponse {
///     format!("Hello, {}", claims.email)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentSession(pub SessionClaims);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionClaims>()
            .cloned()
            .map(CurrentSession)
            .ok_or(AppError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::issue_at;
    use crate::config::tests::valid_config;
    use axum::{Router, body::Body, http::StatusCode, middleware, routing::get};
    use chrono::{Duration, Utc};
    use tower::ServiceExt;

    fn test_app() -> (Router, AppState) {
        let state = AppState::from_config(valid_config()).expect("state");
        let app = Router::new()
            .route("/", get(|| async { "public" }))
            .route(
                "/keystatic",
                get(|CurrentSession(claims): CurrentSession| async move { claims.email }),
            )
            .layer(middleware::from_fn_with_state(state.clone(), require_session))
            .with_state(state.clone());
        (app, state)
    }

    fn request(path: &str, cookie: Option<&str>) -> Request {
        let mut builder = Request::builder().uri(path);
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn location(response: &Response) -> &str {
        response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn unprotected_paths_bypass_the_gate() {
        let (app, _) = test_app();
        let response = app.oneshot(request("/", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_cookie_redirects_to_login() {
        let (app, _) = test_app();
        let response = app.oneshot(request("/keystatic", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/login");
    }

    #[tokio::test]
    async fn valid_cookie_reaches_handler() {
        let (app, state) = test_app();
        let token = issue_at(
            "editor@example.com",
            state.config.auth.secret().unwrap(),
            Utc::now(),
            state.config.auth.session_ttl(),
        )
        .unwrap();

        let response = app
            .oneshot(request("/keystatic", Some(&format!("session={token}"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn expired_cookie_is_cleared() {
        let (app, state) = test_app();
        let issued = Utc::now() - Duration::days(2);
        let token = issue_at(
            "editor@example.com",
            state.config.auth.secret().unwrap(),
            issued,
            state.config.auth.session_ttl(),
        )
        .unwrap();

        let response = app
            .oneshot(request("/keystatic", Some(&format!("session={token}"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/login");

        let set_cookie = response
            .headers()
            .get("set-cookie")
            .and_then(|v| v.to_str().ok())
            .expect("removal cookie");
        assert!(set_cookie.starts_with("session="));
        assert!(set_cookie.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn forged_cookie_redirects_without_clearing() {
        let (app, _) = test_app();
        let response = app
            .oneshot(request("/keystatic", Some("session=eyJmb28iOjF9.forged")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert!(response.headers().get("set-cookie").is_none());
    }
}
