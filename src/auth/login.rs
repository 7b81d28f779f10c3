//! Email/password login flow
//!
//! One configured operator account. A successful login sets the signed
//! session cookie plus the GitHub token mirror the admin UI reads.

use axum::{
    Form, Json, Router,
    extract::{FromRequest, Multipart, Query, Request, State},
    http::header::CONTENT_TYPE,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use axum_extra::extract::CookieJar;
use chrono::Utc;
use serde::Deserialize;

use super::{cookies, credentials::check_credentials, found, session};
use crate::AppState;
use crate::error::AppError;
use crate::metrics::LOGINS_TOTAL;

/// Create authentication router
///
/// Routes:
/// - GET /login - Login page
/// - POST /auth/login - Credential submission
/// - GET|POST /auth/logout - Logout
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page))
        .route("/auth/login", axum::routing::post(login))
        .route("/auth/logout", get(logout).post(logout))
}

// =============================================================================
// Login Page
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct LoginPageQuery {
    error: Option<String>,
    next: Option<String>,
}

/// GET /login
///
/// Renders a minimal login form posting to `/auth/login`.
async fn login_page(Query(query): Query<LoginPageQuery>) -> impl IntoResponse {
    let banner = if query.error.is_some() {
        r#"<p class="error">Invalid email or password.</p>"#
    } else {
        ""
    };
    let next = query
        .next
        .as_deref()
        .and_then(safe_next)
        .map(html_escape::encode_double_quoted_attribute)
        .unwrap_or_default();

    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Sign in</title></head>
<body>
    <h1>Sign in</h1>
    {banner}
    <form method="post" action="/auth/login">
        <input type="hidden" name="next" value="{next}">
        <label>Email <input type="email" name="email" required></label>
        <label>Password <input type="password" name="password" required></label>
        <button type="submit">Sign in</button>
    </form>
</body>
</html>
"#
    ))
}

// =============================================================================
// Login
// =============================================================================

/// Submitted credentials, from a form or a JSON body
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub next: Option<String>,
}

impl LoginRequest {
    async fn parse(request: Request, state: &AppState) -> Option<Self> {
        let content_type = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("application/x-www-form-urlencoded") {
            Form::<LoginRequest>::from_request(request, state)
                .await
                .ok()
                .map(|Form(body)| body)
        } else if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(request, state).await.ok()?;
            Self::from_multipart(multipart).await
        } else {
            Json::<LoginRequest>::from_request(request, state)
                .await
                .ok()
                .map(|Json(body)| body)
        }
    }

    async fn from_multipart(mut multipart: Multipart) -> Option<Self> {
        let mut body = LoginRequest::default();

        while let Some(field) = multipart.next_field().await.ok()? {
            let name = field.name().unwrap_or("").to_string();
            let value = field.text().await.ok()?;
            match name.as_str() {
                "email" => body.email = value,
                "password" => body.password = value,
                "next" => body.next = Some(value),
                _ => {}
            }
        }

        Some(body)
    }
}

/// POST /auth/login
///
/// # Steps
/// 1. Parse form-encoded or JSON body
/// 2. Check credentials
/// 3. Issue session token, set session and token mirror cookies
/// 4. Redirect to `next` or the admin path
///
/// Every failure redirects back to the login page with `error=1`.
async fn login(State(state): State<AppState>, jar: CookieJar, request: Request) -> Response {
    let config = &state.config;

    let Some(body) = LoginRequest::parse(request, &state).await else {
        tracing::info!("Unreadable login body");
        LOGINS_TOTAL.with_label_values(&["rejected"]).inc();
        return found(&login_error_location(&config.auth.login_path, None));
    };
    let next = body.next.as_deref().and_then(safe_next);

    match issue_login(&state, &body) {
        Ok(Some((token, github_token))) => {
            tracing::info!(email = %body.email, "Operator logged in");
            LOGINS_TOTAL.with_label_values(&["success"]).inc();
            let jar = jar
                .add(cookies::session_cookie(config, token))
                .add(cookies::token_mirror_cookie(config, &github_token));
            (jar, found(next.unwrap_or(&config.auth.admin_path))).into_response()
        }
        Ok(None) => {
            tracing::info!("Login rejected");
            LOGINS_TOTAL.with_label_values(&["rejected"]).inc();
            found(&login_error_location(&config.auth.login_path, next))
        }
        Err(error) => {
            tracing::error!(%error, "Login failed");
            LOGINS_TOTAL.with_label_values(&["error"]).inc();
            found(&login_error_location(&config.auth.login_path, next))
        }
    }
}

/// Check credentials and mint the cookies' values
///
/// Returns `None` on bad credentials, `Err` on missing configuration.
fn issue_login(state: &AppState, body: &LoginRequest) -> Result<Option<(String, String)>, AppError> {
    let config = &state.config;
    if !check_credentials(&body.email, &body.password, &config.auth)? {
        return Ok(None);
    }

    let token = session::issue_at(
        &body.email,
        config.auth.secret()?,
        Utc::now(),
        config.auth.session_ttl(),
    )?;
    let github_token = config.github.token()?.to_string();

    Ok(Some((token, github_token)))
}

/// Accept only same-site relative paths as redirect targets
fn safe_next(next: &str) -> Option<&str> {
    (next.starts_with('/') && !next.starts_with("//") && !next.starts_with("/\\")).then_some(next)
}

fn login_error_location(login_path: &str, next: Option<&str>) -> String {
    match next {
        Some(next) => format!("{login_path}?error=1&next={}", urlencoding::encode(next)),
        None => format!("{login_path}?error=1"),
    }
}

// =============================================================================
// Logout
// =============================================================================

/// GET|POST /auth/logout
///
/// Clears session cookie and redirects to login.
async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let jar = jar.remove(cookies::session_removal(&state.config));
    (jar, found(&state.config.auth.login_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_must_be_relative() {
        assert_eq!(safe_next("/keystatic/blog"), Some("/keystatic/blog"));
        assert_eq!(safe_next("/"), Some("/"));
        assert_eq!(safe_next("//evil.example"), None);
        assert_eq!(safe_next("/\\evil.example"), None);
        assert_eq!(safe_next("https://evil.example"), None);
        assert_eq!(safe_next(""), None);
    }

    #[test]
    fn error_location_preserves_next() {
        assert_eq!(login_error_location("/login", None), "/login?error=1");
        assert_eq!(
            login_error_location("/login", Some("/keystatic/blog?x=1")),
            "/login?error=1&next=%2Fkeystatic%2Fblog%3Fx%3D1"
        );
    }
}
