//! Session and token-mirror cookies

use axum_extra::extract::cookie::{Cookie, SameSite};

use crate::config::AppConfig;

/// HttpOnly cookie carrying the signed session token
pub fn session_cookie(config: &AppConfig, token: String) -> Cookie<'static> {
    Cookie::build((config.auth.session_cookie.clone(), token))
        .http_only(true)
        .secure(config.server.secure_cookies())
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(cookie_max_age(config))
        .build()
}

/// Script-readable copy of the static GitHub token
///
/// The admin UI reads it to skip its own OAuth flow, so it cannot be
/// HttpOnly.
pub fn token_mirror_cookie(config: &AppConfig, token: &str) -> Cookie<'static> {
    Cookie::build((config.github.token_cookie.clone(), token.to_string()))
        .http_only(false)
        .secure(config.server.secure_cookies())
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(cookie_max_age(config))
        .build()
}

/// Removal template for the session cookie (pass to `CookieJar::remove`)
pub fn session_removal(config: &AppConfig) -> Cookie<'static> {
    Cookie::build(config.auth.session_cookie.clone()).path("/").build()
}

/// Removal template for the token mirror cookie
pub fn token_mirror_removal(config: &AppConfig) -> Cookie<'static> {
    Cookie::build(config.github.token_cookie.clone()).path("/").build()
}

fn cookie_max_age(config: &AppConfig) -> time::Duration {
    time::Duration::seconds(config.auth.session_ttl_seconds)
}
