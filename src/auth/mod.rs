//! Operator authentication
//!
//! Handles:
//! - Email/password login and logout
//! - Signed session tokens
//! - Access middleware for the admin surface

mod cookies;
pub mod credentials;
mod login;
mod middleware;
pub mod session;

use axum::{
    http::{StatusCode, header::LOCATION},
    response::{IntoResponse, Response},
};

pub use cookies::{session_cookie, token_mirror_cookie, token_mirror_removal};
pub use credentials::check_credentials;
pub use login::{LoginRequest, auth_router};
pub use middleware::{CurrentSession, require_session};
pub use session::{SessionClaims, Verification, issue, verify};

/// 302 Found redirect (axum's `Redirect` has no 302 constructor)
pub(crate) fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(LOCATION, location.to_string())]).into_response()
}
