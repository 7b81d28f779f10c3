//! Session token codec
//!
//! Uses HMAC-signed tokens stored in cookies.
//! No server-side session storage needed.
//!
//! Token format: `base64(json).base64url(hmac_sha256(base64(json)))`.
//! The payload segment uses the standard alphabet with padding, the
//! signature segment the URL-safe alphabet without padding. Neither
//! alphabet contains `.`, so the last dot always separates the two.

use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Default token lifetime in seconds (24 hours)
pub const SESSION_TTL_SECONDS: i64 = 24 * 60 * 60;

pub fn default_ttl() -> Duration {
    Duration::seconds(SESSION_TTL_SECONDS)
}

/// Signed session payload
///
/// Timestamps are Unix milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Operator email that logged in
    pub email: String,
    /// Issued at
    pub iat: i64,
    /// Expires at
    pub exp: i64,
}

impl SessionClaims {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.exp <= now.timestamp_millis()
    }
}

/// Outcome of verifying a token
///
/// Verification never fails with an error: anything that is not a
/// well-formed, correctly signed, unexpired token is `Invalid` or `Expired`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Valid(SessionClaims),
    Expired,
    Invalid,
}

impl Verification {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verification::Valid(_))
    }

    pub fn claims(self) -> Option<SessionClaims> {
        match self {
            Verification::Valid(claims) => Some(claims),
            _ => None,
        }
    }
}

fn sign(payload_b64: &str, secret: &str) -> Result<String, AppError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid HMAC key: {e}")))?;
    mac.update(payload_b64.as_bytes());
    Ok(general_purpose::URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
}

/// Create a signed session token valid for 24 hours
pub fn issue(email: &str, secret: &str) -> Result<String, AppError> {
    issue_at(email, secret, Utc::now(), default_ttl())
}

/// Create a signed session token issued at `now`, valid for `ttl`
///
/// # Arguments
/// * `email` - Operator email recorded in the payload
/// * `secret` - HMAC secret key
///
/// # Returns
/// Signed token string
pub fn issue_at(
    email: &str,
    secret: &str,
    now: DateTime<Utc>,
    ttl: Duration,
) -> Result<String, AppError> {
    let claims = SessionClaims {
        email: email.to_string(),
        iat: now.timestamp_millis(),
        exp: (now + ttl).timestamp_millis(),
    };

    let payload = serde_json::to_string(&claims).map_err(|e| AppError::Internal(e.into()))?;
    let payload_b64 = general_purpose::STANDARD.encode(payload.as_bytes());
    let signature_b64 = sign(&payload_b64, secret)?;

    Ok(format!("{}.{}", payload_b64, signature_b64))
}

/// Verify a token against the current time
pub fn verify(token: &str, secret: &str) -> Verification {
    verify_at(token, secret, Utc::now())
}

/// Verify and decode a session token as of `now`
pub fn verify_at(token: &str, secret: &str, now: DateTime<Utc>) -> Verification {
    let Some((payload_b64, signature_b64)) = token.rsplit_once('.') else {
        return Verification::Invalid;
    };

    let expected = match sign(payload_b64, secret) {
        Ok(expected) => expected,
        Err(_) => return Verification::Invalid,
    };
    if signature_b64 != expected {
        return Verification::Invalid;
    }

    let Some(claims) = decode_claims(payload_b64) else {
        return Verification::Invalid;
    };

    if claims.is_expired_at(now) {
        return Verification::Expired;
    }

    Verification::Valid(claims)
}

fn decode_claims(payload_b64: &str) -> Option<SessionClaims> {
    let bytes = general_purpose::STANDARD.decode(payload_b64).ok()?;
    let json = String::from_utf8(bytes).ok()?;
    serde_json::from_str(&json).ok()
}
