//! Operator credential check

use subtle::ConstantTimeEq;

use crate::config::AuthConfig;
use crate::error::AppError;

/// Compare a submitted email/password pair against the configured one.
///
/// Both fields are always compared so the outcome does not depend on
/// which one was wrong. Empty submissions never match.
///
/// # Errors
/// Returns `AppError::Config` when no credentials are configured
pub fn check_credentials(email: &str, password: &str, config: &AuthConfig) -> Result<bool, AppError> {
    let (valid_email, valid_password) = config.credentials()?;

    if email.is_empty() || password.is_empty() {
        return Ok(false);
    }

    let email_ok = email.as_bytes().ct_eq(valid_email.as_bytes());
    let password_ok = password.as_bytes().ct_eq(valid_password.as_bytes());

    Ok((email_ok & password_ok).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::valid_config;

    #[test]
    fn accepts_exact_pair() {
        let config = valid_config();
        assert!(check_credentials("editor@example.com", "correct horse", &config.auth).unwrap());
    }

    #[test]
    fn rejects_any_mismatch() {
        let config = valid_config();
        let auth = &config.auth;
        assert!(!check_credentials("editor@example.com", "wrong", auth).unwrap());
        assert!(!check_credentials("other@example.com", "correct horse", auth).unwrap());
        assert!(!check_credentials("EDITOR@example.com", "correct horse", auth).unwrap());
        assert!(!check_credentials("", "", auth).unwrap());
    }

    #[test]
    fn missing_configuration_is_an_error() {
        let mut config = valid_config();
        config.auth.password.clear();
        assert!(matches!(
            check_credentials("editor@example.com", "", &config.auth),
            Err(AppError::Config(_))
        ));
    }
}
