/// Request shape validators, applied at the HTTP boundary before dispatch.
///
/// These check form only. Whether a login exists or a password matches is
/// the orchestrator's business.

use lazy_static::lazy_static;
use regex::Regex;

use crate::auth::MAX_PASSWORD_BYTES;
use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MAX_LOGIN_LENGTH: usize = 64;
pub const MIN_PASSWORD_LENGTH: usize = 8;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();
}

/// Validates a login. Returned as given (logins are compared byte-for-byte).
pub fn is_valid_login(login: &str) -> Result<String, ValidationError> {
    if login.trim().is_empty() {
        return Err(ValidationError::EmptyField("login".to_string()));
    }

    if login.chars().count() > MAX_LOGIN_LENGTH {
        return Err(ValidationError::TooLong("login".to_string(), MAX_LOGIN_LENGTH));
    }

    if login.chars().any(|c| c.is_control()) {
        return Err(ValidationError::SuspiciousContent("login".to_string()));
    }

    Ok(login.to_string())
}

/// Validates an email address and returns it trimmed
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()));
    }

    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email".to_string(), MAX_EMAIL_LENGTH));
    }

    // Local part longer than 64 octets is not deliverable
    if let Some(at_pos) = trimmed.find('@') {
        if at_pos > 64 {
            return Err(ValidationError::InvalidFormat("email".to_string()));
        }
    }

    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("email".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Length-only password check. Passwords are never trimmed.
///
/// The upper bound is in bytes: bcrypt ignores everything past 72 of them,
/// so a longer password would match any other with the same prefix.
pub fn is_valid_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort(
            "password".to_string(),
            MIN_PASSWORD_LENGTH,
        ));
    }

    if password.len() > MAX_PASSWORD_BYTES {
        return Err(ValidationError::TooManyBytes(
            "password".to_string(),
            MAX_PASSWORD_BYTES,
        ));
    }

    Ok(())
}
