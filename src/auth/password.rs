/// Password Hashing and Verification
///
/// bcrypt with a configurable cost. Nothing here logs the password or the hash.

use bcrypt::{hash, verify};

use crate::error::AppError;

/// bcrypt's accepted cost range
pub const MIN_HASH_COST: u32 = 4;
pub const MAX_HASH_COST: u32 = 31;

/// bcrypt silently ignores everything past this many bytes
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Hash a password using bcrypt at the given cost
///
/// # Errors
/// Returns `Internal` if the password is longer than `MAX_PASSWORD_BYTES`,
/// or if bcrypt rejects the cost or fails to hash
pub fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(AppError::Internal(format!(
            "Password hashing failed: longer than {} bytes",
            MAX_PASSWORD_BYTES
        )));
    }

    hash(password, cost).map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Compare a candidate password against a stored hash
///
/// `Ok(false)` is a mismatch. A candidate longer than `MAX_PASSWORD_BYTES`
/// never matches, since no stored hash can have come from it. A stored hash
/// bcrypt cannot parse is an `Internal` error, not a mismatch.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, AppError> {
    if password.len() > MAX_PASSWORD_BYTES {
        return Ok(false);
    }

    verify(password, stored_hash)
        .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))
}
