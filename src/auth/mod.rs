/// Authentication module
///
/// Password hashing, JWT issuing/validation and the orchestrator that ties
/// them to the directory and session store.

mod claims;
pub mod jwt;
mod password;
mod service;

pub use claims::{AccessClaims, RefreshClaims};
pub use jwt::{check_expiry, extract_claims, issue_pair, validate_access_token};
pub use password::{
    hash_password, verify_password, MAX_HASH_COST, MAX_PASSWORD_BYTES, MIN_HASH_COST,
};
pub use service::{AuthConfig, AuthService};
