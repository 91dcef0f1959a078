/// JWT Claims structures
///
/// Access tokens carry identity; refresh tokens carry only their lifetime
/// plus a random `jti` so that two tokens minted in the same second differ.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Identity;
use crate::error::TokenError;

/// Claims embedded in access tokens
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccessClaims {
    /// Subject (user id)
    pub sub: String,
    pub login: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    pub jti: String,
}

impl AccessClaims {
    pub fn new(user_id: i64, login: String, ttl: Duration) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            login,
            exp: now + ttl.num_seconds(),
            iat: now,
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// Extract user id from claims
    ///
    /// # Errors
    /// Returns `Malformed` if `sub` is not a numeric id
    pub fn user_id(&self) -> Result<i64, TokenError> {
        self.sub
            .parse::<i64>()
            .map_err(|_| TokenError::Malformed("subject is not a user id".to_string()))
    }

    pub fn identity(&self) -> Result<Identity, TokenError> {
        Ok(Identity {
            user_id: self.user_id()?,
            login: self.login.clone(),
        })
    }
}

/// Claims embedded in refresh tokens. They carry no identity.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RefreshClaims {
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

impl RefreshClaims {
    pub fn new(ttl: Duration) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            exp: now + ttl.num_seconds(),
            iat: now,
            jti: Uuid::new_v4().to_string(),
        }
    }
}

/// The only claim the expiry check needs; decodes from either token kind.
#[derive(Debug, Deserialize)]
pub(crate) struct ExpiryClaims {
    #[allow(dead_code)]
    pub exp: i64,
}
