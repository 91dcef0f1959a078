/// JWT Token Issuing and Validation
///
/// All tokens are HS256 over a shared secret. Validation pins the algorithm,
/// so a token whose header names anything else is rejected before its claims
/// are looked at.

use chrono::Duration;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;

use crate::auth::claims::{AccessClaims, ExpiryClaims, RefreshClaims};
use crate::domain::{Identity, Token, TokensPair};
use crate::error::TokenError;

pub const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

fn sign<T: Serialize>(claims: &T, secret: &[u8]) -> Result<String, TokenError> {
    if secret.is_empty() {
        return Err(TokenError::Issue("signing secret is empty".to_string()));
    }

    encode(
        &Header::new(SIGNING_ALGORITHM),
        claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| TokenError::Issue(e.to_string()))
}

/// Mint an access token carrying `user_id` and `login`, expiring at `now + ttl`
pub fn issue_access(
    user_id: i64,
    login: &str,
    secret: &[u8],
    ttl: Duration,
) -> Result<String, TokenError> {
    sign(&AccessClaims::new(user_id, login.to_string(), ttl), secret)
}

/// Mint an identity-less refresh token expiring at `now + ttl`
pub fn issue_refresh(secret: &[u8], ttl: Duration) -> Result<String, TokenError> {
    sign(&RefreshClaims::new(ttl), secret)
}

pub fn issue_pair(
    user_id: i64,
    login: &str,
    secret: &[u8],
    access_ttl: Duration,
    refresh_ttl: Duration,
) -> Result<TokensPair, TokenError> {
    let access = issue_access(user_id, login, secret, access_ttl)?;
    let refresh = issue_refresh(secret, refresh_ttl)?;

    Ok(TokensPair {
        access: Token::access(access),
        refresh: Token::refresh(refresh),
    })
}

fn validation(check_exp: bool) -> Validation {
    let mut validation = Validation::new(SIGNING_ALGORITHM);
    validation.leeway = 0;
    validation.validate_exp = check_exp;
    if !check_exp {
        validation.required_spec_claims.clear();
    }
    validation
}

fn classify(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Malformed(err.to_string()),
    }
}

/// Verify signature and algorithm, then compare `exp` with the wall clock
pub fn check_expiry(token: &str, secret: &[u8]) -> Result<(), TokenError> {
    decode::<ExpiryClaims>(token, &DecodingKey::from_secret(secret), &validation(true))
        .map(|_| ())
        .map_err(classify)
}

/// Verify signature and algorithm and decode identity, ignoring `exp`
///
/// Only for access tokens recovered from the session store, whose freshness
/// was already established through the paired refresh token.
pub fn extract_claims(token: &str, secret: &[u8]) -> Result<Identity, TokenError> {
    decode::<AccessClaims>(token, &DecodingKey::from_secret(secret), &validation(false))
        .map_err(classify)?
        .claims
        .identity()
}

/// Full check for bearer tokens: signature, algorithm, expiry and identity
pub fn validate_access_token(token: &str, secret: &[u8]) -> Result<Identity, TokenError> {
    decode::<AccessClaims>(token, &DecodingKey::from_secret(secret), &validation(true))
        .map_err(classify)?
        .claims
        .identity()
}
