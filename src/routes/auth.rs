/// Authentication Routes
///
/// Sign-up, login, token refresh and logout. Handlers check request shape,
/// then hand off to `AuthService` under the configured deadline.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::AuthService;
use crate::domain::TokensPair;
use crate::error::AppError;
use crate::routes::{with_deadline, RequestTimeout};
use crate::validators::{is_valid_email, is_valid_login, is_valid_password};

#[derive(Deserialize)]
pub struct SignUpRequest {
    pub login: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

/// Body for both refresh and logout
#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Authentication response with access and refresh tokens
#[derive(Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl AuthResponse {
    fn new(pair: TokensPair, expires_in: i64) -> Self {
        Self {
            access_token: pair.access.value,
            refresh_token: pair.refresh.value,
            token_type: "Bearer".to_string(),
            expires_in,
        }
    }
}

/// POST /auth/signup
///
/// # Errors
/// - 400: malformed request, password over 72 bytes, or login/email already
///   registered
/// - 500: internal error
pub async fn signup(
    form: web::Json<SignUpRequest>,
    auth: web::Data<AuthService>,
    timeout: web::Data<RequestTimeout>,
) -> Result<HttpResponse, AppError> {
    let login = is_valid_login(&form.login)?;
    let email = is_valid_email(&form.email)?;
    is_valid_password(&form.password)?;

    let pair = with_deadline(&timeout, auth.sign_up(&login, &email, &form.password)).await?;

    tracing::info!("User signed up");

    Ok(HttpResponse::Created().json(AuthResponse::new(pair, auth.access_ttl_secs())))
}

/// POST /auth/login
///
/// Unknown login and wrong password produce the same 400 response.
///
/// # Errors
/// - 400: malformed request or invalid credentials
/// - 500: internal error
pub async fn login(
    form: web::Json<LoginRequest>,
    auth: web::Data<AuthService>,
    timeout: web::Data<RequestTimeout>,
) -> Result<HttpResponse, AppError> {
    let login = is_valid_login(&form.login)?;
    is_valid_password(&form.password)?;

    let pair = with_deadline(&timeout, auth.login(&login, &form.password)).await?;

    tracing::info!("User logged in");

    Ok(HttpResponse::Ok().json(AuthResponse::new(pair, auth.access_ttl_secs())))
}

/// POST /auth/refresh
///
/// Token rotation: the submitted refresh token is consumed and a new pair
/// is returned. Replaying a consumed token fails.
///
/// # Errors
/// - 401: expired, rotated, revoked or unknown refresh token
/// - 500: internal error
pub async fn refresh(
    form: web::Json<RefreshRequest>,
    auth: web::Data<AuthService>,
    timeout: web::Data<RequestTimeout>,
) -> Result<HttpResponse, AppError> {
    let pair = with_deadline(&timeout, auth.refresh_tokens(&form.refresh_token)).await?;

    tracing::info!("Tokens refreshed");

    Ok(HttpResponse::Ok().json(AuthResponse::new(pair, auth.access_ttl_secs())))
}

/// POST /auth/logout
///
/// # Errors
/// - 401: unknown or already invalidated refresh token
/// - 500: internal error
pub async fn logout(
    form: web::Json<RefreshRequest>,
    auth: web::Data<AuthService>,
    timeout: web::Data<RequestTimeout>,
) -> Result<HttpResponse, AppError> {
    with_deadline(&timeout, auth.logout(&form.refresh_token)).await?;

    tracing::info!("Session invalidated");

    Ok(HttpResponse::NoContent().finish())
}
