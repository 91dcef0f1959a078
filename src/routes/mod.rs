mod auth;
mod users;

use std::future::Future;
use std::time::Duration;

use actix_web::HttpResponse;

use crate::error::AppError;

pub use auth::{login, logout, refresh, signup, AuthResponse};
pub use users::{
    get_current_user, get_user, get_users, parse_ids, users_exist, UserResponse, UsersExistResponse,
    UsersResponse, MAX_BATCH_IDS,
};

/// GET /health_check
pub async fn health_check() -> HttpResponse {
    tracing::debug!("Health check endpoint called");
    HttpResponse::Ok().finish()
}

/// Deadline applied to every storage-touching handler
#[derive(Debug, Clone, Copy)]
pub struct RequestTimeout(pub Duration);

/// Run `operation` under the deadline.
///
/// On elapse the future is dropped, which rolls back any open storage
/// transaction, and the caller gets `AppError::Timeout`.
pub async fn with_deadline<T, F>(timeout: &RequestTimeout, operation: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    tokio::time::timeout(timeout.0, operation)
        .await
        .map_err(|_| AppError::Timeout)?
}
