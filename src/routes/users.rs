/// User-info routes: lookup by id, batch lookup, existence check and the
/// caller's own record. All of them sit behind `JwtMiddleware`.

use std::sync::Arc;

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::domain::{Identity, User};
use crate::error::{AppError, ValidationError};
use crate::routes::{with_deadline, RequestTimeout};
use crate::storage::Directory;

/// Upper bound on ids per batch request
pub const MAX_BATCH_IDS: usize = 100;

/// View of a user; never includes the password hash
#[derive(Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub login: String,
    pub email: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            login: user.login,
            email: user.email,
        }
    }
}

#[derive(Serialize)]
pub struct UsersResponse {
    pub users: Vec<UserResponse>,
}

#[derive(Serialize)]
pub struct UsersExistResponse {
    pub exist: bool,
}

/// `?ids=1,2,3`
#[derive(Deserialize)]
pub struct IdsQuery {
    pub ids: String,
}

fn check_id(id: i64) -> Result<i64, ValidationError> {
    if id < 0 {
        return Err(ValidationError::InvalidFormat("id".to_string()));
    }
    Ok(id)
}

/// Parse a comma-separated id list. Ids must be non-negative integers.
pub fn parse_ids(raw: &str) -> Result<Vec<i64>, ValidationError> {
    if raw.trim().is_empty() {
        return Err(ValidationError::EmptyField("ids".to_string()));
    }

    let ids = raw
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<i64>()
                .map_err(|_| ValidationError::InvalidFormat("ids".to_string()))
                .and_then(|id| {
                    check_id(id).map_err(|_| ValidationError::InvalidFormat("ids".to_string()))
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if ids.len() > MAX_BATCH_IDS {
        return Err(ValidationError::TooManyItems("ids".to_string(), MAX_BATCH_IDS));
    }

    Ok(ids)
}

async fn find_user(
    directory: &Arc<dyn Directory>,
    timeout: &RequestTimeout,
    id: i64,
) -> Result<User, AppError> {
    with_deadline(timeout, async {
        directory.find_by_id(id).await.map_err(AppError::from)
    })
    .await
}

/// GET /users/{id}
///
/// # Errors
/// - 400: negative id
/// - 404: no such user
pub async fn get_user(
    path: web::Path<i64>,
    directory: web::Data<Arc<dyn Directory>>,
    timeout: web::Data<RequestTimeout>,
) -> Result<HttpResponse, AppError> {
    let id = check_id(path.into_inner())?;
    let user = find_user(&directory, &timeout, id).await?;

    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// GET /users?ids=1,2,3
///
/// Unknown ids are skipped; the result is ordered by id.
///
/// # Errors
/// - 400: missing, malformed, negative or too many ids
pub async fn get_users(
    query: web::Query<IdsQuery>,
    directory: web::Data<Arc<dyn Directory>>,
    timeout: web::Data<RequestTimeout>,
) -> Result<HttpResponse, AppError> {
    let ids = parse_ids(&query.ids)?;

    let users = with_deadline(&timeout, async {
        directory.find_by_ids(&ids).await.map_err(AppError::from)
    })
    .await?;

    tracing::info!(requested = ids.len(), found = users.len(), "Users listed");

    Ok(HttpResponse::Ok().json(UsersResponse {
        users: users.into_iter().map(UserResponse::from).collect(),
    }))
}

/// GET /users/exist?ids=1,2,3
///
/// `exist` is true only when every listed id belongs to a user.
///
/// # Errors
/// - 400: missing, malformed, negative or too many ids
pub async fn users_exist(
    query: web::Query<IdsQuery>,
    directory: web::Data<Arc<dyn Directory>>,
    timeout: web::Data<RequestTimeout>,
) -> Result<HttpResponse, AppError> {
    let ids = parse_ids(&query.ids)?;

    let exist = with_deadline(&timeout, async {
        directory.all_exist(&ids).await.map_err(AppError::from)
    })
    .await?;

    if !exist {
        tracing::warn!(requested = ids.len(), "Some users don't exist");
    }

    Ok(HttpResponse::Ok().json(UsersExistResponse { exist }))
}

/// GET /api/me
///
/// Requires `Authorization: Bearer <access_token>`; the identity is injected
/// by `JwtMiddleware`.
pub async fn get_current_user(
    identity: web::ReqData<Identity>,
    directory: web::Data<Arc<dyn Directory>>,
    timeout: web::Data<RequestTimeout>,
) -> Result<HttpResponse, AppError> {
    let user = find_user(&directory, &timeout, identity.user_id).await?;

    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}
