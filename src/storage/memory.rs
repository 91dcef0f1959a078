/// In-memory `Directory` and `SessionStore` for tests and throwaway runs.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::User;
use crate::error::DatabaseError;
use crate::storage::{Directory, SessionStore};

#[derive(Default)]
struct Users {
    last_id: i64,
    by_id: HashMap<i64, User>,
}

#[derive(Default)]
pub struct InMemoryStorage {
    users: Mutex<Users>,
    sessions: Mutex<HashMap<String, String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, DatabaseError> {
    mutex
        .lock()
        .map_err(|_| DatabaseError::UnexpectedError("storage lock poisoned".to_string()))
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Directory for InMemoryStorage {
    async fn find_by_login(&self, login: &str) -> Result<User, DatabaseError> {
        lock(&self.users)?
            .by_id
            .values()
            .find(|user| user.login == login)
            .cloned()
            .ok_or_else(|| DatabaseError::NotFound("user is not found".to_string()))
    }

    async fn find_by_id(&self, id: i64) -> Result<User, DatabaseError> {
        lock(&self.users)?
            .by_id
            .get(&id)
            .cloned()
            .ok_or_else(|| DatabaseError::NotFound("user is not found".to_string()))
    }

    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<User>, DatabaseError> {
        let users = lock(&self.users)?;
        let mut found: Vec<User> = users
            .by_id
            .values()
            .filter(|user| ids.contains(&user.id))
            .cloned()
            .collect();
        found.sort_by_key(|user| user.id);

        Ok(found)
    }

    async fn insert(
        &self,
        login: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<i64, DatabaseError> {
        let mut users = lock(&self.users)?;

        if let Some(taken) = users
            .by_id
            .values()
            .find(|user| user.login == login || user.email == email)
        {
            let field = if taken.login == login { "login" } else { "email" };
            return Err(DatabaseError::UniqueConstraintViolation(format!(
                "{} already exists",
                field
            )));
        }

        users.last_id += 1;
        let id = users.last_id;
        users.by_id.insert(
            id,
            User {
                id,
                login: login.to_string(),
                email: email.to_string(),
                password_hash: password_hash.to_string(),
            },
        );

        Ok(id)
    }
}

#[async_trait]
impl SessionStore for InMemoryStorage {
    async fn put(&self, refresh_token: &str, access_token: &str) -> Result<(), DatabaseError> {
        let mut sessions = lock(&self.sessions)?;

        if sessions.contains_key(refresh_token) {
            return Err(DatabaseError::UniqueConstraintViolation(
                "session already exists".to_string(),
            ));
        }

        sessions.insert(refresh_token.to_string(), access_token.to_string());
        Ok(())
    }

    async fn get(&self, refresh_token: &str) -> Result<String, DatabaseError> {
        lock(&self.sessions)?
            .get(refresh_token)
            .cloned()
            .ok_or_else(|| DatabaseError::NotFound("session is not found".to_string()))
    }

    async fn delete(&self, refresh_token: &str) -> Result<(), DatabaseError> {
        lock(&self.sessions)?
            .remove(refresh_token)
            .map(|_| ())
            .ok_or_else(|| DatabaseError::NotFound("session is not found".to_string()))
    }

    async fn rotate(
        &self,
        old_refresh_token: &str,
        new_refresh_token: &str,
        new_access_token: &str,
    ) -> Result<(), DatabaseError> {
        let mut sessions = lock(&self.sessions)?;

        if sessions.contains_key(new_refresh_token) {
            return Err(DatabaseError::UniqueConstraintViolation(
                "session already exists".to_string(),
            ));
        }
        if sessions.remove(old_refresh_token).is_none() {
            return Err(DatabaseError::NotFound(
                "session was already rotated".to_string(),
            ));
        }

        sessions.insert(new_refresh_token.to_string(), new_access_token.to_string());
        Ok(())
    }
}
