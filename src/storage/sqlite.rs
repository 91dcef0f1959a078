/// SQLite-backed `Directory` and `SessionStore`.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::configuration::DatabaseSettings;
use crate::domain::User;
use crate::error::DatabaseError;
use crate::storage::{Directory, SessionStore};

type UserRow = (i64, String, String, String);

fn into_user((id, login, email, password_hash): UserRow) -> User {
    User {
        id,
        login,
        email,
        password_hash,
    }
}

#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Open (creating if needed) the database file and apply migrations
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, DatabaseError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(settings.max_connections)
            .connect_with(settings.connect_options())
            .await?;

        Self::from_pool(pool).await
    }

    /// Private in-memory database living as long as the returned storage.
    ///
    /// Pinned to a single connection that is never recycled; every new
    /// SQLite connection to `:memory:` would otherwise see an empty database.
    pub async fn in_memory() -> Result<Self, DatabaseError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self, DatabaseError> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::debug!("Database migrations applied");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Directory for SqliteStorage {
    async fn find_by_login(&self, login: &str) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, UserRow>(
            "SELECT id, login, email, password_hash FROM users WHERE login = ?",
        )
        .bind(login)
        .fetch_optional(&self.pool)
        .await?
        .map(into_user)
        .ok_or_else(|| DatabaseError::NotFound("user is not found".to_string()))
    }

    async fn find_by_id(&self, id: i64) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, UserRow>(
            "SELECT id, login, email, password_hash FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(into_user)
        .ok_or_else(|| DatabaseError::NotFound("user is not found".to_string()))
    }

    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<User>, DatabaseError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT id, login, email, password_hash FROM users WHERE id IN ({}) ORDER BY id",
            placeholders
        );

        let mut query = sqlx::query_as::<_, UserRow>(&sql);
        for id in ids {
            query = query.bind(*id);
        }

        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(into_user).collect())
    }

    async fn insert(
        &self,
        login: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<i64, DatabaseError> {
        let result = sqlx::query(
            "INSERT INTO users (login, email, password_hash) VALUES (?, ?, ?)",
        )
        .bind(login)
        .bind(email)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }
}

#[async_trait]
impl SessionStore for SqliteStorage {
    async fn put(&self, refresh_token: &str, access_token: &str) -> Result<(), DatabaseError> {
        sqlx::query("INSERT INTO sessions (refresh_token, access_token) VALUES (?, ?)")
            .bind(refresh_token)
            .bind(access_token)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn get(&self, refresh_token: &str) -> Result<String, DatabaseError> {
        sqlx::query_scalar::<_, String>(
            "SELECT access_token FROM sessions WHERE refresh_token = ?",
        )
        .bind(refresh_token)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound("session is not found".to_string()))
    }

    async fn delete(&self, refresh_token: &str) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM sessions WHERE refresh_token = ?")
            .bind(refresh_token)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("session is not found".to_string()));
        }

        Ok(())
    }

    async fn rotate(
        &self,
        old_refresh_token: &str,
        new_refresh_token: &str,
        new_access_token: &str,
    ) -> Result<(), DatabaseError> {
        // Dropping `tx` on any early return rolls it back.
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO sessions (refresh_token, access_token) VALUES (?, ?)")
            .bind(new_refresh_token)
            .bind(new_access_token)
            .execute(&mut tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM sessions WHERE refresh_token = ?")
            .bind(old_refresh_token)
            .execute(&mut tx)
            .await?;

        if deleted.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(DatabaseError::NotFound(
                "session was already rotated".to_string(),
            ));
        }

        tx.commit().await?;
        Ok(())
    }
}
