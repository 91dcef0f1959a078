/// Persistence boundaries consumed by the auth orchestrator.
///
/// Backends report failures as `DatabaseError`; the orchestrator is the only
/// place those get classified into caller-facing outcomes.

mod memory;
mod sqlite;

use async_trait::async_trait;

use crate::domain::User;
use crate::error::DatabaseError;

pub use memory::InMemoryStorage;
pub use sqlite::SqliteStorage;

/// Durable user records keyed by login and by id
#[async_trait]
pub trait Directory: Send + Sync {
    /// `NotFound` if no user has this login
    async fn find_by_login(&self, login: &str) -> Result<User, DatabaseError>;

    /// `NotFound` if no user has this id
    async fn find_by_id(&self, id: i64) -> Result<User, DatabaseError>;

    /// Every user whose id is in `ids`, ordered by id. Unknown ids are
    /// skipped, so the result may be shorter than the input.
    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<User>, DatabaseError>;

    /// Whether every id in `ids` belongs to a user. Duplicates count once.
    async fn all_exist(&self, ids: &[i64]) -> Result<bool, DatabaseError> {
        let mut unique = ids.to_vec();
        unique.sort_unstable();
        unique.dedup();

        Ok(self.find_by_ids(&unique).await?.len() == unique.len())
    }

    /// Insert a user and return the assigned id.
    ///
    /// `UniqueConstraintViolation` if the login or email is taken.
    async fn insert(&self, login: &str, email: &str, password_hash: &str)
        -> Result<i64, DatabaseError>;
}

/// Durable refresh-token → access-token mapping
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn put(&self, refresh_token: &str, access_token: &str) -> Result<(), DatabaseError>;

    /// `NotFound` if the refresh value is not tracked
    async fn get(&self, refresh_token: &str) -> Result<String, DatabaseError>;

    /// `NotFound` if there was nothing to delete
    async fn delete(&self, refresh_token: &str) -> Result<(), DatabaseError>;

    /// Insert the new pair and delete the old refresh row as one unit.
    ///
    /// If the old row is already gone nothing is written and `NotFound` is
    /// returned, so two rotations of the same token cannot both succeed.
    async fn rotate(
        &self,
        old_refresh_token: &str,
        new_refresh_token: &str,
        new_access_token: &str,
    ) -> Result<(), DatabaseError>;
}
