//! Auth orchestrator: login, sign-up, refresh-token rotation and logout.
//!
//! The service holds no mutable state of its own. Users live behind
//! [`Directory`], sessions (refresh → access) behind [`SessionStore`], and the
//! signing secret and TTLs are fixed at construction.
//!
//! Every storage or token failure is classified here. Callers only ever see
//! `AuthError::{InvalidArgument, Expired, NoToken}` or an opaque
//! `AppError::Internal`.

use std::sync::Arc;

use chrono::Duration;

use crate::auth::jwt;
use crate::auth::password::{hash_password, verify_password, MAX_PASSWORD_BYTES};
use crate::configuration::{JwtSettings, SecuritySettings};
use crate::domain::TokensPair;
use crate::error::{AppError, AuthError, DatabaseError, TokenError};
use crate::storage::{Directory, SessionStore};

/// Immutable signing and hashing parameters
#[derive(Clone)]
pub struct AuthConfig {
    pub secret: Vec<u8>,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub password_hash_cost: u32,
}

impl AuthConfig {
    pub fn from_settings(jwt: &JwtSettings, security: &SecuritySettings) -> Self {
        Self {
            secret: jwt.secret.as_bytes().to_vec(),
            access_ttl: Duration::seconds(jwt.access_token_expiry),
            refresh_ttl: Duration::seconds(jwt.refresh_token_expiry),
            password_hash_cost: security.password_hash_cost,
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"[redacted]")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("password_hash_cost", &self.password_hash_cost)
            .finish()
    }
}

#[derive(Clone)]
pub struct AuthService {
    directory: Arc<dyn Directory>,
    sessions: Arc<dyn SessionStore>,
    config: Arc<AuthConfig>,
}

impl AuthService {
    pub fn new(
        directory: Arc<dyn Directory>,
        sessions: Arc<dyn SessionStore>,
        config: AuthConfig,
    ) -> Self {
        Self {
            directory,
            sessions,
            config: Arc::new(config),
        }
    }

    /// Seconds until a freshly issued access token expires
    pub fn access_ttl_secs(&self) -> i64 {
        self.config.access_ttl.num_seconds()
    }

    /// Verify credentials and issue a stored token pair.
    ///
    /// An unknown login and a wrong password fail identically with
    /// `InvalidArgument`. Only the full password is compared; a candidate that
    /// shares the stored password's first 72 bytes does not match.
    #[tracing::instrument(name = "auth.login", skip(self, password))]
    pub async fn login(&self, login: &str, password: &str) -> Result<TokensPair, AppError> {
        tracing::info!("starting to login user");

        let user = match self.directory.find_by_login(login).await {
            Ok(user) => user,
            Err(DatabaseError::NotFound(_)) => {
                tracing::warn!("user is not found");
                return Err(AuthError::InvalidArgument.into());
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to get user");
                return Err(AppError::internal(e));
            }
        };

        let candidate = password.to_string();
        let stored_hash = user.password_hash.clone();
        let matches = run_blocking(move || verify_password(&candidate, &stored_hash)).await?;
        if !matches {
            tracing::warn!(user_id = user.id, "password mismatched");
            return Err(AuthError::InvalidArgument.into());
        }

        let pair = self.issue_and_store(user.id, &user.login).await?;

        tracing::info!(user_id = user.id, "successfully logged in");
        Ok(pair)
    }

    /// Create a user and issue a stored token pair for it.
    ///
    /// A taken login or email, or a password bcrypt would truncate, fails
    /// with `InvalidArgument`.
    #[tracing::instrument(name = "auth.sign_up", skip(self, email, password))]
    pub async fn sign_up(
        &self,
        login: &str,
        email: &str,
        password: &str,
    ) -> Result<TokensPair, AppError> {
        tracing::info!("starting to sign up user");

        if password.len() > MAX_PASSWORD_BYTES {
            tracing::warn!("password is longer than bcrypt accepts");
            return Err(AuthError::InvalidArgument.into());
        }

        let plain = password.to_string();
        let cost = self.config.password_hash_cost;
        let password_hash = run_blocking(move || hash_password(&plain, cost))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "failed to compute hash");
                e
            })?;

        let user_id = match self.directory.insert(login, email, &password_hash).await {
            Ok(id) => id,
            Err(DatabaseError::UniqueConstraintViolation(reason)) => {
                tracing::warn!(%reason, "failed to save user");
                return Err(AuthError::InvalidArgument.into());
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to save user");
                return Err(AppError::internal(e));
            }
        };

        let pair = self.issue_and_store(user_id, login).await?;

        tracing::info!(user_id, "successfully signed up");
        Ok(pair)
    }

    /// Exchange a refresh token for a brand-new pair, consuming the old one.
    ///
    /// The refresh token carries no identity; it is recovered from the access
    /// token stored beside it. A token can be redeemed at most once.
    #[tracing::instrument(name = "auth.refresh_tokens", skip_all)]
    pub async fn refresh_tokens(&self, refresh_token: &str) -> Result<TokensPair, AppError> {
        tracing::info!("starting to refresh tokens");

        match jwt::check_expiry(refresh_token, &self.config.secret) {
            Ok(()) => {}
            Err(TokenError::Expired) => {
                tracing::warn!("refresh token is expired");
                return Err(AuthError::Expired.into());
            }
            Err(e) => {
                tracing::warn!(error = %e, "refresh token failed verification");
                return Err(AuthError::NoToken.into());
            }
        }

        let stored_access = match self.sessions.get(refresh_token).await {
            Ok(access) => access,
            Err(DatabaseError::NotFound(_)) => {
                tracing::warn!("refresh token is not tracked");
                return Err(AuthError::NoToken.into());
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to get session");
                return Err(AppError::internal(e));
            }
        };

        let identity = jwt::extract_claims(&stored_access, &self.config.secret).map_err(|e| {
            tracing::error!(error = %e, "stored access token is unreadable");
            AppError::internal(e)
        })?;

        let pair = self.issue(identity.user_id, &identity.login)?;

        match self
            .sessions
            .rotate(refresh_token, &pair.refresh.value, &pair.access.value)
            .await
        {
            Ok(()) => {}
            Err(DatabaseError::NotFound(_)) => {
                tracing::warn!(user_id = identity.user_id, "refresh token was consumed concurrently");
                return Err(AuthError::NoToken.into());
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to rotate session");
                return Err(AppError::internal(e));
            }
        }

        tracing::info!(user_id = identity.user_id, "successfully refreshed tokens");
        Ok(pair)
    }

    /// Invalidate a session explicitly.
    ///
    /// Expired refresh tokens are accepted so stale sessions can be cleared.
    #[tracing::instrument(name = "auth.logout", skip_all)]
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AppError> {
        tracing::info!("starting to logout");

        match jwt::check_expiry(refresh_token, &self.config.secret) {
            Ok(()) | Err(TokenError::Expired) => {}
            Err(e) => {
                tracing::warn!(error = %e, "refresh token failed verification");
                return Err(AuthError::NoToken.into());
            }
        }

        match self.sessions.delete(refresh_token).await {
            Ok(()) => {
                tracing::info!("session invalidated");
                Ok(())
            }
            Err(DatabaseError::NotFound(_)) => {
                tracing::warn!("refresh token is not tracked");
                Err(AuthError::NoToken.into())
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to delete session");
                Err(AppError::internal(e))
            }
        }
    }

    fn issue(&self, user_id: i64, login: &str) -> Result<TokensPair, AppError> {
        jwt::issue_pair(
            user_id,
            login,
            &self.config.secret,
            self.config.access_ttl,
            self.config.refresh_ttl,
        )
        .map_err(|e| {
            tracing::error!(error = %e, "failed to generate tokens");
            AppError::internal(e)
        })
    }

    /// No pair leaves the service unless its session row is durable.
    async fn issue_and_store(&self, user_id: i64, login: &str) -> Result<TokensPair, AppError> {
        let pair = self.issue(user_id, login)?;

        self.sessions
            .put(&pair.refresh.value, &pair.access.value)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "failed to save session");
                AppError::internal(e)
            })?;

        Ok(pair)
    }
}

/// bcrypt is CPU-bound; keep it off the async workers
async fn run_blocking<F, T>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("blocking task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::User;
    use crate::storage::InMemoryStorage;
    use async_trait::async_trait;

    const SECRET: &[u8] = b"orchestrator-test-secret";

    fn config() -> AuthConfig {
        AuthConfig {
            secret: SECRET.to_vec(),
            access_ttl: Duration::seconds(900),
            refresh_ttl: Duration::seconds(3600),
            password_hash_cost: crate::auth::MIN_HASH_COST,
        }
    }

    fn service() -> (AuthService, Arc<InMemoryStorage>) {
        let storage = Arc::new(InMemoryStorage::new());
        let service = AuthService::new(storage.clone(), storage.clone(), config());
        (service, storage)
    }

    fn identity_of(pair: &TokensPair) -> (i64, String) {
        let identity = jwt::extract_claims(&pair.access.value, SECRET).unwrap();
        (identity.user_id, identity.login)
    }

    fn assert_auth_error(result: Result<impl std::fmt::Debug, AppError>, expected: AuthError) {
        match result {
            Err(AppError::Auth(actual)) => assert_eq!(actual, expected),
            other => panic!("expected {:?}, got {:?}", expected, other),
        }
    }

    #[tokio::test]
    async fn sign_up_then_login_yields_same_identity() {
        let (service, storage) = service();

        let signed_up = service.sign_up("alice", "a@x.com", "longpassword1").await.unwrap();
        let logged_in = service.login("alice", "longpassword1").await.unwrap();

        assert_eq!(identity_of(&signed_up), identity_of(&logged_in));
        assert_eq!(identity_of(&logged_in).1, "alice");
        assert_ne!(signed_up.access.value, logged_in.access.value);
        assert_ne!(signed_up.refresh.value, logged_in.refresh.value);
        assert_eq!(storage.session_count(), 2);
    }

    #[tokio::test]
    async fn sign_up_stores_a_hash_not_the_password() {
        let (service, storage) = service();
        service.sign_up("alice", "a@x.com", "longpassword1").await.unwrap();

        let user = storage.find_by_login("alice").await.unwrap();

        assert_ne!(user.password_hash, "longpassword1");
        assert!(verify_password("longpassword1", &user.password_hash).unwrap());
    }

    #[tokio::test]
    async fn duplicate_sign_up_is_invalid_argument_and_issues_nothing() {
        let (service, storage) = service();
        service.sign_up("alice", "a@x.com", "longpassword1").await.unwrap();

        assert_auth_error(
            service.sign_up("alice", "b@x.com", "longpassword1").await,
            AuthError::InvalidArgument,
        );
        assert_auth_error(
            service.sign_up("bob", "a@x.com", "longpassword1").await,
            AuthError::InvalidArgument,
        );
        assert_eq!(storage.session_count(), 1);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_login_look_the_same() {
        let (service, _) = service();
        service.sign_up("alice", "a@x.com", "longpassword1").await.unwrap();

        let wrong_password = service.login("alice", "wrongpassword").await.unwrap_err();
        let unknown_login = service.login("nobody", "longpassword1").await.unwrap_err();

        assert!(matches!(wrong_password, AppError::Auth(AuthError::InvalidArgument)));
        assert!(matches!(unknown_login, AppError::Auth(AuthError::InvalidArgument)));
        assert_eq!(wrong_password.to_string(), unknown_login.to_string());
    }

    #[tokio::test]
    async fn password_over_bcrypt_limit_is_rejected() {
        let (service, storage) = service();
        let long = format!("{}correct-horse", "a".repeat(MAX_PASSWORD_BYTES));

        assert_auth_error(
            service.sign_up("alice", "a@x.com", &long).await,
            AuthError::InvalidArgument,
        );
        assert!(storage.find_by_login("alice").await.is_err());
        assert_eq!(storage.session_count(), 0);
    }

    #[tokio::test]
    async fn login_does_not_match_on_shared_prefix() {
        let (service, storage) = service();
        let prefix = "a".repeat(MAX_PASSWORD_BYTES);
        service.sign_up("alice", "a@x.com", &prefix).await.unwrap();

        assert_auth_error(
            service.login("alice", &format!("{}totally-wrong", prefix)).await,
            AuthError::InvalidArgument,
        );
        assert!(service.login("alice", &prefix).await.is_ok());
        assert_eq!(storage.session_count(), 2);
    }

    #[tokio::test]
    async fn refresh_rotates_and_is_single_use() {
        let (service, storage) = service();
        let p1 = service.sign_up("alice", "a@x.com", "longpassword1").await.unwrap();
        let p2 = service.login("alice", "longpassword1").await.unwrap();

        let p3 = service.refresh_tokens(&p2.refresh.value).await.unwrap();

        assert_eq!(identity_of(&p3), identity_of(&p1));
        assert_ne!(p3.refresh.value, p2.refresh.value);
        assert_auth_error(
            service.refresh_tokens(&p2.refresh.value).await,
            AuthError::NoToken,
        );
        // P1 is untouched, P2 was replaced by P3
        assert_eq!(storage.session_count(), 2);
        assert!(service.refresh_tokens(&p3.refresh.value).await.is_ok());
    }

    #[tokio::test]
    async fn concurrent_refresh_succeeds_once() {
        let (service, _) = service();
        let pair = service.sign_up("alice", "a@x.com", "longpassword1").await.unwrap();

        let (first, second) = tokio::join!(
            service.refresh_tokens(&pair.refresh.value),
            service.refresh_tokens(&pair.refresh.value)
        );

        let successes = [&first, &second].iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        let failure = if first.is_err() { first } else { second };
        assert_auth_error(failure, AuthError::NoToken);
    }

    #[tokio::test]
    async fn expired_refresh_token_is_expired() {
        let (service, storage) = service();
        let access = jwt::issue_access(1, "alice", SECRET, Duration::seconds(60)).unwrap();
        let refresh = jwt::issue_refresh(SECRET, Duration::seconds(-60)).unwrap();
        storage.put(&refresh, &access).await.unwrap();

        assert_auth_error(service.refresh_tokens(&refresh).await, AuthError::Expired);
    }

    #[tokio::test]
    async fn never_issued_refresh_token_is_no_token() {
        let (service, _) = service();
        let stray = jwt::issue_refresh(SECRET, Duration::seconds(60)).unwrap();

        assert_auth_error(service.refresh_tokens(&stray).await, AuthError::NoToken);
        assert_auth_error(service.refresh_tokens("garbage").await, AuthError::NoToken);
    }

    #[tokio::test]
    async fn foreign_signature_is_no_token() {
        let (service, _) = service();
        let forged = jwt::issue_refresh(b"someone-elses-secret", Duration::seconds(60)).unwrap();

        assert_auth_error(service.refresh_tokens(&forged).await, AuthError::NoToken);
    }

    #[tokio::test]
    async fn identity_survives_an_expired_stored_access_token() {
        let (service, storage) = service();
        let access = jwt::issue_access(7, "frank", SECRET, Duration::seconds(-600)).unwrap();
        let refresh = jwt::issue_refresh(SECRET, Duration::seconds(600)).unwrap();
        storage.put(&refresh, &access).await.unwrap();

        let pair = service.refresh_tokens(&refresh).await.unwrap();

        assert_eq!(identity_of(&pair), (7, "frank".to_string()));
    }

    #[tokio::test]
    async fn unreadable_stored_access_token_is_internal() {
        let (service, storage) = service();
        let refresh = jwt::issue_refresh(SECRET, Duration::seconds(600)).unwrap();
        storage.put(&refresh, "not-a-token").await.unwrap();

        let err = service.refresh_tokens(&refresh).await.unwrap_err();

        assert!(matches!(err, AppError::Internal(_)));
    }

    #[tokio::test]
    async fn logout_invalidates_refresh_token() {
        let (service, storage) = service();
        let pair = service.sign_up("alice", "a@x.com", "longpassword1").await.unwrap();

        service.logout(&pair.refresh.value).await.unwrap();

        assert_eq!(storage.session_count(), 0);
        assert_auth_error(
            service.refresh_tokens(&pair.refresh.value).await,
            AuthError::NoToken,
        );
        assert_auth_error(service.logout(&pair.refresh.value).await, AuthError::NoToken);
    }

    #[tokio::test]
    async fn logout_accepts_expired_refresh_token() {
        let (service, storage) = service();
        let access = jwt::issue_access(1, "alice", SECRET, Duration::seconds(60)).unwrap();
        let refresh = jwt::issue_refresh(SECRET, Duration::seconds(-60)).unwrap();
        storage.put(&refresh, &access).await.unwrap();

        service.logout(&refresh).await.unwrap();

        assert_eq!(storage.session_count(), 0);
    }

    #[tokio::test]
    async fn empty_secret_is_internal_and_stores_nothing() {
        let storage = Arc::new(InMemoryStorage::new());
        let mut config = config();
        config.secret = Vec::new();
        let service = AuthService::new(storage.clone(), storage.clone(), config);

        let err = service.sign_up("alice", "a@x.com", "longpassword1").await.unwrap_err();

        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(storage.session_count(), 0);
    }

    /// Session store whose writes always fail
    struct BrokenSessions;

    #[async_trait]
    impl SessionStore for BrokenSessions {
        async fn put(&self, _: &str, _: &str) -> Result<(), DatabaseError> {
            Err(DatabaseError::QueryExecution("disk I/O error".to_string()))
        }

        async fn get(&self, _: &str) -> Result<String, DatabaseError> {
            Err(DatabaseError::ConnectionPool("pool is closed".to_string()))
        }

        async fn delete(&self, _: &str) -> Result<(), DatabaseError> {
            Err(DatabaseError::QueryExecution("disk I/O error".to_string()))
        }

        async fn rotate(&self, _: &str, _: &str, _: &str) -> Result<(), DatabaseError> {
            Err(DatabaseError::QueryExecution("disk I/O error".to_string()))
        }
    }

    /// Directory whose every call fails
    struct BrokenDirectory;

    #[async_trait]
    impl Directory for BrokenDirectory {
        async fn find_by_login(&self, _: &str) -> Result<User, DatabaseError> {
            Err(DatabaseError::ConnectionPool("pool is closed".to_string()))
        }

        async fn find_by_id(&self, _: i64) -> Result<User, DatabaseError> {
            Err(DatabaseError::ConnectionPool("pool is closed".to_string()))
        }

        async fn find_by_ids(&self, _: &[i64]) -> Result<Vec<User>, DatabaseError> {
            Err(DatabaseError::ConnectionPool("pool is closed".to_string()))
        }

        async fn insert(&self, _: &str, _: &str, _: &str) -> Result<i64, DatabaseError> {
            Err(DatabaseError::UnexpectedError("database is locked".to_string()))
        }
    }

    #[tokio::test]
    async fn session_write_failure_returns_no_pair() {
        let directory = Arc::new(InMemoryStorage::new());
        let service = AuthService::new(directory, Arc::new(BrokenSessions), config());

        let err = service.sign_up("alice", "a@x.com", "longpassword1").await.unwrap_err();

        assert!(matches!(err, AppError::Internal(_)));
    }

    #[tokio::test]
    async fn session_read_failure_is_internal() {
        let directory = Arc::new(InMemoryStorage::new());
        let service = AuthService::new(directory, Arc::new(BrokenSessions), config());
        let refresh = jwt::issue_refresh(SECRET, Duration::seconds(60)).unwrap();

        let err = service.refresh_tokens(&refresh).await.unwrap_err();

        assert!(matches!(err, AppError::Internal(_)));
    }

    #[tokio::test]
    async fn directory_failure_is_internal() {
        let sessions = Arc::new(InMemoryStorage::new());
        let service = AuthService::new(Arc::new(BrokenDirectory), sessions, config());

        let login = service.login("alice", "longpassword1").await.unwrap_err();
        let sign_up = service.sign_up("alice", "a@x.com", "longpassword1").await.unwrap_err();

        assert!(matches!(login, AppError::Internal(_)));
        assert!(matches!(sign_up, AppError::Internal(_)));
    }
}
