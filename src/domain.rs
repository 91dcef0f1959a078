/// Domain models shared by the orchestrator, storage backends and routes.

/// A directory entry. Created by sign-up and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub login: String,
    pub email: String,
    /// bcrypt hash string; opaque outside `auth::password`
    pub password_hash: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
}

impl Token {
    pub fn access(value: String) -> Self {
        Self { kind: TokenKind::Access, value }
    }

    pub fn refresh(value: String) -> Self {
        Self { kind: TokenKind::Refresh, value }
    }
}

/// Access and refresh token issued (and stored) together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokensPair {
    pub access: Token,
    pub refresh: Token,
}

/// Identity claims carried by an access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub login: String,
}
