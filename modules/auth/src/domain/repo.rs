use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::contract::model::{Role, User};

/// A user row together with its password hash; never leaves the domain.
#[derive(Debug, Clone)]
pub struct StoredUser {
    pub user: User,
    pub password_hash: String,
}

/// Fully-formed account ready to persist. The id is assigned by the database.
#[derive(Debug, Clone)]
pub struct NewUserRecord {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum InsertError {
    #[error("username already exists")]
    Duplicate,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Port for the domain layer: persistence operations the domain needs.
#[async_trait]
pub trait UsersRepository: Send + Sync {
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<StoredUser>>;
    /// Insert and return the stored user. A taken username yields
    /// [`InsertError::Duplicate`].
    async fn insert(&self, new_user: NewUserRecord) -> Result<User, InsertError>;
}
