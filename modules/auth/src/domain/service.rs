use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument};

use crate::contract::model::{IssuedToken, NewUser, User};
use crate::domain::error::DomainError;
use crate::domain::jwt::JwtKeys;
use crate::domain::password::{hash_password, verify_password};
use crate::domain::repo::{InsertError, NewUserRecord, UsersRepository};

/// Domain service for registration and login.
#[derive(Clone)]
pub struct Service {
    repo: Arc<dyn UsersRepository>,
    keys: Arc<JwtKeys>,
    config: ServiceConfig,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bcrypt_cost: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl Service {
    pub fn new(repo: Arc<dyn UsersRepository>, keys: Arc<JwtKeys>, config: ServiceConfig) -> Self {
        Self { repo, keys, config }
    }

    #[instrument(
        name = "auth.service.register",
        skip(self, new_user),
        fields(username = %new_user.username, role = %new_user.role)
    )]
    pub async fn register(&self, new_user: NewUser) -> Result<User, DomainError> {
        info!("Registering new user");

        let password_hash = hash_password(new_user.password, self.config.bcrypt_cost).await?;
        let record = NewUserRecord {
            username: new_user.username,
            password_hash,
            role: new_user.role,
            created_at: Utc::now(),
        };
        let username = record.username.clone();

        let user = self.repo.insert(record).await.map_err(|e| match e {
            InsertError::Duplicate => DomainError::username_taken(username),
            InsertError::Other(e) => DomainError::database(e.to_string()),
        })?;

        info!(user_id = user.id, "Successfully registered user");
        Ok(user)
    }

    /// Check credentials and issue an access token. Unknown users and wrong
    /// passwords both yield [`DomainError::InvalidCredentials`].
    #[instrument(name = "auth.service.login", skip_all, fields(username = %username))]
    pub async fn login(&self, username: &str, password: String) -> Result<IssuedToken, DomainError> {
        debug!("Attempting login");

        let Some(stored) = self
            .repo
            .find_by_username(username)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?
        else {
            debug!("Unknown username");
            return Err(DomainError::InvalidCredentials);
        };

        if !verify_password(password, stored.password_hash).await? {
            debug!("Password mismatch");
            return Err(DomainError::InvalidCredentials);
        }

        let issued = self.keys.issue(stored.user)?;
        info!(expires_at = %issued.expires_at, "Issued access token");
        Ok(issued)
    }
}
