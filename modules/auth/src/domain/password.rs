//! bcrypt hashing, run on the blocking pool so request workers stay free.

use crate::domain::error::DomainError;

pub async fn hash_password(password: String, cost: u32) -> Result<String, DomainError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| DomainError::password_hash(e.to_string()))?
        .map_err(|e| DomainError::password_hash(e.to_string()))
}

pub async fn verify_password(password: String, hash: String) -> Result<bool, DomainError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| DomainError::password_hash(e.to_string()))?
        .map_err(|e| DomainError::password_hash(e.to_string()))
}
