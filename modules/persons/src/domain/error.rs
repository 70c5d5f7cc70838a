use thiserror::Error;

/// Domain-specific errors. Absence is not an error: lookups return
/// `Option`/`bool` sentinels instead.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Person with email '{email}' already exists")]
    EmailAlreadyExists { email: String },

    #[error("Database error: {message}")]
    Database { message: String },
}

impl DomainError {
    pub fn email_already_exists(email: impl Into<String>) -> Self {
        Self::EmailAlreadyExists {
            email: email.into(),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }
}
