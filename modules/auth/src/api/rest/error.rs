use axum::http::StatusCode;
use modkit::ProblemResponse;

use crate::domain::error::DomainError;

/// Map domain error to RFC9457 ProblemResponse
pub fn map_domain_error(e: &DomainError, instance: &str) -> ProblemResponse {
    match e {
        DomainError::UsernameTaken { username } => ProblemResponse::from_parts(
            StatusCode::CONFLICT,
            "AUTH_USERNAME_CONFLICT",
            "Username already exists",
            format!("Username '{username}' is already taken"),
            instance,
        ),
        DomainError::InvalidCredentials => ProblemResponse::from_parts(
            StatusCode::UNAUTHORIZED,
            "AUTH_INVALID_CREDENTIALS",
            "Unauthorized",
            "Invalid username or password",
            instance,
        ),
        DomainError::Token { message } => ProblemResponse::from_parts(
            StatusCode::UNAUTHORIZED,
            "UNAUTHORIZED",
            "Unauthorized",
            message.clone(),
            instance,
        ),
        DomainError::PasswordHash { .. } | DomainError::Database { .. } => {
            // Details stay in the log
            tracing::error!(error = ?e, "Internal auth error");
            ProblemResponse::from_parts(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL",
                "Internal error",
                "An internal error occurred",
                instance,
            )
        }
    }
}
