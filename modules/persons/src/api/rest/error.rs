use axum::http::StatusCode;
use modkit::ProblemResponse;

use crate::domain::error::DomainError;

/// Map domain error to RFC9457 ProblemResponse
pub fn map_domain_error(e: &DomainError, instance: &str) -> ProblemResponse {
    match e {
        DomainError::EmailAlreadyExists { email } => ProblemResponse::from_parts(
            StatusCode::CONFLICT,
            "PERSONS_EMAIL_CONFLICT",
            "Email already exists",
            format!("Email '{email}' is already in use"),
            instance,
        ),
        DomainError::Database { .. } => {
            // Log the internal error details but don't expose them to the client
            tracing::error!(error = ?e, "Database error occurred");
            ProblemResponse::from_parts(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_DB",
                "Internal error",
                "An internal database error occurred",
                instance,
            )
        }
    }
}

/// 404 for a person id that does not exist.
pub fn person_not_found(id: i32, instance: &str) -> ProblemResponse {
    ProblemResponse::from_parts(
        StatusCode::NOT_FOUND,
        "PERSONS_NOT_FOUND",
        "Person not found",
        format!("Person with id {id} was not found"),
        instance,
    )
}
