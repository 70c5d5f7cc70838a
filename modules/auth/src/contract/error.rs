use thiserror::Error;

/// Why a bearer token was not accepted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("missing bearer token")]
    Missing,

    #[error("authorization header must be 'Bearer <token>'")]
    Malformed,

    #[error("token has expired")]
    Expired,

    #[error("invalid token: {0}")]
    Invalid(String),
}
