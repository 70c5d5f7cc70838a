use crate::contract::error::TokenError;
use crate::contract::model::Principal;

/// Validates bearer tokens issued by the auth module.
///
/// Published to the `ClientHub` as `dyn TokenVerifier`; REST modules attach
/// it to their routers so [`crate::AuthUser`] can resolve the caller.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<Principal, TokenError>;
}
