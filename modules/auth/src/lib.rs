//! Authentication module: user accounts, password login and JWT bearer tokens.
//!
//! Other modules consume it through the [`contract`] types and the
//! [`AuthUser`] / [`AdminUser`] extractors. The verifier is published to the
//! `ClientHub` during `init`, so dependants must list `"auth"` in their deps.

use std::sync::Arc;

use modkit::RegistryBuilder;

// === PUBLIC CONTRACT ===
pub mod contract;
pub use contract::{client::TokenVerifier, error::TokenError, model};

pub mod module;
pub use module::Auth;

pub use api::rest::extract::{AdminUser, AuthUser};
pub use api::rest::routes::BEARER_SCHEME;

// === INTERNAL MODULES ===
// Exposed for tests only; depend on `contract` instead.
#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod config;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod infra;

pub const MODULE_NAME: &str = "auth";

/// Register the auth module as core, db and REST module.
pub fn register(b: &mut RegistryBuilder) {
    let module = Arc::new(Auth::default());
    b.register_core_with_meta(MODULE_NAME, &[], module.clone());
    b.register_db_with_meta(MODULE_NAME, module.clone());
    b.register_rest_with_meta(MODULE_NAME, module);
}
