//! Persons module: CRUD over person records plus filtered, sorted and
//! paginated search.

use std::sync::Arc;

use modkit::RegistryBuilder;

// === PUBLIC CONTRACT ===
pub mod contract;
pub use contract::{model, search};

pub mod module;
pub use module::Persons;

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

pub const MODULE_NAME: &str = "persons";

/// Register the persons module. Depends on `auth` for the token verifier.
pub fn register(b: &mut RegistryBuilder) {
    let module = Arc::new(Persons::default());
    b.register_core_with_meta(MODULE_NAME, &[auth::MODULE_NAME], module.clone());
    b.register_db_with_meta(MODULE_NAME, module.clone());
    b.register_rest_with_meta(MODULE_NAME, module);
}
