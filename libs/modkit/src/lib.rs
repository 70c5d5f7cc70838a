//! # ModKit - Modular Service Kit
//!
//! Small framework the persons server is assembled from. A module declares its
//! capabilities by implementing the contracts and registering itself with a
//! [`RegistryBuilder`]:
//!
//! - **core** ([`Module`]): wiring, services, client registration
//! - **db** ([`DbModule`]): schema migrations
//! - **rest** ([`RestfulModule`]): routes and OpenAPI documents
//! - **rest_host** ([`RestHostModule`]): the single HTTP ingress
//! - **stateful** ([`StatefulModule`]): background work bound to the process lifetime
//!
//! Phases run in dependency order: init → db → rest → start → (wait) → stop.
//!
//! ## Example
//!
//! ```rust,ignore
//! pub fn register(b: &mut modkit::RegistryBuilder) {
//!     let m = std::sync::Arc::new(PersonsModule::default());
//!     b.register_core_with_meta("persons", &["auth"], m.clone());
//!     b.register_db_with_meta("persons", m.clone());
//!     b.register_rest_with_meta("persons", m);
//! }
//! ```

pub use anyhow::Result;
pub use async_trait::async_trait;

pub mod api;
pub mod client_hub;
pub mod context;
pub mod contracts;
pub mod registry;
pub mod runtime;

pub use api::openapi::{OpenApiCollector, OpenApiRegistry};
pub use api::pagination::{Page, PageRequest};
pub use api::problem::{Problem, ProblemResponse, ValidationError};
pub use api::validated::{ValidatedJson, ValidatedQuery};
pub use client_hub::ClientHub;
pub use context::{ConfigProvider, ModuleCtx, ModuleCtxBuilder};
pub use contracts::*;
pub use registry::{ModuleRegistry, Registrator, RegistryBuilder, RegistryError};
pub use runtime::{run, DbOptions, RunOptions, ShutdownOptions};
