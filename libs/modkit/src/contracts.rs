use async_trait::async_trait;
use axum::Router;
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;

use crate::context::ModuleCtx;

pub use crate::api::openapi::OpenApiRegistry;

/// Every module has a core. `init` builds services and publishes clients to
/// the hub; tables may not exist yet.
#[async_trait]
pub trait Module: Send + Sync + 'static {
    async fn init(&self, ctx: &ModuleCtx) -> anyhow::Result<()>;
    fn as_any(&self) -> &dyn std::any::Any;
}

/// Owns part of the schema. Runs after every `init` and before any route
/// is mounted.
#[async_trait]
pub trait DbModule: Send + Sync {
    async fn migrate(&self, db: &DatabaseConnection) -> anyhow::Result<()>;
}

/// Contributes routes plus an OpenAPI document describing them.
pub trait RestfulModule: Send + Sync {
    fn register_rest(
        &self,
        ctx: &ModuleCtx,
        router: Router,
        openapi: &dyn OpenApiRegistry,
    ) -> anyhow::Result<Router>;
}

/// The one module that owns the HTTP listener. It brackets the other REST
/// modules: `rest_prepare` before them, `rest_finalize` after, and keeps the
/// finished router to serve from `StatefulModule::start`.
pub trait RestHostModule: Send + Sync + 'static {
    fn rest_prepare(&self, ctx: &ModuleCtx, router: Router) -> anyhow::Result<Router>;

    fn rest_finalize(&self, ctx: &ModuleCtx, router: Router) -> anyhow::Result<Router>;

    fn as_registry(&self) -> &dyn OpenApiRegistry;
}

/// Background work tied to the process: started after the REST phase,
/// stopped in reverse order once `cancel` fires.
#[async_trait]
pub trait StatefulModule: Send + Sync {
    async fn start(&self, cancel: CancellationToken) -> anyhow::Result<()>;
    async fn stop(&self, cancel: CancellationToken) -> anyhow::Result<()>;
}
