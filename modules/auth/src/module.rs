use std::sync::Arc;

use async_trait::async_trait;
use modkit::{DbModule, Module, ModuleCtx, OpenApiRegistry, RestfulModule};
use parking_lot::RwLock;
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tracing::{debug, info};

use crate::api::rest::routes;
use crate::config::AuthConfig;
use crate::contract::client::TokenVerifier;
use crate::domain::jwt::JwtKeys;
use crate::domain::service::{Service, ServiceConfig};
use crate::infra::storage::sea_orm_repo::SeaOrmUsersRepository;

/// Wired state, available after `init`.
struct Wiring {
    service: Arc<Service>,
    verifier: Arc<dyn TokenVerifier>,
}

#[derive(Default)]
pub struct Auth {
    wiring: RwLock<Option<Wiring>>,
}

#[async_trait]
impl Module for Auth {
    async fn init(&self, ctx: &ModuleCtx) -> anyhow::Result<()> {
        info!("Initializing auth module");

        let cfg: AuthConfig = ctx.module_config()?;
        debug!(config = ?cfg, "Loaded auth config");

        let db = ctx.db_required()?;
        let keys = Arc::new(JwtKeys::new(&cfg));
        let repo = SeaOrmUsersRepository::new(db);
        let service = Service::new(
            Arc::new(repo),
            keys.clone(),
            ServiceConfig {
                bcrypt_cost: cfg.bcrypt_cost,
            },
        );

        let verifier: Arc<dyn TokenVerifier> = keys;
        ctx.client_hub()
            .register::<dyn TokenVerifier>(verifier.clone());
        info!("TokenVerifier exposed to ClientHub");

        *self.wiring.write() = Some(Wiring {
            service: Arc::new(service),
            verifier,
        });
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[async_trait]
impl DbModule for Auth {
    async fn migrate(&self, db: &DatabaseConnection) -> anyhow::Result<()> {
        info!("Running auth database migrations");
        crate::infra::storage::migrations::Migrator::up(db, None).await?;
        Ok(())
    }
}

impl RestfulModule for Auth {
    fn register_rest(
        &self,
        _ctx: &ModuleCtx,
        router: axum::Router,
        openapi: &dyn OpenApiRegistry,
    ) -> anyhow::Result<axum::Router> {
        let (service, verifier) = {
            let guard = self.wiring.read();
            let w = guard
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("auth module not initialized"))?;
            (w.service.clone(), w.verifier.clone())
        };

        let router = routes::register_routes(router, openapi, service, verifier)?;
        info!("Auth REST routes registered");
        Ok(router)
    }
}
