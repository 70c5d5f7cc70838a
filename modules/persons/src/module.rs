use std::sync::Arc;

use async_trait::async_trait;
use auth::TokenVerifier;
use modkit::{DbModule, Module, ModuleCtx, OpenApiRegistry, RestfulModule};
use parking_lot::RwLock;
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tracing::{debug, info};

use crate::api::rest::routes;
use crate::config::PersonsConfig;
use crate::domain::service::{Service, ServiceConfig};
use crate::infra::storage::sea_orm_repo::SeaOrmPersonsRepository;

struct Wiring {
    service: Arc<Service>,
    verifier: Arc<dyn TokenVerifier>,
}

#[derive(Default)]
pub struct Persons {
    wiring: RwLock<Option<Wiring>>,
}

#[async_trait]
impl Module for Persons {
    async fn init(&self, ctx: &ModuleCtx) -> anyhow::Result<()> {
        info!("Initializing persons module");

        let cfg: PersonsConfig = ctx.module_config()?;
        debug!(
            "Loaded persons config: default_page_size={}, max_page_size={}",
            cfg.default_page_size, cfg.max_page_size
        );

        let db = ctx.db_required()?;
        let repo = SeaOrmPersonsRepository::new(db);
        let service = Service::new(
            Arc::new(repo),
            ServiceConfig {
                default_page_size: cfg.default_page_size,
                max_page_size: cfg.max_page_size,
            },
        );

        // Provided by the auth module, which initializes first.
        let verifier = ctx.client_hub().get::<dyn TokenVerifier>()?;

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
impl DbModule for Persons {
    async fn migrate(&self, db: &DatabaseConnection) -> anyhow::Result<()> {
        info!("Running persons database migrations");
        crate::infra::storage::migrations::Migrator::up(db, None).await?;
        Ok(())
    }
}

impl RestfulModule for Persons {
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
                .ok_or_else(|| anyhow::anyhow!("persons module not initialized"))?;
            (w.service.clone(), w.verifier.clone())
        };

        let router = routes::register_routes(router, openapi, service, verifier)?;
        info!("Persons REST routes registered");
        Ok(router)
    }
}
