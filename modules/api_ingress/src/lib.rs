//! API ingress: the single REST host. Collects routes and OpenAPI documents
//! from REST modules, wraps them in the global middleware stack and serves
//! them until the runtime cancels.

use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{http::StatusCode, middleware::from_fn, routing::get, Router};
use modkit::{OpenApiCollector, OpenApiRegistry, RegistryBuilder};
use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
};

mod config;
pub mod request_id;
mod web;

pub use config::ApiIngressConfig;

pub const MODULE_NAME: &str = "api_ingress";

/// How long `stop` waits for in-flight requests after cancellation.
const STOP_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ApiIngress {
    config: RwLock<ApiIngressConfig>,
    openapi: OpenApiCollector,
    // Finalized router from the REST phase, taken by `start`
    final_router: Mutex<Option<Router>>,
    server: Mutex<Option<JoinHandle<Result<()>>>>,
}

impl Default for ApiIngress {
    fn default() -> Self {
        Self::new(ApiIngressConfig::default())
    }
}

impl ApiIngress {
    pub fn new(config: ApiIngressConfig) -> Self {
        Self {
            config: RwLock::new(config),
            openapi: OpenApiCollector::new("Persons Service API", env!("CARGO_PKG_VERSION")),
            final_router: Mutex::new(None),
            server: Mutex::new(None),
        }
    }

    pub fn get_config(&self) -> ApiIngressConfig {
        self.config.read().clone()
    }

    /// Wrap `router` in the global middleware stack.
    ///
    /// Layers are applied innermost first, so a request passes through
    /// SetRequestId → PropagateRequestId → Trace → request id extension →
    /// CORS → Timeout → BodyLimit → handler.
    pub fn apply_middleware(router: Router, cfg: &ApiIngressConfig) -> Router {
        let x_request_id = request_id::header();

        let mut router = router
            .layer(RequestBodyLimitLayer::new(cfg.body_limit_bytes))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                Duration::from_secs(cfg.request_timeout_sec),
            ));

        if cfg.cors_enabled {
            router = router.layer(CorsLayer::permissive());
        }

        router
            .layer(from_fn(request_id::push_req_id_to_extensions))
            .layer(request_id::create_trace_layer())
            .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
            .layer(SetRequestIdLayer::new(x_request_id, request_id::MakeReqId))
    }

    /// Merged OpenAPI document of every module registered so far.
    pub fn openapi(&self) -> utoipa::openapi::OpenApi {
        self.openapi.build()
    }
}

#[async_trait]
impl modkit::Module for ApiIngress {
    async fn init(&self, ctx: &modkit::ModuleCtx) -> Result<()> {
        let cfg = ctx.module_config::<ApiIngressConfig>()?;
        tracing::debug!(bind_addr = %cfg.bind_addr, cors = cfg.cors_enabled, "api_ingress configured");
        *self.config.write() = cfg;
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl modkit::contracts::RestHostModule for ApiIngress {
    fn rest_prepare(&self, _ctx: &modkit::ModuleCtx, router: Router) -> Result<Router> {
        Ok(router.route("/health", get(web::health_check)))
    }

    fn rest_finalize(&self, _ctx: &modkit::ModuleCtx, mut router: Router) -> Result<Router> {
        let cfg = self.get_config();

        if cfg.enable_docs {
            let doc = self.openapi.build();
            tracing::info!(paths = doc.paths.paths.len(), "Serving OpenAPI document");
            let doc = Arc::new(serde_json::to_value(&doc)?);
            router = router.route(
                "/openapi.json",
                get(move || web::openapi_json(doc.clone())),
            );
        }

        let router = Self::apply_middleware(router, &cfg);
        *self.final_router.lock() = Some(router.clone());
        Ok(router)
    }

    fn as_registry(&self) -> &dyn OpenApiRegistry {
        &self.openapi
    }
}

#[async_trait]
impl modkit::contracts::StatefulModule for ApiIngress {
    /// Bind the listener, then serve in the background until `cancel` fires.
    async fn start(&self, cancel: CancellationToken) -> Result<()> {
        let cfg = self.get_config();
        let addr: SocketAddr = cfg
            .bind_addr
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid bind address '{}': {}", cfg.bind_addr, e))?;

        let router = self
            .final_router
            .lock()
            .take()
            .unwrap_or_else(|| Self::apply_middleware(Router::new(), &cfg));

        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("HTTP server bound on {}", listener.local_addr()?);

        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    cancel.cancelled().await;
                    tracing::info!("HTTP server shutting down gracefully (cancellation)");
                })
                .await
                .map_err(anyhow::Error::from)
        });
        *self.server.lock() = Some(handle);
        Ok(())
    }

    async fn stop(&self, cancel: CancellationToken) -> Result<()> {
        cancel.cancel();
        let Some(handle) = self.server.lock().take() else {
            return Ok(());
        };
        match tokio::time::timeout(STOP_TIMEOUT, handle).await {
            Ok(joined) => joined?,
            Err(_) => anyhow::bail!("HTTP server did not stop within {:?}", STOP_TIMEOUT),
        }
    }
}

/// Register the ingress as core, REST host and stateful module.
pub fn register(b: &mut RegistryBuilder) {
    let module = Arc::new(ApiIngress::default());
    b.register_core_with_meta(MODULE_NAME, &[], module.clone());
    b.register_rest_host_with_meta(MODULE_NAME, module.clone());
    b.register_stateful_with_meta(MODULE_NAME, module);
}
