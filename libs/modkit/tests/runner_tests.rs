//! Lifecycle tests for the ModKit runner: phase ordering, dependency order,
//! shutdown strategies and error propagation.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use parking_lot::Mutex;
use sea_orm::{Database, DatabaseConnection};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use modkit::{
    context::{ConfigProvider, ModuleCtx},
    contracts::{DbModule, Module, OpenApiRegistry, RestHostModule, RestfulModule, StatefulModule},
    registry::RegistryBuilder,
    runtime::{run, DbOptions, RunOptions, ShutdownOptions},
    OpenApiCollector,
};

type Calls = Mutex<Vec<String>>;

struct EmptyConfig;

impl ConfigProvider for EmptyConfig {
    fn get_module_config(&self, _module_name: &str) -> Option<&serde_json::Value> {
        None
    }
}

struct Tracked {
    name: &'static str,
    calls: &'static Calls,
    fail_init: bool,
    openapi: OpenApiCollector,
}

impl Tracked {
    fn new(name: &'static str, calls: &'static Calls) -> Arc<Self> {
        Arc::new(Self {
            name,
            calls,
            fail_init: false,
            openapi: OpenApiCollector::default(),
        })
    }

    fn record(&self, phase: &str) {
        self.calls.lock().push(format!("{}.{}", self.name, phase));
    }
}

#[async_trait::async_trait]
impl Module for Tracked {
    async fn init(&self, ctx: &ModuleCtx) -> anyhow::Result<()> {
        assert_eq!(ctx.current_module(), Some(self.name));
        self.record("init");
        if self.fail_init {
            anyhow::bail!("init failed for {}", self.name);
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[async_trait::async_trait]
impl DbModule for Tracked {
    async fn migrate(&self, _db: &DatabaseConnection) -> anyhow::Result<()> {
        self.record("migrate");
        Ok(())
    }
}

impl RestfulModule for Tracked {
    fn register_rest(
        &self,
        _ctx: &ModuleCtx,
        router: Router,
        _openapi: &dyn OpenApiRegistry,
    ) -> anyhow::Result<Router> {
        self.record("register_rest");
        Ok(router)
    }
}

impl RestHostModule for Tracked {
    fn rest_prepare(&self, _ctx: &ModuleCtx, router: Router) -> anyhow::Result<Router> {
        self.record("rest_prepare");
        Ok(router)
    }

    fn rest_finalize(&self, _ctx: &ModuleCtx, router: Router) -> anyhow::Result<Router> {
        self.record("rest_finalize");
        Ok(router)
    }

    fn as_registry(&self) -> &dyn OpenApiRegistry {
        &self.openapi
    }
}

#[async_trait::async_trait]
impl StatefulModule for Tracked {
    async fn start(&self, _cancel: CancellationToken) -> anyhow::Result<()> {
        self.record("start");
        Ok(())
    }

    async fn stop(&self, _cancel: CancellationToken) -> anyhow::Result<()> {
        self.record("stop");
        Ok(())
    }
}

fn options(db: DbOptions, shutdown: ShutdownOptions, modules: Vec<modkit::Registrator>) -> RunOptions {
    RunOptions {
        modules_cfg: Arc::new(EmptyConfig),
        db,
        shutdown,
        modules,
    }
}

static LIFECYCLE: Calls = Mutex::new(Vec::new());

fn register_lifecycle(b: &mut RegistryBuilder) {
    // Registered before its dependency on purpose.
    let svc = Tracked::new("svc", &LIFECYCLE);
    b.register_core_with_meta("svc", &["host"], svc.clone());
    b.register_db_with_meta("svc", svc.clone());
    b.register_rest_with_meta("svc", svc);

    let host = Tracked::new("host", &LIFECYCLE);
    b.register_core_with_meta("host", &[], host.clone());
    b.register_rest_host_with_meta("host", host.clone());
    b.register_stateful_with_meta("host", host);
}

#[tokio::test]
async fn phases_run_in_dependency_order() {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    let cancel = CancellationToken::new();

    let handle = tokio::spawn(run(options(
        DbOptions::Connection(db),
        ShutdownOptions::Token(cancel.clone()),
        vec![register_lifecycle as modkit::Registrator],
    )));

    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();

    let result = timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    assert!(result.is_ok(), "{result:?}");

    let calls = LIFECYCLE.lock().clone();
    assert_eq!(
        calls,
        vec![
            "host.init",
            "svc.init",
            "svc.migrate",
            "host.rest_prepare",
            "svc.register_rest",
            "host.rest_finalize",
            "host.start",
            "host.stop",
        ]
    );
}

static FAILING: Calls = Mutex::new(Vec::new());

fn register_failing(b: &mut RegistryBuilder) {
    let broken = Arc::new(Tracked {
        name: "broken",
        calls: &FAILING,
        fail_init: true,
        openapi: OpenApiCollector::default(),
    });
    b.register_core_with_meta("broken", &[], broken.clone());
    b.register_stateful_with_meta("broken", broken);
}

#[tokio::test]
async fn init_failure_aborts_before_start() {
    let result = timeout(
        Duration::from_secs(1),
        run(options(
            DbOptions::None,
            ShutdownOptions::Token(CancellationToken::new()),
            vec![register_failing as modkit::Registrator],
        )),
    )
    .await
    .unwrap();

    let err = result.unwrap_err();
    assert!(err.to_string().contains("initialization failed for module 'broken'"));
    assert_eq!(FAILING.lock().clone(), vec!["broken.init"]);
}

#[tokio::test]
async fn shutdown_via_future() {
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let handle = tokio::spawn(run(options(
        DbOptions::None,
        ShutdownOptions::Future(Box::pin(async move {
            let _ = rx.await;
        })),
        vec![],
    )));

    tokio::time::sleep(Duration::from_millis(10)).await;
    let _ = tx.send(());

    let result = timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn pre_cancelled_token_returns_immediately() {
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = timeout(
        Duration::from_millis(200),
        run(options(DbOptions::None, ShutdownOptions::Token(cancel), vec![])),
    )
    .await;
    assert!(matches!(result, Ok(Ok(()))));
}
