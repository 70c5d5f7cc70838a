//! ModKit runtime runner.
//!
//! One stable base `ModuleCtx` is built and reused across all phases
//! (init → db → rest → start → wait → stop). Shutdown can be driven by OS
//! signals, an external `CancellationToken`, or an arbitrary future.

use crate::client_hub::ClientHub;
use crate::context::{ConfigProvider, ModuleCtxBuilder};
use crate::registry::{ModuleRegistry, Registrator};
use crate::runtime::shutdown;
use sea_orm::DatabaseConnection;
use std::{future::Future, pin::Pin, sync::Arc};
use tokio_util::sync::CancellationToken;

/// How the runtime should provide a database to modules.
pub enum DbOptions {
    /// No database integration. `ModuleCtx::db()` will be `None`.
    None,
    /// Shared SeaORM connection pool; the db phase runs module migrations against it.
    Connection(DatabaseConnection),
}

/// How the runtime should decide when to stop.
pub enum ShutdownOptions {
    /// Listen for OS signals (Ctrl+C / SIGTERM).
    Signals,
    /// An external `CancellationToken` controls the lifecycle.
    Token(CancellationToken),
    /// An arbitrary future; when it completes, we initiate shutdown.
    Future(Pin<Box<dyn Future<Output = ()> + Send>>),
}

pub struct RunOptions {
    /// Provider of module config sections (raw JSON by module name).
    pub modules_cfg: Arc<dyn ConfigProvider>,
    pub db: DbOptions,
    pub shutdown: ShutdownOptions,
    /// Module registration hooks, one per module crate.
    pub modules: Vec<Registrator>,
}

/// Turn the shutdown option into the token every phase observes.
fn arm_shutdown(shutdown: ShutdownOptions) -> CancellationToken {
    let cancel = match &shutdown {
        ShutdownOptions::Token(t) => return t.clone(),
        _ => CancellationToken::new(),
    };
    let trigger = cancel.clone();

    match shutdown {
        ShutdownOptions::Signals => {
            tokio::spawn(async move {
                match shutdown::wait_for_shutdown().await {
                    Ok(signal) => tracing::info!(signal, "shutdown requested"),
                    Err(e) => {
                        tracing::warn!(error = %e, "signal handlers unavailable, waiting for ctrl-c");
                        let _ = tokio::signal::ctrl_c().await;
                    }
                }
                trigger.cancel();
            });
        }
        ShutdownOptions::Future(waiter) => {
            tokio::spawn(async move {
                waiter.await;
                tracing::info!("shutdown requested by external future");
                trigger.cancel();
            });
        }
        ShutdownOptions::Token(_) => {}
    }
    cancel
}

/// Full cycle: init → db → rest (sync) → start → wait → stop.
pub async fn run(opts: RunOptions) -> anyhow::Result<()> {
    let RunOptions {
        modules_cfg,
        db,
        shutdown,
        modules,
    } = opts;

    let cancel = arm_shutdown(shutdown);
    let registry = ModuleRegistry::from_registrators(&modules)?;

    let db = match db {
        DbOptions::Connection(conn) => Some(conn),
        DbOptions::None => None,
    };

    let mut ctx = ModuleCtxBuilder::new(cancel.clone())
        .with_client_hub(Arc::new(ClientHub::default()))
        .with_config_provider(modules_cfg);
    if let Some(conn) = &db {
        ctx = ctx.with_db(conn.clone());
    }
    let ctx = ctx.build();

    tracing::info!(phase = "init", "running lifecycle phase");
    registry.run_init_phase(&ctx).await?;

    if let Some(conn) = &db {
        tracing::info!(phase = "db", "running lifecycle phase");
        registry.run_db_phase(conn).await?;
    }

    // The REST host keeps the finished router for its start phase.
    tracing::info!(phase = "rest", "running lifecycle phase");
    let _router = registry.run_rest_phase(&ctx, axum::Router::new())?;

    tracing::info!(phase = "start", "running lifecycle phase");
    registry.run_start_phase(cancel.clone()).await?;

    cancel.cancelled().await;

    tracing::info!(phase = "stop", "running lifecycle phase");
    registry.run_stop_phase(cancel).await?;
    Ok(())
}
