use sea_orm::DatabaseConnection;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::client_hub::ClientHub;

/// Source of the raw `modules.<name>` sections.
pub trait ConfigProvider: Send + Sync {
    fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value>;
}

/// What a module sees of the running server during every lifecycle phase.
#[derive(Clone)]
pub struct ModuleCtx {
    pub(crate) db: Option<DatabaseConnection>,
    pub(crate) config_provider: Option<Arc<dyn ConfigProvider>>,
    pub(crate) client_hub: Arc<ClientHub>,
    pub(crate) cancellation_token: CancellationToken,
    pub(crate) module_name: Option<Arc<str>>,
}

/// Builds the base context the registry scopes per module.
/// Also used directly by tests that drive a single module.
pub struct ModuleCtxBuilder {
    inner: ModuleCtx,
}

impl ModuleCtxBuilder {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            inner: ModuleCtx {
                db: None,
                config_provider: None,
                client_hub: Arc::new(ClientHub::default()),
                cancellation_token: token,
                module_name: None,
            },
        }
    }

    pub fn with_db(mut self, db: DatabaseConnection) -> Self {
        self.inner.db = Some(db);
        self
    }

    pub fn with_config_provider(mut self, p: Arc<dyn ConfigProvider>) -> Self {
        self.inner.config_provider = Some(p);
        self
    }

    pub fn with_client_hub(mut self, hub: Arc<ClientHub>) -> Self {
        self.inner.client_hub = hub;
        self
    }

    /// Scope the built context to `name` up front.
    pub fn for_module(mut self, name: &str) -> Self {
        self.inner.module_name = Some(Arc::<str>::from(name));
        self
    }

    pub fn build(self) -> ModuleCtx {
        self.inner
    }
}

impl ModuleCtx {
    pub(crate) fn for_module(mut self, name: &str) -> Self {
        self.module_name = Some(Arc::<str>::from(name));
        self
    }

    /// Shared connection pool; cloning is cheap.
    pub fn db(&self) -> Option<DatabaseConnection> {
        self.db.clone()
    }

    pub fn db_required(&self) -> anyhow::Result<DatabaseConnection> {
        let name = self.current_module().unwrap_or("<unscoped>");
        self.db()
            .ok_or_else(|| anyhow::anyhow!("module '{name}' requires a database, none configured"))
    }

    pub fn client_hub(&self) -> Arc<ClientHub> {
        self.client_hub.clone()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation_token
    }

    pub fn current_module(&self) -> Option<&str> {
        self.module_name.as_deref()
    }

    /// The module's section as `T`. A missing section yields `T::default()`;
    /// a section that does not deserialize is an error, so a typo never
    /// silently replaces configured values with defaults.
    pub fn module_config<T: DeserializeOwned + Default>(&self) -> anyhow::Result<T> {
        let (Some(name), Some(provider)) = (self.current_module(), &self.config_provider) else {
            return Ok(T::default());
        };
        match provider.get_module_config(name) {
            None => Ok(T::default()),
            Some(val) => serde_json::from_value(val.clone())
                .map_err(|e| anyhow::anyhow!("invalid {name} config: {e}")),
        }
    }
}
