//! Module registry: collects what each module crate registers, orders modules
//! so dependencies come first and drives the lifecycle phases.

use axum::Router;
use sea_orm::DatabaseConnection;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::context::ModuleCtx;
use crate::contracts::{DbModule, Module, RestHostModule, RestfulModule, StatefulModule};

/// Registration hook every module crate exports (`pub fn register(&mut RegistryBuilder)`).
pub type Registrator = fn(&mut RegistryBuilder);

/// Optional capabilities a module adds on top of its core.
#[derive(Default)]
struct Capabilities {
    rest: Option<Arc<dyn RestfulModule>>,
    rest_host: Option<Arc<dyn RestHostModule>>,
    db: Option<Arc<dyn DbModule>>,
    stateful: Option<Arc<dyn StatefulModule>>,
}

pub struct ModuleEntry {
    pub name: &'static str,
    pub deps: &'static [&'static str],
    pub core: Arc<dyn Module>,
    pub rest: Option<Arc<dyn RestfulModule>>,
    pub rest_host: Option<Arc<dyn RestHostModule>>,
    pub db: Option<Arc<dyn DbModule>>,
    pub stateful: Option<Arc<dyn StatefulModule>>,
}

impl fmt::Debug for ModuleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut caps = Vec::new();
        for (present, label) in [
            (self.rest.is_some(), "rest"),
            (self.rest_host.is_some(), "rest_host"),
            (self.db.is_some(), "db"),
            (self.stateful.is_some(), "stateful"),
        ] {
            if present {
                caps.push(label);
            }
        }
        f.debug_struct("ModuleEntry")
            .field("name", &self.name)
            .field("deps", &self.deps)
            .field("capabilities", &caps)
            .finish()
    }
}

/// Modules in dependency order; every phase walks them front to back
/// (stop walks back to front).
pub struct ModuleRegistry {
    modules: Vec<ModuleEntry>,
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.modules.iter().map(|m| m.name))
            .finish()
    }
}

impl ModuleRegistry {
    pub fn modules(&self) -> &[ModuleEntry] {
        &self.modules
    }

    pub fn from_registrators(registrators: &[Registrator]) -> Result<Self, RegistryError> {
        let mut builder = RegistryBuilder::default();
        for register in registrators {
            register(&mut builder);
        }
        builder.build_topo_sorted()
    }

    pub fn get_module(&self, name: &str) -> Option<Arc<dyn Module>> {
        self.modules
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.core.clone())
    }

    pub async fn run_init_phase(&self, base_ctx: &ModuleCtx) -> Result<(), RegistryError> {
        for e in &self.modules {
            tracing::debug!(module = e.name, "init");
            let ctx = base_ctx.clone().for_module(e.name);
            e.core.init(&ctx).await.map_err(|source| RegistryError::Init {
                module: e.name,
                source,
            })?;
        }
        Ok(())
    }

    pub async fn run_db_phase(&self, db: &DatabaseConnection) -> Result<(), RegistryError> {
        for (name, m) in self.with(|e| e.db.as_ref()) {
            tracing::debug!(module = name, "migrate");
            m.migrate(db)
                .await
                .map_err(|source| RegistryError::DbMigrate { module: name, source })?;
        }
        Ok(())
    }

    /// Host prepares the router, every REST module adds its routes and
    /// documents, then the host finalizes. Exactly one host is required once
    /// any module exposes routes.
    pub fn run_rest_phase(
        &self,
        base_ctx: &ModuleCtx,
        router: Router,
    ) -> Result<Router, RegistryError> {
        let hosts: Vec<_> = self.with(|e| e.rest_host.as_ref()).collect();
        let (host_name, host) = match hosts.as_slice() {
            [] if self.with(|e| e.rest.as_ref()).next().is_some() => {
                return Err(RegistryError::RestRequiresHost)
            }
            [] => return Ok(router),
            [single] => *single,
            _ => return Err(RegistryError::MultipleRestHosts),
        };

        let host_ctx = base_ctx.clone().for_module(host_name);
        let mut router = host
            .rest_prepare(&host_ctx, router)
            .map_err(|source| RegistryError::RestPrepare {
                module: host_name,
                source,
            })?;

        for (name, rest) in self.with(|e| e.rest.as_ref()) {
            let ctx = base_ctx.clone().for_module(name);
            router = rest
                .register_rest(&ctx, router, host.as_registry())
                .map_err(|source| RegistryError::RestRegister { module: name, source })?;
        }

        host.rest_finalize(&host_ctx, router)
            .map_err(|source| RegistryError::RestFinalize {
                module: host_name,
                source,
            })
    }

    pub async fn run_start_phase(&self, cancel: CancellationToken) -> Result<(), RegistryError> {
        for (name, m) in self.with(|e| e.stateful.as_ref()) {
            m.start(cancel.clone())
                .await
                .map_err(|source| RegistryError::Start { module: name, source })?;
        }
        Ok(())
    }

    /// Reverse order. A failing module is logged and the rest still stop.
    pub async fn run_stop_phase(&self, cancel: CancellationToken) -> Result<(), RegistryError> {
        let stateful: Vec<_> = self.with(|e| e.stateful.as_ref()).collect();
        for (name, m) in stateful.into_iter().rev() {
            if let Err(err) = m.stop(cancel.clone()).await {
                tracing::warn!(module = name, error = %err, "Failed to stop module");
            }
        }
        Ok(())
    }

    /// Modules carrying the capability selected by `pick`, in phase order.
    fn with<'a, T: ?Sized + 'a>(
        &'a self,
        pick: impl Fn(&'a ModuleEntry) -> Option<&'a Arc<T>> + 'a,
    ) -> impl Iterator<Item = (&'static str, &'a Arc<T>)> + 'a {
        self.modules
            .iter()
            .filter_map(move |e| pick(e).map(|m| (e.name, m)))
    }
}

/// What module crates register into. Cores keep their registration order,
/// which decides between modules that do not depend on each other.
#[derive(Default)]
pub struct RegistryBuilder {
    cores: Vec<(&'static str, &'static [&'static str], Arc<dyn Module>)>,
    caps: HashMap<&'static str, Capabilities>,
    errors: Vec<String>,
}

impl RegistryBuilder {
    pub fn register_core_with_meta(
        &mut self,
        name: &'static str,
        deps: &'static [&'static str],
        m: Arc<dyn Module>,
    ) {
        if self.cores.iter().any(|(n, _, _)| *n == name) {
            self.errors.push(format!("Module '{name}' is already registered"));
            return;
        }
        self.cores.push((name, deps, m));
    }

    pub fn register_rest_with_meta(&mut self, name: &'static str, m: Arc<dyn RestfulModule>) {
        self.caps.entry(name).or_default().rest = Some(m);
    }

    pub fn register_rest_host_with_meta(&mut self, name: &'static str, m: Arc<dyn RestHostModule>) {
        let existing = self
            .caps
            .iter()
            .find(|(n, c)| c.rest_host.is_some() && **n != name)
            .map(|(n, _)| *n);
        if let Some(existing) = existing {
            self.errors.push(format!(
                "Module '{name}' registers a second REST host; '{existing}' already is one"
            ));
            return;
        }
        self.caps.entry(name).or_default().rest_host = Some(m);
    }

    pub fn register_db_with_meta(&mut self, name: &'static str, m: Arc<dyn DbModule>) {
        self.caps.entry(name).or_default().db = Some(m);
    }

    pub fn register_stateful_with_meta(&mut self, name: &'static str, m: Arc<dyn StatefulModule>) {
        self.caps.entry(name).or_default().stateful = Some(m);
    }

    /// Validate the registrations and order modules so each comes after its
    /// dependencies.
    pub fn build_topo_sorted(mut self) -> Result<ModuleRegistry, RegistryError> {
        if !self.errors.is_empty() {
            return Err(RegistryError::InvalidRegistryConfiguration {
                errors: self.errors,
            });
        }
        if let Some(orphan) = self
            .caps
            .keys()
            .find(|n| !self.cores.iter().any(|(core, _, _)| core == *n))
        {
            return Err(RegistryError::UnknownModule((*orphan).to_string()));
        }

        let order = dependency_order(&self.cores)?;

        let mut slots: Vec<_> = self.cores.into_iter().map(Some).collect();
        let mut modules = Vec::with_capacity(order.len());
        for i in order {
            let (name, deps, core) = slots[i]
                .take()
                .ok_or_else(|| RegistryError::CoreNotFound(i.to_string()))?;
            let caps = self.caps.remove(name).unwrap_or_default();
            modules.push(ModuleEntry {
                name,
                deps,
                core,
                rest: caps.rest,
                rest_host: caps.rest_host,
                db: caps.db,
                stateful: caps.stateful,
            });
        }

        tracing::info!(
            modules = ?modules.iter().map(|e| e.name).collect::<Vec<_>>(),
            "Module dependency order resolved"
        );
        Ok(ModuleRegistry { modules })
    }
}

/// Depth-first post-order over the dependency graph, roots taken in
/// registration order. Returns indices into `cores`.
fn dependency_order(
    cores: &[(&'static str, &'static [&'static str], Arc<dyn Module>)],
) -> Result<Vec<usize>, RegistryError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        OnPath,
        Done,
    }

    struct Walk<'a> {
        cores: &'a [(&'static str, &'static [&'static str], Arc<dyn Module>)],
        index: HashMap<&'static str, usize>,
        marks: Vec<Mark>,
        path: Vec<usize>,
        order: Vec<usize>,
    }

    impl Walk<'_> {
        fn visit(&mut self, node: usize) -> Result<(), RegistryError> {
            match self.marks[node] {
                Mark::Done => return Ok(()),
                Mark::OnPath => {
                    let start = self.path.iter().position(|&n| n == node).unwrap_or(0);
                    let mut path: Vec<_> =
                        self.path[start..].iter().map(|&i| self.cores[i].0).collect();
                    path.push(self.cores[node].0);
                    return Err(RegistryError::CycleDetected { path });
                }
                Mark::New => {}
            }

            self.marks[node] = Mark::OnPath;
            self.path.push(node);
            let cores = self.cores;
            let (name, deps, _) = &cores[node];
            for dep in deps.iter() {
                let next = *self.index.get(dep).ok_or_else(|| {
                    RegistryError::UnknownDependency {
                        module: name.to_string(),
                        depends_on: dep.to_string(),
                    }
                })?;
                self.visit(next)?;
            }
            self.path.pop();
            self.marks[node] = Mark::Done;
            self.order.push(node);
            Ok(())
        }
    }

    let mut walk = Walk {
        cores,
        index: cores.iter().enumerate().map(|(i, c)| (c.0, i)).collect(),
        marks: vec![Mark::New; cores.len()],
        path: Vec::new(),
        order: Vec::with_capacity(cores.len()),
    };
    for i in 0..cores.len() {
        walk.visit(i)?;
    }
    Ok(walk.order)
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("initialization failed for module '{module}'")]
    Init {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("start failed for module '{module}'")]
    Start {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("DB migration failed for module '{module}'")]
    DbMigrate {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("REST prepare failed for host module '{module}'")]
    RestPrepare {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("REST registration failed for module '{module}'")]
    RestRegister {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("REST finalize failed for host module '{module}'")]
    RestFinalize {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("modules expose REST routes but no module is registered as REST host")]
    RestRequiresHost,
    #[error("more than one REST host module is registered")]
    MultipleRestHosts,
    #[error("capability registered for unknown module '{0}'")]
    UnknownModule(String),
    #[error("module '{module}' depends on unknown '{depends_on}'")]
    UnknownDependency { module: String, depends_on: String },
    #[error("cyclic dependency detected: {}", path.join(" -> "))]
    CycleDetected { path: Vec<&'static str> },
    #[error("core not found for module #{0}")]
    CoreNotFound(String),
    #[error("invalid registry configuration: {}", errors.join("; "))]
    InvalidRegistryConfiguration { errors: Vec<String> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::openapi::OpenApiCollector;
    use crate::context::ModuleCtxBuilder;
    use crate::contracts::OpenApiRegistry;

    struct Noop;

    #[async_trait::async_trait]
    impl Module for Noop {
        async fn init(&self, _ctx: &ModuleCtx) -> anyhow::Result<()> {
            Ok(())
        }
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    #[derive(Default)]
    struct Host {
        docs: OpenApiCollector,
    }

    impl RestHostModule for Host {
        fn rest_prepare(&self, _ctx: &ModuleCtx, router: Router) -> anyhow::Result<Router> {
            Ok(router)
        }
        fn rest_finalize(&self, _ctx: &ModuleCtx, router: Router) -> anyhow::Result<Router> {
            Ok(router)
        }
        fn as_registry(&self) -> &dyn OpenApiRegistry {
            &self.docs
        }
    }

    struct Routes;

    impl RestfulModule for Routes {
        fn register_rest(
            &self,
            _ctx: &ModuleCtx,
            router: Router,
            _openapi: &dyn OpenApiRegistry,
        ) -> anyhow::Result<Router> {
            Ok(router.route("/ping", axum::routing::get(|| async { "pong" })))
        }
    }

    fn ctx() -> ModuleCtx {
        ModuleCtxBuilder::new(CancellationToken::new()).build()
    }

    fn names(reg: &ModuleRegistry) -> Vec<&'static str> {
        reg.modules().iter().map(|m| m.name).collect()
    }

    #[test]
    fn dependencies_come_before_dependents() {
        let mut b = RegistryBuilder::default();
        b.register_core_with_meta("persons", &["auth"], Arc::new(Noop));
        b.register_core_with_meta("api_ingress", &[], Arc::new(Noop));
        b.register_core_with_meta("auth", &[], Arc::new(Noop));

        let reg = b.build_topo_sorted().unwrap();
        assert_eq!(names(&reg), vec!["auth", "persons", "api_ingress"]);
    }

    #[test]
    fn independent_modules_keep_registration_order() {
        let mut b = RegistryBuilder::default();
        for name in ["c", "a", "b"] {
            b.register_core_with_meta(name, &[], Arc::new(Noop));
        }
        assert_eq!(names(&b.build_topo_sorted().unwrap()), vec!["c", "a", "b"]);
    }

    #[test]
    fn unknown_dependency_is_named() {
        let mut b = RegistryBuilder::default();
        b.register_core_with_meta("persons", &["auth"], Arc::new(Noop));

        match b.build_topo_sorted().unwrap_err() {
            RegistryError::UnknownDependency { module, depends_on } => {
                assert_eq!(module, "persons");
                assert_eq!(depends_on, "auth");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn cycle_is_reported_as_closed_path() {
        let mut b = RegistryBuilder::default();
        b.register_core_with_meta("d", &[], Arc::new(Noop));
        b.register_core_with_meta("a", &["b"], Arc::new(Noop));
        b.register_core_with_meta("b", &["c"], Arc::new(Noop));
        b.register_core_with_meta("c", &["a"], Arc::new(Noop));

        let err = b.build_topo_sorted().unwrap_err();
        assert_eq!(err.to_string(), "cyclic dependency detected: a -> b -> c -> a");
    }

    #[test]
    fn duplicate_core_is_a_configuration_error() {
        let mut b = RegistryBuilder::default();
        b.register_core_with_meta("auth", &[], Arc::new(Noop));
        b.register_core_with_meta("auth", &[], Arc::new(Noop));

        match b.build_topo_sorted().unwrap_err() {
            RegistryError::InvalidRegistryConfiguration { errors } => {
                assert!(errors[0].contains("already registered"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn capability_without_core_is_rejected() {
        let mut b = RegistryBuilder::default();
        b.register_rest_with_meta("ghost", Arc::new(Routes));
        assert!(matches!(
            b.build_topo_sorted().unwrap_err(),
            RegistryError::UnknownModule(name) if name == "ghost"
        ));
    }

    #[test]
    fn second_rest_host_is_rejected() {
        let mut b = RegistryBuilder::default();
        b.register_core_with_meta("h1", &[], Arc::new(Noop));
        b.register_core_with_meta("h2", &[], Arc::new(Noop));
        b.register_rest_host_with_meta("h1", Arc::new(Host::default()));
        b.register_rest_host_with_meta("h2", Arc::new(Host::default()));

        assert!(matches!(
            b.build_topo_sorted().unwrap_err(),
            RegistryError::InvalidRegistryConfiguration { .. }
        ));
    }

    #[test]
    fn rest_routes_need_a_host() {
        let mut b = RegistryBuilder::default();
        b.register_core_with_meta("svc", &[], Arc::new(Noop));
        b.register_rest_with_meta("svc", Arc::new(Routes));
        let reg = b.build_topo_sorted().unwrap();

        let err = reg.run_rest_phase(&ctx(), Router::new()).unwrap_err();
        assert!(matches!(err, RegistryError::RestRequiresHost));
    }

    #[test]
    fn no_rest_modules_leaves_router_untouched() {
        let mut b = RegistryBuilder::default();
        b.register_core_with_meta("svc", &[], Arc::new(Noop));
        let reg = b.build_topo_sorted().unwrap();
        assert!(reg.run_rest_phase(&ctx(), Router::new()).is_ok());
    }

    #[tokio::test]
    async fn full_cycle_with_host_and_provider() {
        let mut b = RegistryBuilder::default();
        b.register_core_with_meta("svc", &["host"], Arc::new(Noop));
        b.register_rest_with_meta("svc", Arc::new(Routes));
        b.register_core_with_meta("host", &[], Arc::new(Noop));
        b.register_rest_host_with_meta("host", Arc::new(Host::default()));
        let reg = b.build_topo_sorted().unwrap();
        assert_eq!(names(&reg), vec!["host", "svc"]);

        let ctx = ctx();
        reg.run_init_phase(&ctx).await.unwrap();
        assert!(reg.run_rest_phase(&ctx, Router::new()).is_ok());

        let cancel = CancellationToken::new();
        reg.run_start_phase(cancel.child_token()).await.unwrap();
        reg.run_stop_phase(cancel.child_token()).await.unwrap();
        assert!(reg.get_module("svc").is_some());
        assert!(reg.get_module("nope").is_none());
    }
}
