//! Type-safe hub for sharing clients between modules.
//!
//! A provider registers an implementation under its interface type
//! (usually a trait object) during `init`; consumers fetch it by the same
//! type: `hub.get::<dyn auth::TokenVerifier>()`. Modules initialize in
//! dependency order, so a consumer declaring the provider as a dependency
//! always finds it registered.
//!
//! Re-registering overwrites the previous value; Arcs already handed out stay valid.

use parking_lot::RwLock;
use std::{any::Any, collections::HashMap, sync::Arc};

/// Scope used by [`ClientHub::register`] and [`ClientHub::get`].
pub const GLOBAL_SCOPE: &str = "global";

type Key = (&'static str, Arc<str>);
type Boxed = Box<dyn Any + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum ClientHubError {
    #[error("client not found: type={type_name}, scope={scope}")]
    NotFound { type_name: &'static str, scope: String },
}

/// Registry of clients keyed by (interface type name, scope).
#[derive(Default)]
pub struct ClientHub {
    map: RwLock<HashMap<Key, Boxed>>,
}

impl ClientHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client in the global scope under the interface type `T`.
    pub fn register<T>(&self, client: Arc<T>)
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.register_scoped::<T>(GLOBAL_SCOPE, client);
    }

    pub fn register_scoped<T>(&self, scope: impl Into<Arc<str>>, client: Arc<T>)
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let key = (std::any::type_name::<T>(), scope.into());
        self.map.write().insert(key, Box::new(client));
    }

    /// Fetch a client from the global scope by interface type `T`.
    pub fn get<T>(&self) -> Result<Arc<T>, ClientHubError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.get_scoped::<T>(GLOBAL_SCOPE)
    }

    pub fn get_scoped<T>(&self, scope: impl Into<Arc<str>>) -> Result<Arc<T>, ClientHubError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let key: Key = (std::any::type_name::<T>(), scope.into());
        self.map
            .read()
            .get(&key)
            .and_then(|boxed| boxed.downcast_ref::<Arc<T>>())
            .cloned()
            .ok_or_else(|| ClientHubError::NotFound {
                type_name: key.0,
                scope: key.1.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }
}
