use parking_lot::Mutex;
use utoipa::openapi::{path::Paths, Info, OpenApi};

/// Sink REST modules publish their OpenAPI documents into during the REST phase.
pub trait OpenApiRegistry: Send + Sync {
    /// Merge a module's document (paths, component schemas, security schemes, tags).
    fn register_document(&self, doc: OpenApi);

    fn as_any(&self) -> &dyn std::any::Any;
}

/// Accumulates module documents into one OpenAPI description.
pub struct OpenApiCollector {
    doc: Mutex<OpenApi>,
}

impl OpenApiCollector {
    pub fn new(title: &str, version: &str) -> Self {
        Self {
            doc: Mutex::new(OpenApi::new(Info::new(title, version), Paths::new())),
        }
    }

    /// Snapshot of everything registered so far.
    pub fn build(&self) -> OpenApi {
        self.doc.lock().clone()
    }
}

impl Default for OpenApiCollector {
    fn default() -> Self {
        Self::new("API", "0.1.0")
    }
}

impl OpenApiRegistry for OpenApiCollector {
    fn register_document(&self, doc: OpenApi) {
        self.doc.lock().merge(doc);
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
