use serde::{Deserialize, Serialize};

/// `modules.api_ingress` section. `bind_addr` falls back to `server.host:port`
/// when the section does not set it.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiIngressConfig {
    pub bind_addr: String,
    /// Serve the merged OpenAPI document at `/openapi.json`.
    pub enable_docs: bool,
    pub cors_enabled: bool,
    /// Per-request handler timeout; 408 once exceeded.
    pub request_timeout_sec: u64,
    /// Maximum accepted request body; 413 above it.
    pub body_limit_bytes: usize,
}

impl Default for ApiIngressConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8087".to_string(),
            enable_docs: true,
            cors_enabled: false,
            request_timeout_sec: 30,
            body_limit_bytes: 16 * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_section_keeps_defaults() {
        let cfg: ApiIngressConfig =
            serde_json::from_value(serde_json::json!({ "bind_addr": "0.0.0.0:9000" })).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:9000");
        assert!(cfg.enable_docs);
        assert_eq!(cfg.request_timeout_sec, 30);
        assert_eq!(cfg.body_limit_bytes, 16 * 1024 * 1024);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let res: Result<ApiIngressConfig, _> =
            serde_json::from_value(serde_json::json!({ "bind": "x" }));
        assert!(res.is_err());
    }
}
