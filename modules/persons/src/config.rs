use serde::{Deserialize, Serialize};

/// Configuration for the persons module
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersonsConfig {
    /// Page size used when a search does not ask for one.
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u64,
}

impl Default for PersonsConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

fn default_page_size() -> u64 {
    10
}

fn default_max_page_size() -> u64 {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg: PersonsConfig = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(cfg.default_page_size, 10);
        assert_eq!(cfg.max_page_size, 100);
    }

    #[test]
    fn partial_override() {
        let cfg: PersonsConfig =
            serde_json::from_value(serde_json::json!({ "default_page_size": 25 })).unwrap();
        assert_eq!(cfg.default_page_size, 25);
        assert_eq!(cfg.max_page_size, 100);
    }
}
