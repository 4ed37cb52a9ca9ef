use serde::{Deserialize, Serialize};

/// HTTP host configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ApiIngressConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Serves `/openapi.json`.
    #[serde(default)]
    pub enable_docs: bool,
    #[serde(default)]
    pub cors_enabled: bool,
}

impl Default for ApiIngressConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            enable_docs: false,
            cors_enabled: false,
        }
    }
}

fn default_bind_addr() -> String {
    "127.0.0.1:8087".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let cfg: ApiIngressConfig = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(cfg.bind_addr, "127.0.0.1:8087");
        assert!(!cfg.enable_docs);
        assert!(!cfg.cors_enabled);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let res = serde_json::from_value::<ApiIngressConfig>(serde_json::json!({"port": 1}));
        assert!(res.is_err());
    }
}
