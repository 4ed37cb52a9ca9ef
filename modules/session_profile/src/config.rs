use serde::{Deserialize, Serialize};

/// Configuration for the session_profile module
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionProfileConfig {
    /// Prefix of every route of this module.
    #[serde(default = "default_base_path")]
    pub base_path: String,
    /// Mounts `/debug/users` and `/debug/fix-user-password`.
    #[serde(default)]
    pub enable_debug_routes: bool,
    #[serde(default = "default_max_name_length")]
    pub max_name_length: usize,
    #[serde(default)]
    pub kv: KvConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
}

impl Default for SessionProfileConfig {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            enable_debug_routes: false,
            max_name_length: default_max_name_length(),
            kv: KvConfig::default(),
            identity: IdentityConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KvBackend {
    Memory,
    /// Table `kv_store` in the server database.
    #[default]
    Sqlite,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KvConfig {
    #[serde(default)]
    pub backend: KvBackend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityProviderKind {
    #[default]
    Memory,
    Gotrue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityConfig {
    #[serde(default)]
    pub provider: IdentityProviderKind,
    /// Base URL of the hosted auth service (gotrue only).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub anon_key: Option<String>,
    #[serde(default)]
    pub service_role_key: Option<String>,
    /// Lifetime of tokens issued by the memory provider.
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            provider: IdentityProviderKind::default(),
            url: None,
            anon_key: None,
            service_role_key: None,
            session_ttl_secs: default_session_ttl_secs(),
            min_password_length: default_min_password_length(),
        }
    }
}

fn default_base_path() -> String {
    "/make-server-52bd6d77".to_string()
}

fn default_max_name_length() -> usize {
    100
}

fn default_session_ttl_secs() -> u64 {
    3600
}

fn default_min_password_length() -> usize {
    6
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_section_uses_defaults() {
        let cfg: SessionProfileConfig = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(cfg.base_path, "/make-server-52bd6d77");
        assert!(!cfg.enable_debug_routes);
        assert_eq!(cfg.kv.backend, KvBackend::Sqlite);
        assert_eq!(cfg.identity.provider, IdentityProviderKind::Memory);
        assert_eq!(cfg.identity.session_ttl_secs, 3600);
        assert_eq!(cfg.identity.min_password_length, 6);
    }

    #[test]
    fn nested_sections_parse() {
        let cfg: SessionProfileConfig = serde_json::from_value(serde_json::json!({
            "base_path": "/api",
            "kv": { "backend": "memory" },
            "identity": {
                "provider": "gotrue",
                "url": "https://proj.example.co",
                "anon_key": "anon",
                "service_role_key": "service"
            }
        }))
        .unwrap();
        assert_eq!(cfg.kv.backend, KvBackend::Memory);
        assert_eq!(cfg.identity.provider, IdentityProviderKind::Gotrue);
        assert_eq!(cfg.identity.anon_key.as_deref(), Some("anon"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let res = serde_json::from_value::<SessionProfileConfig>(serde_json::json!({"bogus": 1}));
        assert!(res.is_err());
    }
}
