use serde::de::DeserializeOwned;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Provider of module-specific configuration (raw JSON sections only).
pub trait ConfigProvider: Send + Sync {
    /// Returns raw JSON section for the module, if any.
    fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value>;
}

#[derive(Clone)]
pub struct ModuleCtx {
    db: Option<SqlitePool>,
    config_provider: Option<Arc<dyn ConfigProvider>>,
    cancellation_token: CancellationToken,
    module_name: Option<Arc<str>>,
}

pub struct ModuleCtxBuilder {
    inner: ModuleCtx,
}

impl ModuleCtxBuilder {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            inner: ModuleCtx {
                db: None,
                config_provider: None,
                cancellation_token: token,
                module_name: None,
            },
        }
    }

    pub fn with_db(mut self, db: SqlitePool) -> Self {
        self.inner.db = Some(db);
        self
    }

    pub fn with_config_provider(mut self, p: Arc<dyn ConfigProvider>) -> Self {
        self.inner.config_provider = Some(p);
        self
    }

    pub fn build(self) -> ModuleCtx {
        self.inner
    }
}

impl ModuleCtx {
    /// Scope context to a specific module name.
    pub fn for_module(&self, name: &str) -> Self {
        let mut scoped = self.clone();
        scoped.module_name = Some(Arc::<str>::from(name));
        scoped
    }

    pub fn db(&self) -> Option<SqlitePool> {
        self.db.clone()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation_token
    }

    pub fn current_module(&self) -> Option<&str> {
        self.module_name.as_deref()
    }

    /// Best-effort: deserialize the module's config into `T`, fallback to `T::default()`
    /// if section is missing or invalid.
    pub fn module_config<T: DeserializeOwned + Default>(&self) -> T {
        match (&self.module_name, &self.config_provider) {
            (Some(name), Some(p)) => p
                .get_module_config(name)
                .and_then(|v| match serde_json::from_value::<T>(v.clone()) {
                    Ok(cfg) => Some(cfg),
                    Err(e) => {
                        tracing::warn!(module = %name, error = %e, "Invalid module config, using defaults");
                        None
                    }
                })
                .unwrap_or_default(),
            _ => T::default(),
        }
    }

    /// Strict when the section is present, `T::default()` when it is absent.
    pub fn module_config_or_default<T: DeserializeOwned + Default>(&self) -> anyhow::Result<T> {
        let present = match (&self.module_name, &self.config_provider) {
            (Some(name), Some(p)) => p.get_module_config(name).is_some(),
            _ => false,
        };
        if present {
            self.module_config_required()
        } else {
            Ok(T::default())
        }
    }

    /// Strict: deserialize the module's config into `T`, returning a pathful error on failure.
    pub fn module_config_required<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
        let name = self
            .module_name
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("context is not scoped to a module"))?;

        let prov = self
            .config_provider
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("no ConfigProvider"))?;

        let val = prov
            .get_module_config(name)
            .ok_or_else(|| anyhow::anyhow!("missing module config: {name}"))?;

        serde_json::from_value(val.clone())
            .map_err(|e| anyhow::anyhow!("invalid {name} config: {e}"))
    }
}
