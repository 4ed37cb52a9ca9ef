use std::sync::Arc;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use axum::Router;
use modkit::api::OpenApiRegistry;
use modkit::{Module, ModuleCtx, RestfulModule, TracedClient};
use tracing::{debug, info};
use url::Url;

use crate::api::rest::routes::{self, RouteOptions};
use crate::config::{IdentityConfig, IdentityProviderKind, KvBackend, SessionProfileConfig};
use crate::contract::client::SessionProfileApi;
use crate::domain::ports::IdentityProvider;
use crate::domain::service::{Service, ServiceConfig};
use crate::gateways::local::SessionProfileLocalClient;
use crate::infra::identity::{GoTrueIdentityProvider, MemoryIdentityProvider};
use crate::infra::kv::{KvStore, MemoryKvStore, SqliteKvStore};
use crate::infra::storage::KvUserDataRepository;

pub const MODULE_NAME: &str = "session_profile";

/// Accounts, sessions, profiles and journey entries.
/// The service is built in `init` and read by `register_rest`.
#[derive(Default)]
pub struct SessionProfile {
    service: ArcSwapOption<Service>,
}

impl SessionProfile {
    /// In-process client; `None` until the module is initialized.
    pub fn client(&self) -> Option<Arc<dyn SessionProfileApi>> {
        self.service
            .load_full()
            .map(|svc| Arc::new(SessionProfileLocalClient::new(svc)) as Arc<dyn SessionProfileApi>)
    }
}

#[async_trait]
impl Module for SessionProfile {
    async fn init(&self, ctx: &ModuleCtx) -> anyhow::Result<()> {
        let cfg: SessionProfileConfig = ctx.module_config_or_default()?;
        debug!(
            kv = ?cfg.kv.backend,
            identity = ?cfg.identity.provider,
            "Loaded session_profile config"
        );

        let kv = build_kv_store(ctx, cfg.kv.backend).await?;
        let identity = build_identity_provider(&cfg.identity)?;
        let repo = Arc::new(KvUserDataRepository::new(kv));

        let service = Service::new(
            identity,
            repo,
            ServiceConfig {
                max_name_length: cfg.max_name_length,
            },
        );
        self.service.store(Some(Arc::new(service)));

        info!("session_profile module initialized");
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl RestfulModule for SessionProfile {
    fn register_rest(
        &self,
        ctx: &ModuleCtx,
        router: Router,
        openapi: &dyn OpenApiRegistry,
    ) -> anyhow::Result<Router> {
        let service = self
            .service
            .load_full()
            .ok_or_else(|| anyhow::anyhow!("Service not initialized"))?;

        let cfg: SessionProfileConfig = ctx.module_config_or_default()?;
        let opts = RouteOptions {
            base_path: cfg.base_path,
            enable_debug_routes: cfg.enable_debug_routes,
        };

        let router = routes::register_routes(router, openapi, service, &opts)?;
        info!(base_path = %opts.base_path, "session_profile REST routes registered");
        Ok(router)
    }
}

async fn build_kv_store(ctx: &ModuleCtx, backend: KvBackend) -> anyhow::Result<Arc<dyn KvStore>> {
    match backend {
        KvBackend::Memory => {
            info!("Using in-memory KV store; data is lost on restart");
            Ok(Arc::new(MemoryKvStore::new()))
        }
        KvBackend::Sqlite => {
            let pool = ctx.db().ok_or_else(|| {
                anyhow::anyhow!("kv.backend = sqlite requires a database to be configured")
            })?;
            Ok(Arc::new(SqliteKvStore::new(pool).await?))
        }
    }
}

fn build_identity_provider(cfg: &IdentityConfig) -> anyhow::Result<Arc<dyn IdentityProvider>> {
    match cfg.provider {
        IdentityProviderKind::Memory => {
            let ttl = chrono::Duration::seconds(i64::try_from(cfg.session_ttl_secs)?);
            Ok(Arc::new(MemoryIdentityProvider::new(
                ttl,
                cfg.min_password_length,
            )))
        }
        IdentityProviderKind::Gotrue => {
            let url = required_setting(cfg.url.as_deref(), "identity.url")?;
            let anon_key = required_setting(cfg.anon_key.as_deref(), "identity.anon_key")?;
            let service_role_key =
                required_setting(cfg.service_role_key.as_deref(), "identity.service_role_key")?;
            let base = Url::parse(url)
                .map_err(|e| anyhow::anyhow!("invalid identity.url '{url}': {e}"))?;

            info!(host = base.host_str().unwrap_or(""), "Using hosted identity provider");
            Ok(Arc::new(GoTrueIdentityProvider::new(
                TracedClient::default(),
                base,
                anon_key,
                service_role_key,
            )))
        }
    }
}

fn required_setting<'a>(value: Option<&'a str>, name: &str) -> anyhow::Result<&'a str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| anyhow::anyhow!("{name} is required when identity.provider = gotrue"))
}
