use async_trait::async_trait;
use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::DashMap;

use anyhow::Result;
use axum::http::{header, Method};
use axum::response::IntoResponse;
use axum::{middleware::from_fn, routing::get, Json, Router};
use modkit::api::{OpenApiRegistry, OperationSpec, SchemaCollection};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
};

mod config;
mod model;
pub mod openapi;
pub mod request_id;
mod web;

pub use config::ApiIngressConfig;
use model::ComponentsRegistry;

pub const MODULE_NAME: &str = "api_ingress";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// HTTP host: owns the server, applies the global middleware stack and
/// collects operation specs from REST modules into one OpenAPI document.
pub struct ApiIngress {
    // Lock-free config using arc-swap for read-mostly access
    config: ArcSwap<ApiIngressConfig>,
    components_registry: ArcSwap<ComponentsRegistry>,
    // Router from the REST phase, taken by `serve`
    final_router: Mutex<Option<Router>>,

    // Duplicate detection (per (method, path) and per handler id)
    registered_routes: DashMap<(Method, String), ()>,
    registered_handlers: DashMap<String, ()>,

    operation_specs: DashMap<String, OperationSpec>,
}

impl Default for ApiIngress {
    fn default() -> Self {
        Self::new(ApiIngressConfig::default())
    }
}

impl ApiIngress {
    pub fn new(config: ApiIngressConfig) -> Self {
        Self {
            config: ArcSwap::from_pointee(config),
            components_registry: ArcSwap::from_pointee(ComponentsRegistry::default()),
            final_router: Mutex::new(None),
            registered_routes: DashMap::new(),
            registered_handlers: DashMap::new(),
            operation_specs: DashMap::new(),
        }
    }

    /// Current configuration (cheap clone from ArcSwap)
    pub fn get_config(&self) -> ApiIngressConfig {
        (**self.config.load()).clone()
    }

    pub fn operation_count(&self) -> usize {
        self.operation_specs.len()
    }

    /// Wrap module routes with host endpoints and the global middleware stack.
    pub fn build_router(&self, routes: Router) -> Result<Router> {
        let config = self.get_config();
        let mut router = routes.route("/health", get(web::health_check));

        if config.enable_docs {
            let doc = Arc::new(serde_json::to_value(self.build_openapi())?);
            tracing::info!(
                operations = self.operation_count(),
                "Serving OpenAPI document at /openapi.json"
            );
            router = router.route(
                "/openapi.json",
                get(move || {
                    let doc = doc.clone();
                    async move {
                        ([(header::CACHE_CONTROL, "no-store")], Json((*doc).clone())).into_response()
                    }
                }),
            );
        }

        // Layers are listed innermost first; a request passes them bottom-up:
        // SetRequestId -> PropagateRequestId -> Trace -> push_req_id -> stamp -> Timeout -> CORS -> BodyLimit

        router = router.layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES));

        if config.cors_enabled {
            router = router.layer(CorsLayer::permissive());
        }

        router = router.layer(TimeoutLayer::new(REQUEST_TIMEOUT));

        router = router.layer(from_fn(request_id::stamp_problem_request_id));
        router = router.layer(from_fn(request_id::push_req_id_to_extensions));
        router = router.layer(request_id::create_trace_layer());

        let x_request_id = request_id::header();
        router = router.layer(PropagateRequestIdLayer::new(x_request_id.clone()));
        router = router.layer(SetRequestIdLayer::new(x_request_id, request_id::MakeReqId));

        Ok(router)
    }

    /// Build the host router around `routes` and keep it for [`ApiIngress::serve`].
    pub fn finalize(&self, routes: Router) -> Result<Router> {
        let router = self.build_router(routes)?;
        *self.final_router.lock() = Some(router.clone());
        tracing::debug!("Finalized host router");
        Ok(router)
    }

    /// OpenAPI document from registered operations and schemas.
    pub fn build_openapi(&self) -> openapi::OpenApi {
        let components = self.components_registry.load();
        let specs: Vec<OperationSpec> = self
            .operation_specs
            .iter()
            .map(|e| e.value().clone())
            .collect();
        tracing::debug!("Building OpenAPI: found {} registered operations", specs.len());
        openapi::build_document(&specs, &components)
    }

    /// Bind, serve until `cancel` fires, then drain in-flight requests.
    pub async fn serve(&self, cancel: CancellationToken) -> Result<()> {
        let cfg = self.get_config();
        let addr: SocketAddr = cfg
            .bind_addr
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid bind address '{}': {}", cfg.bind_addr, e))?;

        // Take the router so the MutexGuard is dropped before awaits
        let stored = { self.final_router.lock().take() };
        let router = match stored {
            Some(r) => r,
            None => {
                tracing::debug!("No router from REST phase, building default router");
                self.build_router(Router::new())?
            }
        };

        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("HTTP server bound on {}", addr);

        let shutdown = async move {
            cancel.cancelled().await;
            tracing::info!("HTTP server shutting down gracefully (cancellation)");
        };

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| anyhow::anyhow!(e))
    }
}

#[async_trait]
impl modkit::Module for ApiIngress {
    async fn init(&self, ctx: &modkit::ModuleCtx) -> anyhow::Result<()> {
        let cfg = ctx.module_config_or_default::<ApiIngressConfig>()?;
        tracing::debug!(bind_addr = %cfg.bind_addr, docs = cfg.enable_docs, "api_ingress configured");
        self.config.store(Arc::new(cfg));
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl OpenApiRegistry for ApiIngress {
    fn register_operation(&self, spec: &OperationSpec) {
        // "First wins": a second registration is a programming error.
        if self
            .registered_handlers
            .insert(spec.handler_id.clone(), ())
            .is_some()
        {
            tracing::error!(
                handler_id = %spec.handler_id,
                method = %spec.method.as_str(),
                path = %spec.path,
                "Duplicate handler_id detected; ignoring subsequent registration"
            );
            return;
        }

        let route_key = (spec.method.clone(), spec.path.clone());
        if self.registered_routes.insert(route_key, ()).is_some() {
            tracing::error!(
                method = %spec.method.as_str(),
                path = %spec.path,
                "Duplicate (method, path) detected; ignoring subsequent registration"
            );
            return;
        }

        let operation_key = format!("{}:{}", spec.method.as_str(), spec.path);
        self.operation_specs
            .insert(operation_key.clone(), spec.clone());

        tracing::debug!(
            handler_id = %spec.handler_id,
            operation_key = %operation_key,
            total_operations = self.operation_specs.len(),
            "Registered API operation"
        );
    }

    fn ensure_schema_raw(&self, name: &str, schemas: SchemaCollection) -> String {
        // Copy-on-write snapshot of the registry
        let current = self.components_registry.load();
        let mut reg = (**current).clone();
        let mut changed = false;

        for (key, schema) in schemas {
            match serde_json::to_value(&schema) {
                Ok(json) => changed |= reg.register_schema(key, json),
                Err(e) => {
                    tracing::error!(%name, %key, error = %e, "Failed to serialize schema to JSON");
                }
            }
        }

        if changed {
            self.components_registry.store(Arc::new(reg));
        }
        name.to_string()
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
