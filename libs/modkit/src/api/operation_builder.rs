//! Type-safe API operation builder with compile-time guarantees
//!
//! The builder tracks two type-state slots:
//! - `H`: whether a handler was attached (`Missing` | `Present`)
//! - `R`: whether at least one response was declared (`Missing` | `Present`)
//!
//! `register()` only exists on `OperationBuilder<Present, Present, S>`, so a route
//! cannot reach the router without both. Every response declaration moves `R` to
//! `Present`, whatever its previous state.

use axum::{handler::Handler, routing::MethodRouter, Router};
use http::Method;
use std::marker::PhantomData;

use crate::api::problem;

/// Type alias for schema collections used in API operations.
pub type SchemaCollection = Vec<(
    String,
    utoipa::openapi::RefOr<utoipa::openapi::schema::Schema>,
)>;

/// Type-state markers for compile-time enforcement
pub mod state {
    #[derive(Debug, Clone, Copy)]
    pub struct Missing;

    #[derive(Debug, Clone, Copy)]
    pub struct Present;
}

pub use state::{Missing, Present};

mod sealed {
    pub trait Sealed {}
}

/// Maps handler state to the router slot: `()` for `Missing`, `MethodRouter<S>` for `Present`.
pub trait HandlerSlot<S>: sealed::Sealed {
    type Slot;
}

impl sealed::Sealed for Missing {}
impl sealed::Sealed for Present {}

impl<S> HandlerSlot<S> for Missing {
    type Slot = ();
}
impl<S> HandlerSlot<S> for Present {
    type Slot = MethodRouter<S>;
}

#[derive(Clone, Debug)]
pub struct RequestBodySpec {
    pub content_type: &'static str,
    pub description: Option<String>,
    /// Registered component schema referenced by `$ref`.
    pub schema_name: Option<String>,
    pub required: bool,
}

#[derive(Clone, Debug)]
pub struct ResponseSpec {
    pub status: u16,
    pub content_type: &'static str,
    pub description: String,
    pub schema_name: Option<String>,
}

#[derive(Clone, Debug)]
pub struct OperationSpec {
    pub method: Method,
    pub path: String,
    pub operation_id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub request_body: Option<RequestBodySpec>,
    pub responses: Vec<ResponseSpec>,
    /// Operation expects `Authorization: Bearer <token>`.
    pub bearer_auth: bool,
    /// Stable handler identity derived from method and path.
    pub handler_id: String,
}

/// Registry trait for OpenAPI operations and schemas
pub trait OpenApiRegistry {
    /// Register an API operation specification
    fn register_operation(&self, spec: &OperationSpec);

    /// Ensure the named schema and its dependencies are stored under components;
    /// returns the component name to `$ref`.
    fn ensure_schema_raw(&self, name: &str, schemas: SchemaCollection) -> String;

    fn as_any(&self) -> &dyn std::any::Any;
}

/// Register `T` (with its transitive schemas) and return its component name.
pub fn ensure_schema<T: utoipa::ToSchema + utoipa::PartialSchema + 'static>(
    registry: &dyn OpenApiRegistry,
) -> String {
    use utoipa::PartialSchema;

    let root_name = T::name().to_string();
    let mut collected: SchemaCollection = vec![(root_name.clone(), <T as PartialSchema>::schema())];
    T::schemas(&mut collected);
    registry.ensure_schema_raw(&root_name, collected)
}

pub struct OperationBuilder<H, R, S = ()>
where
    H: HandlerSlot<S>,
{
    spec: OperationSpec,
    method_router: <H as HandlerSlot<S>>::Slot,
    _has_handler: PhantomData<H>,
    _has_response: PhantomData<R>,
    _state: PhantomData<fn() -> S>,
}

impl<S> OperationBuilder<Missing, Missing, S> {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let path = path.into();
        let handler_id = format!(
            "{}:{}",
            method.as_str().to_lowercase(),
            path.replace(['/', '{', '}'], "_")
        );

        Self {
            spec: OperationSpec {
                method,
                path,
                operation_id: None,
                summary: None,
                description: None,
                tags: Vec::new(),
                request_body: None,
                responses: Vec::new(),
                bearer_auth: false,
                handler_id,
            },
            method_router: (),
            _has_handler: PhantomData,
            _has_response: PhantomData,
            _state: PhantomData,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }
}

// Descriptive methods, available at any stage.
impl<H, R, S> OperationBuilder<H, R, S>
where
    H: HandlerSlot<S>,
{
    pub fn spec(&self) -> &OperationSpec {
        &self.spec
    }

    pub fn operation_id(mut self, id: impl Into<String>) -> Self {
        self.spec.operation_id = Some(id.into());
        self
    }

    pub fn summary(mut self, text: impl Into<String>) -> Self {
        self.spec.summary = Some(text.into());
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.spec.description = Some(text.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.spec.tags.push(tag.into());
        self
    }

    /// Mark the operation as requiring a bearer access token.
    pub fn bearer_auth(mut self) -> Self {
        self.spec.bearer_auth = true;
        self
    }

    /// Attach a required JSON request body and auto-register its schema.
    pub fn json_request<T>(mut self, registry: &dyn OpenApiRegistry, desc: impl Into<String>) -> Self
    where
        T: utoipa::ToSchema + utoipa::PartialSchema + 'static,
    {
        let name = ensure_schema::<T>(registry);
        self.spec.request_body = Some(RequestBodySpec {
            content_type: "application/json",
            description: Some(desc.into()),
            schema_name: Some(name),
            required: true,
        });
        self
    }

    fn push_response(mut self, resp: ResponseSpec) -> OperationBuilder<H, Present, S> {
        self.spec.responses.push(resp);
        OperationBuilder {
            spec: self.spec,
            method_router: self.method_router,
            _has_handler: self._has_handler,
            _has_response: PhantomData,
            _state: self._state,
        }
    }

    /// JSON response without a registered schema.
    pub fn json_response(
        self,
        status: u16,
        description: impl Into<String>,
    ) -> OperationBuilder<H, Present, S> {
        self.push_response(ResponseSpec {
            status,
            content_type: "application/json",
            description: description.into(),
            schema_name: None,
        })
    }

    /// JSON response referencing `T`'s component schema.
    pub fn json_response_with_schema<T>(
        self,
        registry: &dyn OpenApiRegistry,
        status: u16,
        description: impl Into<String>,
    ) -> OperationBuilder<H, Present, S>
    where
        T: utoipa::ToSchema + utoipa::PartialSchema + 'static,
    {
        let name = ensure_schema::<T>(registry);
        self.push_response(ResponseSpec {
            status,
            content_type: "application/json",
            description: description.into(),
            schema_name: Some(name),
        })
    }

    /// RFC 9457 `application/problem+json` response.
    pub fn problem_response(
        self,
        registry: &dyn OpenApiRegistry,
        status: u16,
        description: impl Into<String>,
    ) -> OperationBuilder<H, Present, S> {
        let name = ensure_schema::<problem::Problem>(registry);
        self.push_response(ResponseSpec {
            status,
            content_type: problem::APPLICATION_PROBLEM_JSON,
            description: description.into(),
            schema_name: Some(name),
        })
    }
}

impl<R, S> OperationBuilder<Missing, R, S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Attach the handler; transitions `H` from `Missing` to `Present`.
    pub fn handler<F, T>(self, h: F) -> OperationBuilder<Present, R, S>
    where
        F: Handler<T, S> + Clone + Send + 'static,
        T: 'static,
    {
        let method_router = match self.spec.method {
            Method::GET => axum::routing::get(h),
            Method::POST => axum::routing::post(h),
            Method::PUT => axum::routing::put(h),
            Method::DELETE => axum::routing::delete(h),
            _ => axum::routing::any(|| async { axum::http::StatusCode::METHOD_NOT_ALLOWED }),
        };

        OperationBuilder {
            spec: self.spec,
            method_router,
            _has_handler: PhantomData,
            _has_response: self._has_response,
            _state: self._state,
        }
    }
}

impl<S> OperationBuilder<Present, Present, S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Publish the spec to the registry and mount the handler on the router.
    pub fn register(self, router: Router<S>, openapi: &dyn OpenApiRegistry) -> Router<S> {
        openapi.register_operation(&self.spec);
        router.route(&self.spec.path, self.method_router)
    }
}
