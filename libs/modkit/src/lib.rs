//! # ModKit - module wiring for the Chhaav server
//!
//! Small toolkit shared by every server module:
//!
//! - **Contracts**: `Module` (config + DI wiring) and `RestfulModule` (route registration)
//! - **Context**: `ModuleCtx` scoped to a module, carrying its config section and DB pool
//! - **API**: RFC 9457 `Problem` responses and the type-state `OperationBuilder`
//! - **HTTP**: `TracedClient` for outbound calls with `traceparent` propagation
//! - **Runtime**: OS signal handling for graceful shutdown
//!
//! ## Example
//!
//! ```rust,ignore
//! use modkit::{Module, ModuleCtx, RestfulModule};
//!
//! #[derive(Default)]
//! pub struct Journal;
//!
//! #[modkit::async_trait]
//! impl Module for Journal {
//!     async fn init(&self, ctx: &ModuleCtx) -> anyhow::Result<()> { Ok(()) }
//!     fn as_any(&self) -> &dyn std::any::Any { self }
//! }
//! ```

pub use anyhow::Result;
pub use async_trait::async_trait;

// Module system exports
pub use crate::contracts::*;
pub mod context;
pub use context::{ConfigProvider, ModuleCtx, ModuleCtxBuilder};

// Core module contracts and traits
pub mod contracts;
// Type-safe API operation builder
pub mod api;
pub use api::{OpenApiRegistry, OperationBuilder};

// HTTP utilities
pub mod http;
pub use api::problem::{Problem, ProblemResponse, ValidationError};
pub use http::client::TracedClient;

pub mod runtime;
pub use runtime::{cancel_on_signal, wait_for_shutdown};
