//! REST building blocks: RFC 9457 problems and the type-state operation builder.

pub mod operation_builder;
pub mod problem;

pub use operation_builder::{
    ensure_schema, state, Missing, OpenApiRegistry, OperationBuilder, OperationSpec, Present,
    RequestBodySpec, ResponseSpec, SchemaCollection,
};
