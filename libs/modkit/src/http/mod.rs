//! HTTP utilities shared by modules: traced outbound client and trace-context helpers.

pub mod client;
pub mod simple_otel;
