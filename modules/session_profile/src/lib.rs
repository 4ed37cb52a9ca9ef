//! Session & profile module: email/password accounts through a pluggable
//! identity provider, companion profiles and journey entries kept in a KV store.

// === PUBLIC CONTRACT ===
pub mod contract;
pub use contract::{client, error, model};

// === MODULE DEFINITION ===
pub mod module;
pub use module::{SessionProfile, MODULE_NAME};

// === INTERNAL MODULES ===
// Exposed for integration tests and the server binary; not a stable API.
#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod config;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod gateways;
#[doc(hidden)]
pub mod infra;
