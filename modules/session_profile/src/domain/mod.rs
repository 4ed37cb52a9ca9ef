pub mod error;
pub mod ports;
pub mod redact;
pub mod repo;
pub mod service;
