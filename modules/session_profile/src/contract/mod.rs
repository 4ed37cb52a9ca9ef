pub mod client;
pub mod error;
pub mod model;

pub use client::SessionProfileApi;
pub use error::SessionProfileError;
pub use model::*;
