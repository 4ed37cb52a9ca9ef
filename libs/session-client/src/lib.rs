//! Client-side session manager for the Chhaav session & profile routes.
//!
//! Keeps the access token, user and profile in a pluggable [`SessionStorage`]
//! so a restarted client can pick the session back up.

pub mod error;
pub mod manager;
pub mod model;
pub mod storage;

pub use error::ClientError;
pub use manager::{ClientConfig, SessionManager, ACCESS_TOKEN_KEY, PROFILE_KEY, USER_KEY};
pub use model::{AuthState, Profile, ProfileUpdate, User};
pub use storage::{FileStorage, MemoryStorage, SessionStorage};
