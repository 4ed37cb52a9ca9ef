use thiserror::Error;

/// Failures surfaced by [`crate::SessionManager`].
#[derive(Error, Debug)]
pub enum ClientError {
    /// No access token is cached; nothing was sent.
    #[error("No session found")]
    NoSession,

    /// The operation needs a signed-in user; nothing was sent.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The server answered with a problem document.
    #[error("{message} ({code}, HTTP {status})")]
    Server {
        status: u16,
        code: String,
        message: String,
    },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    InvalidResponse(String),

    #[error("session storage: {0}")]
    Storage(String),

    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl ClientError {
    pub fn storage(e: impl std::fmt::Display) -> Self {
        Self::Storage(e.to_string())
    }

    /// Problem `code` for server errors, e.g. `InvalidCredentials`.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Server { code, .. } => Some(code),
            _ => None,
        }
    }
}
