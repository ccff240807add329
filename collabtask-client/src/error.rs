/// Client error types

use collabtask_shared::events::WireError;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Wire format error: {0}")]
    Wire(#[from] WireError),

    /// A request needing a session was made before logging in
    #[error("Not logged in")]
    NotAuthenticated,

    #[error("Gave up reconnecting after {attempts} attempts")]
    ReconnectExhausted { attempts: u32 },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Whether the server rejected the request because of a concurrent write
    pub fn is_conflict(&self) -> bool {
        matches!(self, ClientError::Api { status: 409, .. })
    }
}
