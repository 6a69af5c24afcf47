// ── Core Error Type ─────────────────────────────────────────────────────────
// Single canonical error enum for infrastructure-level failures (catalog
// loading, persistence I/O, connection setup). Per-message user-facing
// failures never reach this type — they are rendered as InteractionResponse
// text by the handlers/parser/manager.
//
// Design rules:
//   • Variants are coarse-grained by domain (I/O, Serialization, Channel…).
//   • `#[from]` wires std/external error conversions automatically.
//   • No variant carries secret material (bot tokens, etc.) in its message.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Filesystem or OS-level I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP / network failure (reqwest layer).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Channel adapter failure (connection, gateway, send).
    #[error("Channel error: {channel}: {message}")]
    Channel { channel: String, message: String },

    /// Configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Flow state is inconsistent (should not happen; indicates a bug).
    #[error("Flow state error: {0}")]
    Flow(String),

    /// Catch-all for errors that do not yet have a dedicated variant.
    #[error("{0}")]
    Other(String),
}

impl CoreError {
    pub fn channel(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Channel { channel: channel.into(), message: message.into() }
    }
}

impl From<String> for CoreError {
    fn from(s: String) -> Self {
        CoreError::Other(s)
    }
}

impl From<&str> for CoreError {
    fn from(s: &str) -> Self {
        CoreError::Other(s.to_string())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
