//! Unified error types for CalBot.

use thiserror::Error;

/// Result type alias using CalBotError.
pub type Result<T> = std::result::Result<T, CalBotError>;

#[derive(Error, Debug)]
pub enum CalBotError {
    // Calendar backend errors
    #[error("Calendar source error: {0}")]
    Source(String),

    #[error("Calendar not found: {0}")]
    SourceNotFound(String),

    #[error("Calendar access forbidden: {0}")]
    SourceForbidden(String),

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("HTTP error: {0}")]
    Http(String),

    // Notification errors
    #[error("Dispatch error: {0}")]
    Dispatch(String),

    #[error("Notification channel not found: {0}")]
    ChannelNotFound(String),

    // Domain errors
    #[error("Invalid window: {0}")]
    InvalidWindow(String),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl CalBotError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    pub fn dispatch(msg: impl Into<String>) -> Self {
        Self::Dispatch(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Errors raised while talking to the calendar backend.
    /// The reminder loop backs off on consecutive errors of this class.
    pub fn is_source_error(&self) -> bool {
        matches!(
            self,
            Self::Source(_)
                | Self::SourceNotFound(_)
                | Self::SourceForbidden(_)
                | Self::AuthFailed(_)
                | Self::RateLimited(_)
                | Self::Timeout(_)
                | Self::Http(_)
        )
    }

    /// Errors raised by a notification sink.
    pub fn is_dispatch_error(&self) -> bool {
        matches!(self, Self::Dispatch(_) | Self::ChannelNotFound(_))
    }
}
