//! Error types for ConnectHub.

/// Top-level error type for the bot.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Registration error: {0}")]
    Registration(#[from] RegistrationError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send response on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("No channel registered under {name}")]
    UnknownChannel { name: String },

    #[error("Invalid message format: {0}")]
    InvalidMessage(String),
}

/// Failures talking to the remote registration API.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("Registration request failed: {reason}")]
    Transport { reason: String },

    #[error("Registration rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Invalid registration response: {body}")]
    InvalidResponse { body: String },
}

impl RegistrationError {
    /// Best-effort diagnostic text to show the user: the raw response body,
    /// or `"unknown"` when no body was available.
    pub fn diagnostic(&self) -> &str {
        match self {
            Self::Transport { .. } => "unknown",
            Self::Rejected { body, .. } | Self::InvalidResponse { body } => {
                if body.trim().is_empty() {
                    "unknown"
                } else {
                    body
                }
            }
        }
    }
}

/// Errors raised by the text recognizers.
#[derive(Debug, thiserror::Error)]
pub enum RecognizerError {
    #[error("Input too long: {length} > {max} characters")]
    InputTooLong { length: usize, max: usize },

    #[error("Number out of range: {0}")]
    Overflow(String),
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;
