//! Error types for notedrop.

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Authorization error: {0}")]
    Auth(#[from] AuthError),

    #[error("Staging error: {0}")]
    Stage(#[from] StageError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Transport (Telegram) errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send reply on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Invalid message format: {0}")]
    InvalidMessage(String),
}

/// Access-gate errors.
///
/// A failed `Persist` after a correct secret means the sender must NOT be
/// treated as authorized — the durable write is part of granting access.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Failed to load authorized users: {0}")]
    Load(String),

    #[error("Failed to persist authorized users: {0}")]
    Persist(String),
}

/// Attachment staging errors.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("Failed to fetch attachment {file_id}: {reason}")]
    Fetch { file_id: String, reason: String },

    #[error("Timed out fetching attachment {file_id}")]
    Timeout { file_id: String },
}

/// Remote storage errors. Each variant names the remote path that failed so
/// callers can tell an attachment write from the note write.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to create remote directory {path}: {reason}")]
    Dir { path: String, reason: String },

    #[error("Failed to write {path}: {reason}")]
    Put { path: String, reason: String },

    #[error("Timed out writing {path}")]
    Timeout { path: String },
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
