//! Error types for Rosy.

use thiserror::Error as ThisError;

/// Top-level error type for the bot.
#[derive(Debug, ThisError)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Recognition error: {0}")]
    Recognition(#[from] RecognitionError),

    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("Dialog error: {0}")]
    Dialog(#[from] DialogError),

    #[error("Turn error: {0}")]
    Turn(#[from] TurnError),
}

/// Configuration-related errors.
#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),
}

/// Conversation state store errors.
#[derive(Debug, ThisError)]
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
#[derive(Debug, ThisError)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("No channel registered with name {0}")]
    UnknownChannel(String),

    #[error("Channel health check failed: {name}")]
    HealthCheckFailed { name: String },
}

/// Intent recognizer failures. Fatal for the turn.
#[derive(Debug, ThisError)]
pub enum RecognitionError {
    #[error("Recognizer {service} request failed: {reason}")]
    RequestFailed { service: String, reason: String },

    #[error("Recognizer {service} returned status {status}")]
    BadStatus { service: String, status: u16 },

    #[error("Invalid response from recognizer {service}: {reason}")]
    InvalidResponse { service: String, reason: String },
}

/// Knowledge-base failures. Fatal for the turn.
#[derive(Debug, ThisError)]
pub enum RetrievalError {
    #[error("Knowledge base {kb} request failed: {reason}")]
    RequestFailed { kb: String, reason: String },

    #[error("Knowledge base {kb} returned status {status}")]
    BadStatus { kb: String, status: u16 },

    #[error("Invalid response from knowledge base {kb}: {reason}")]
    InvalidResponse { kb: String, reason: String },

    #[error("Failed to load knowledge base from {path}: {reason}")]
    Load { path: String, reason: String },
}

/// Waterfall and form-session errors.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum DialogError {
    #[error("Corrupted form session for dialog {dialog_id} at step {step_index}: {reason}")]
    CorruptedSession {
        dialog_id: String,
        step_index: usize,
        reason: String,
    },

    #[error("Dialog {0} is not registered")]
    UnknownDialog(String),

    #[error("A form ({0}) is already active in this conversation")]
    FormAlreadyActive(String),

    #[error("No form is active in this conversation")]
    NoActiveForm,

    #[error("Missing required field {field}: {reason}")]
    Validation { field: String, reason: String },
}

impl DialogError {
    /// Whether the caller should reset the form session and restart.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::CorruptedSession { .. } | Self::UnknownDialog(_))
    }
}

/// Turn-controller errors.
#[derive(Debug, ThisError)]
pub enum TurnError {
    #[error("A turn for conversation {0} is already being processed")]
    ConcurrentTurn(String),
}
