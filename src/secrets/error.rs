//! Error types for secret manager operations.
//!
//! Looking up an id that does not exist is not an error: managers return
//! `Ok(None)` / `Ok(false)` for that case. Everything else is a [`SecretsError`].

use thiserror::Error;

/// Result type for secret manager operations.
pub type Result<T> = std::result::Result<T, SecretsError>;

/// Message returned to callers in place of internal failure detail.
const PUBLIC_INTERNAL_MESSAGE: &str = "Secret storage is temporarily unavailable";

/// Errors that can occur during secret manager operations.
#[derive(Error, Debug)]
pub enum SecretsError {
    /// A required configuration field is missing or invalid. Raised at construction.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The login exchange with Vault failed.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// A Vault write/read/delete/list failed for a reason other than "not found".
    #[error("Vault transport error: {message}")]
    Transport { message: String },

    /// A BYOS value is not a well-formed `path#key` reference.
    #[error("Invalid vault reference '{reference}': {reason}")]
    InvalidReference { reference: String, reason: String },

    /// The operation is not available on this manager.
    #[error("Operation '{operation}' is not supported by the {manager} secret manager")]
    NotSupported { operation: String, manager: String },

    /// Secret metadata repository failure.
    #[error("Database error: {context}")]
    Database {
        #[source]
        source: sqlx::Error,
        context: String,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error (service-account token file, shared credentials file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SecretsError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication { message: message.into() }
    }

    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport { message: message.into() }
    }

    /// Create an invalid reference error.
    pub fn invalid_reference(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidReference { reference: reference.into(), reason: reason.into() }
    }

    /// Create a not supported error.
    pub fn not_supported(operation: impl Into<String>, manager: impl Into<String>) -> Self {
        Self::NotSupported { operation: operation.into(), manager: manager.into() }
    }

    /// Create a database error with context.
    pub fn database(source: sqlx::Error, context: impl Into<String>) -> Self {
        Self::Database { source, context: context.into() }
    }

    /// HTTP status the outer API layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidReference { .. } => 400,
            Self::NotSupported { .. } => 501,
            _ => 500,
        }
    }

    /// Caller-facing message. Server-side failures never expose Vault or database detail.
    pub fn public_message(&self) -> String {
        match self {
            Self::InvalidReference { .. } | Self::NotSupported { .. } => self.to_string(),
            _ => PUBLIC_INTERNAL_MESSAGE.to_string(),
        }
    }
}
