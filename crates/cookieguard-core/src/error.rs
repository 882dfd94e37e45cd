//! Error types for the consent flow.

use cookieguard_policy::{PolicyError, ValidationError};

/// Failure of the persistence backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Reading the stored value failed.
    #[error("failed to read {key}: {message}")]
    Read { key: String, message: String },

    /// The backend rejected a write.
    #[error("failed to write {key}: {message}")]
    Write { key: String, message: String },

    /// The backend is full.
    #[error("storage quota exceeded writing {key}: {needed} bytes, {quota} allowed")]
    QuotaExceeded {
        key: String,
        needed: usize,
        quota: usize,
    },

    /// Removing the stored value failed.
    #[error("failed to remove {key}: {message}")]
    Remove { key: String, message: String },
}

/// A consent-change subscriber failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("consent listener failed: {message}")]
pub struct ListenerError {
    pub message: String,
}

impl ListenerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for ListenerError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(format!("{err:#}"))
    }
}

/// Consent errors.
#[derive(Debug, thiserror::Error)]
pub enum ConsentError {
    /// Persisting the consent record failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A consent record is structurally invalid.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The cookie catalog could not be loaded.
    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// The audit endpoint could not be reached.
    #[error("network error: {message}")]
    Network { message: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl ConsentError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } | Self::Policy(_) => 2,
            Self::Storage(_) => 3,
            Self::Validation(_) => 4,
            Self::Network { .. } => 5,
        }
    }
}

impl From<reqwest::Error> for ConsentError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network {
            message: err.to_string(),
        }
    }
}

/// Result type for consent operations.
pub type ConsentResult<T> = Result<T, ConsentError>;
