//! Error types for catalog loading and record validation.

use std::path::PathBuf;

/// Catalog errors.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    /// Catalog file could not be read.
    #[error("failed to read policy {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Catalog is not valid YAML or does not match the schema.
    #[error("failed to parse policy: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Catalog parsed but breaks an invariant.
    #[error("invalid policy: {reason}")]
    Invalid { reason: String },
}

impl PolicyError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }
}

/// Result type for catalog operations.
pub type PolicyResult<T> = Result<T, PolicyError>;

/// A stored consent record is missing required fields.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid consent record: missing {}", .missing.join(", "))]
pub struct ValidationError {
    /// Wire names of the absent fields.
    pub missing: Vec<&'static str>,
}
