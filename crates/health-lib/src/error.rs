//! Error types for health evaluation

use thiserror::Error;

/// Errors raised while evaluating a resource
#[derive(Debug, Error)]
pub enum HealthError {
    /// The document could not be projected onto the typed shape of its kind.
    #[error("failed to convert {kind} to typed object: {source}")]
    Conversion {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported {kind} apiVersion: {api_version}")]
    Unsupported { kind: String, api_version: String },

    #[error("failed to parse {field} time ({value})")]
    Timestamp { field: String, value: String },

    #[error("health override failed: {0}")]
    Override(String),

    #[error("failed to parse status map: {0}")]
    StatusMap(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("invalid document: {0}")]
    Document(String),
}

impl HealthError {
    /// Structural failures are propagated to the caller next to a best-effort
    /// verdict; everything else folds into an `Unknown` verdict.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            HealthError::Conversion { .. } | HealthError::Override(_)
        )
    }

    pub fn conversion(kind: impl Into<String>, source: serde_json::Error) -> Self {
        HealthError::Conversion {
            kind: kind.into(),
            source,
        }
    }

    pub fn unsupported(kind: impl Into<String>, api_version: impl Into<String>) -> Self {
        HealthError::Unsupported {
            kind: kind.into(),
            api_version: api_version.into(),
        }
    }

    pub fn timestamp(field: impl Into<String>, value: impl Into<String>) -> Self {
        HealthError::Timestamp {
            field: field.into(),
            value: value.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HealthError>;
