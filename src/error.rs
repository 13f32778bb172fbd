//! Error types for sequence processing.

use std::fmt;

/// Result type alias using [`SequenceError`].
pub type Result<T> = std::result::Result<T, SequenceError>;

/// Top-level error for a sequencing run.
///
/// Every variant aborts the run. Records already handed to the sink before
/// the failure are not rolled back.
#[derive(Debug, thiserror::Error)]
pub enum SequenceError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to read metadata of {id}: {source}")]
    MetadataRead {
        id: String,
        #[source]
        source: MetadataError,
    },

    #[error("failed to write metadata of {id}: {source}")]
    MetadataWrite {
        id: String,
        #[source]
        source: MetadataError,
    },

    #[error("{operation}: {reason}")]
    MathDomain {
        operation: &'static str,
        reason: String,
    },
}

impl SequenceError {
    pub fn metadata_read(id: impl Into<String>, source: MetadataError) -> Self {
        Self::MetadataRead { id: id.into(), source }
    }

    pub fn metadata_write(id: impl Into<String>, source: MetadataError) -> Self {
        Self::MetadataWrite { id: id.into(), source }
    }

    pub fn math_domain(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::MathDomain { operation, reason: reason.into() }
    }

    /// Identifier of the record the error belongs to, if any.
    pub fn record_id(&self) -> Option<&str> {
        match self {
            Self::MetadataRead { id, .. } | Self::MetadataWrite { id, .. } => Some(id),
            Self::Config(_) | Self::MathDomain { .. } => None,
        }
    }
}

/// Invalid or conflicting transformation settings, reported before any record
/// is processed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("options `{first}` and `{second}` cannot be combined")]
    MutuallyExclusive {
        first: &'static str,
        second: &'static str,
    },

    #[error("option `{flag}` requires option `{requires}`")]
    MissingRequirement {
        flag: &'static str,
        requires: &'static str,
    },

    #[error("invalid argument `{value}` for option `{flag}`: {reason}")]
    InvalidArgument {
        flag: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    pub fn invalid_argument(
        flag: &'static str,
        value: impl Into<String>,
        reason: impl fmt::Display,
    ) -> Self {
        Self::InvalidArgument {
            flag,
            value: value.into(),
            reason: reason.to_string(),
        }
    }
}

/// Failure reported by a metadata collaborator.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct MetadataError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl MetadataError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), source: None }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self { message: message.into(), source: Some(Box::new(source)) }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<std::io::Error> for MetadataError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(err.to_string(), err)
    }
}
