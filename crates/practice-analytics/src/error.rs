//! Analytics error types.

use practice_domain::DomainError;
use thiserror::Error;

/// Analytics errors.
#[derive(Error, Debug)]
pub enum AnalyticsError {
    /// Load validation or unknown-key failure from the domain layer
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Report serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AnalyticsError {
    /// Malformed, negative, or duplicate input; the load was rejected.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Domain(e) if e.is_validation())
    }

    /// Unknown metric, group, period, or other lookup name.
    pub fn is_unknown_key(&self) -> bool {
        matches!(self, Self::Domain(DomainError::UnknownKey { .. }))
    }
}

impl From<serde_json::Error> for AnalyticsError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for analytics operations.
pub type Result<T> = std::result::Result<T, AnalyticsError>;
