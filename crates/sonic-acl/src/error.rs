//! Error types for the ACL object model.
//!
//! Every error is raised synchronously to the immediate caller. Nothing in
//! this crate retries; retry policy belongs to the transaction layer above.

use sonic_ndi::NdiError;
use thiserror::Error;

/// Result type alias for ACL operations.
pub type AclResult<T> = Result<T, AclError>;

/// Error category, for callers that dispatch on the kind of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AclErrorKind {
    InvalidArgument,
    MissingAttribute,
    Conflict,
    ResourceExhausted,
    NotFound,
    OperationFailed,
}

/// Errors raised by the ACL object model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AclError {
    /// A type code or enumerated value is outside its closed set, or a value
    /// cell has the wrong shape.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Fewer value cells than the active kind requires.
    #[error("Missing attribute: {0}")]
    MissingAttribute(String),

    /// Reserving an id that is already in use.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// No free id left in the generator's range.
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Lookup by id failed.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A device-specific hardware id could not be resolved.
    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl AclError {
    /// Returns the error category.
    pub fn kind(&self) -> AclErrorKind {
        match self {
            Self::InvalidArgument(_) => AclErrorKind::InvalidArgument,
            Self::MissingAttribute(_) => AclErrorKind::MissingAttribute,
            Self::Conflict(_) => AclErrorKind::Conflict,
            Self::ResourceExhausted(_) => AclErrorKind::ResourceExhausted,
            Self::NotFound(_) => AclErrorKind::NotFound,
            Self::OperationFailed(_) => AclErrorKind::OperationFailed,
        }
    }

    /// Returns true if retrying the same call could succeed.
    ///
    /// Always false: every failure here is deterministic for a given store
    /// state.
    pub fn is_retryable(&self) -> bool {
        false
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub(crate) fn missing(msg: impl Into<String>) -> Self {
        Self::MissingAttribute(msg.into())
    }

    pub(crate) fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub(crate) fn failed(msg: impl Into<String>) -> Self {
        Self::OperationFailed(msg.into())
    }
}

impl From<NdiError> for AclError {
    fn from(err: NdiError) -> Self {
        Self::OperationFailed(err.to_string())
    }
}
