//! Error types for dsproxy

use thiserror::Error;

/// Result type alias for driver and proxy operations
pub type DbResult<T> = Result<T, DbError>;

/// Errors produced by drivers and by the proxy layer around them.
///
/// Drivers report failures with the driver-facing variants; proxies hand those
/// back to the caller untouched. The proxy only adds its own variants for
/// failures that happen before the real call runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DbError {
    /// Connection could not be established or was lost
    #[error("Connection error: {0}")]
    Connection(String),

    /// Error reported by the underlying driver, with its vendor/SQLSTATE code
    #[error("Driver error [{code}]: {message}")]
    Driver { code: String, message: String },

    /// Requested column, parameter or row does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation attempted on a closed object
    #[error("{0} is closed")]
    Closed(String),

    /// A query or parameter transformer rejected the call
    #[error("Transform error: {0}")]
    Transform(String),

    /// The connection identity policy failed to produce an id
    #[error("Identity error: {0}")]
    Identity(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl DbError {
    /// Create a driver error with a vendor code
    pub fn driver(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Driver {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a closed error naming the closed object
    pub fn closed(what: impl Into<String>) -> Self {
        Self::Closed(what.into())
    }

    /// Create a transform error
    pub fn transform(message: impl Into<String>) -> Self {
        Self::Transform(message.into())
    }

    /// Create an identity error
    pub fn identity(message: impl Into<String>) -> Self {
        Self::Identity(message.into())
    }

    /// Vendor code of a driver error
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Driver { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Check if this error came from the underlying driver
    pub fn is_driver(&self) -> bool {
        matches!(self, Self::Driver { .. })
    }

    /// Check if this is a transform error
    pub fn is_transform(&self) -> bool {
        matches!(self, Self::Transform(_))
    }

    /// Check if this is an identity error
    pub fn is_identity(&self) -> bool {
        matches!(self, Self::Identity(_))
    }

    pub(crate) fn into_identity(self) -> Self {
        match self {
            Self::Identity(_) => self,
            other => Self::Identity(other.to_string()),
        }
    }
}
