//! Error types for EcoPoint sync operations

use std::time::Duration;
use thiserror::Error;

/// Failure of a single network request.
///
/// Every variant is recoverable: the caller keeps whatever state it already
/// had and may retry on an explicit refresh.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Request to {endpoint} timed out after {timeout:?}")]
    Timeout { endpoint: String, timeout: Duration },

    #[error("Request to {endpoint} failed with status {status}")]
    Status { endpoint: String, status: u16 },

    #[error("Request to {endpoint} was rejected as unauthorized")]
    Unauthorized { endpoint: String },

    #[error("Connection to {endpoint} failed: {reason}")]
    Connection { endpoint: String, reason: String },

    #[error("Malformed response from {endpoint}: {reason}")]
    MalformedBody { endpoint: String, reason: String },

    #[error("Backend reported failure for {endpoint}: {message}")]
    Backend { endpoint: String, message: String },
}

impl FetchError {
    pub fn endpoint(&self) -> &str {
        match self {
            Self::Timeout { endpoint, .. }
            | Self::Status { endpoint, .. }
            | Self::Unauthorized { endpoint }
            | Self::Connection { endpoint, .. }
            | Self::MalformedBody { endpoint, .. }
            | Self::Backend { endpoint, .. } => endpoint,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// A malformed field in an otherwise usable record.
///
/// Never returned to callers; the field is replaced by a default and this
/// value is logged.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Field {field} of {source_tag} record #{index} degraded to default: {reason}")]
pub struct DataShapeError {
    pub source_tag: String,
    pub index: usize,
    pub field: &'static str,
    pub reason: String,
}

/// One failed member of a request batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub name: String,
    pub error: FetchError,
}

/// Master error type for sync operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("All {} requests in the batch failed", .failures.len())]
    AggregateFailure { failures: Vec<BatchFailure> },
}

impl SyncError {
    /// Whether an explicit user refresh may succeed where this attempt failed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Fetch(FetchError::Unauthorized { .. }) => false,
            Self::Fetch(_) => true,
            Self::AggregateFailure { .. } => true,
        }
    }
}

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;
