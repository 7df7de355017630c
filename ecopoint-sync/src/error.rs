//! Error types for the sync binary.

use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::transport::TransportBuildError;
use ecopoint_core::SyncError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Transport(#[from] TransportBuildError),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Invalid argument: {0}")]
    Args(String),
}
