//! Error types for the fleet upgrader

use thiserror::Error;

/// Main error type for the fleet upgrader
#[derive(Error, Debug)]
pub enum FleetError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Command failure: {0}")]
    CommandFailure(String),

    #[error("Parse failure: {0}")]
    ParseFailure(String),

    #[error("Transfer failure: {0}")]
    TransferFailure(String),

    #[error("Timeout failure: {0}")]
    TimeoutFailure(String),

    #[error("State error: {0}")]
    StateError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Inventory error: {0}")]
    InventoryError(String),
}

impl From<anyhow::Error> for FleetError {
    fn from(err: anyhow::Error) -> Self {
        FleetError::CommandFailure(err.to_string())
    }
}
