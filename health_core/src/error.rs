//! Error types for the health_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for health_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The health data source does not exist on this device
    #[error("Health data is not available on this device.")]
    HealthDataUnavailable,

    /// The data source refused access before any fetch ran
    #[error("Health data authorization failed: {0}")]
    AuthorizationDenied(String),

    /// Every enabled metric came back empty
    #[error("No data found for the selected metrics and date range.")]
    NoDataFound,

    /// The requested date range or record count cannot be resolved
    #[error("The selected date range is invalid: {0}")]
    InvalidDateRange(String),

    /// A single metric fetch failed inside the data source
    #[error("Fetch failed for {metric}: {reason}")]
    Fetch { metric: String, reason: String },

    /// The sink could not persist the finished document
    #[error("Failed to save the CSV file: {0}")]
    WriteFailed(String),

    /// The export was cancelled before the join completed
    #[error("Export cancelled")]
    Cancelled,

    /// Generic error
    #[error("{0}")]
    Other(String),
}
