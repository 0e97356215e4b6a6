
use thiserror::Error;

use crate::model::UrineType;

#[derive(Error, Debug)]
pub enum LabprepError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("No active practices found for the selection")]
    NoPracticesFound,
    #[error("The selected practices have no preparation configured")]
    NoPreparationConfigured,
    #[error("Urine type conflict: {first} vs {second}")]
    UrineTypeConflict { first: UrineType, second: UrineType },
    #[error("Data access error: {0}")]
    DataAccess(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Request timed out after {0} ms")]
    Timeout(u64),
    #[error("Execution error: {0}")]
    Execution(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LabprepError {
    /// Stable machine-readable code used on the HTTP surface.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::NoPracticesFound => "NO_PRACTICES_FOUND",
            Self::NoPreparationConfigured => "NO_PREPARATION_CONFIGURED",
            Self::UrineTypeConflict { .. } => "URINE_TYPE_CONFLICT",
            Self::DataAccess(_) => "DATA_ACCESS",
            Self::Config(_) => "CONFIG",
            Self::Timeout(_) => "TIMEOUT",
            Self::Execution(_) => "EXECUTION",
            Self::Io(_) => "IO",
        }
    }

    /// True for the kinds caused by the caller's selection rather than by the system.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_)
                | Self::NoPracticesFound
                | Self::NoPreparationConfigured
                | Self::UrineTypeConflict { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, LabprepError>;

// Helper conversions
impl From<rusqlite::Error> for LabprepError {
    fn from(e: rusqlite::Error) -> Self { Self::DataAccess(e.to_string()) }
}

impl From<config::ConfigError> for LabprepError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
