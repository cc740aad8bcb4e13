use netcap_control::ControlPlaneError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Listing services failed: {0}")]
    DiscoveryFailed(#[source] ControlPlaneError),

    #[error("no services found with prefix {0:?}")]
    NoServices(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Control plane error: {0}")]
    ControlPlane(#[from] ControlPlaneError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required flags: {}", .0.join(", "))]
    Missing(Vec<String>),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
