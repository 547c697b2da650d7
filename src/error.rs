// Error taxonomy for the simulation core

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Error, Debug)]
pub enum SimError {
    /// Invalid parameters; the simulation refuses to start.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Numerical anomaly that would otherwise poison the population with NaN.
    #[error("domain error: {0}")]
    Domain(String),

    /// Snapshot contents disagree with the dimensions they claim.
    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SimError {
    pub fn config(msg: impl Into<String>) -> Self {
        SimError::Configuration(msg.into())
    }
}
