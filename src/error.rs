use thiserror::Error;

/// Main error type for simwatch operations
#[derive(Error, Debug)]
pub enum SimwatchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Armory request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Snapshot cache error: {0}")]
    Cache(String),

    #[error("Unexpected character data shape: {0}")]
    DataShape(String),

    #[error("SimulationCraft run error: {0}")]
    Simc(String),

    #[error("Mail error: {0}")]
    Mail(String),
}

pub type Result<T> = std::result::Result<T, SimwatchError>;
