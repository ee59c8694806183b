//! Error types for the command-line front end.

use std::path::PathBuf;

/// All errors that can occur while running a command.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] nanofolio::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("price file error: {0}")]
    Prices(String),

    #[error("failed to read price file {path}: {source}")]
    PricesRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("weights file error: {0}")]
    Weights(String),

    #[error("failed to read weights file {path}: {source}")]
    WeightsRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
