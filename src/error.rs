//! Error type shared by configuration loading and background execution

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelaxError {
    /// Invalid configuration value
    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("scenario parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A goal panicked while the background worker was iterating
    #[error("background worker failed: {0}")]
    WorkerFault(String),

    #[error("could not spawn background worker: {0}")]
    WorkerSpawn(std::io::Error),
}

pub type RelaxResult<T> = Result<T, RelaxError>;
