use thiserror::Error;

#[derive(Error, Debug)]
pub enum GuardianError {
    #[error("No samples available to train a baseline")]
    EmptyDataset,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<std::io::Error> for GuardianError {
    fn from(err: std::io::Error) -> Self {
        GuardianError::ConfigError(err.to_string())
    }
}

impl From<config::ConfigError> for GuardianError {
    fn from(err: config::ConfigError) -> Self {
        GuardianError::ConfigError(err.to_string())
    }
}
