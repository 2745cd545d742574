use thiserror::Error;

/// Common error type for sensorsim components.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid value range: {0}")]
    Range(String),
}

/// Result type alias using sensorsim's Error.
pub type Result<T> = std::result::Result<T, Error>;
