use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InstrumentationError {
    #[error("Unsupported by this environment: {0}")]
    Unsupported(String),

    #[error("Platform call failed: {0}")]
    Platform(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Failure reported by a log sink for a single record
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Log emission failed: {0}")]
pub struct SinkError(pub String);
