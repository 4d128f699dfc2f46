use thiserror::Error;

#[derive(Error, Debug)]
pub enum PacerError {
    #[error("Invalid frame rate: {0}")]
    InvalidFrameRate(f64),

    #[error("Fence wait failed: {0}")]
    FenceFailed(String),

    #[error("Sink is no longer available")]
    SinkUnavailable,

    #[error("Work conversion failed: {0}")]
    Conversion(String),

    #[error("Sink rejected bundle: {0}")]
    SinkRejected(String),

    #[error("Thread priority error: {0}")]
    Priority(String),

    #[error("Failed to spawn thread: {0}")]
    ThreadSpawn(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PacerError>;
