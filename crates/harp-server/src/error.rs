//! Error types for the endpoint runtime

use harp_core::{ErrorReport, JobId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    /// The endpoint contract rejected the request or failed to build
    #[error(transparent)]
    Endpoint(#[from] harp_core::Error),

    #[error("Job queue is full ({capacity} pending jobs)")]
    QueueFull { capacity: usize },

    #[error("Unknown job: {0}")]
    UnknownJob(JobId),

    #[error("Job queue is shutting down")]
    ShuttingDown,

    #[error("Frame of {len} bytes exceeds limit of {max} bytes")]
    FrameTooLarge { len: usize, max: usize },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ServerError {
    /// Stable snake_case identifier sent to the host.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerError::Endpoint(e) => e.kind(),
            ServerError::QueueFull { .. } => "queue_full",
            ServerError::UnknownJob(_) => "unknown_job",
            ServerError::ShuttingDown => "shutting_down",
            ServerError::FrameTooLarge { .. } | ServerError::Serialization(_) => "protocol_error",
            ServerError::Config(_) => "config_error",
            ServerError::Io(_) => "io_error",
        }
    }

    pub fn report(&self) -> ErrorReport {
        match self {
            ServerError::Endpoint(e) => e.report(),
            other => ErrorReport {
                kind: other.kind().to_string(),
                message: other.to_string(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
