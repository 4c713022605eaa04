//! Error types for the frame splitter.

use std::error::Error;
use thiserror::Error;

/// Errors from the port traits.
pub type PortError = Box<dyn Error + Send + Sync>;

/// Invalid process configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("waitSeconds must be >= 0 and <= 20, got {0}")]
    WaitSecondsOutOfRange(u32),

    #[error("{name} must be at least 1")]
    ZeroThreads { name: &'static str },

    #[error("Region and queue name is required")]
    MissingRequired,
}

/// Reasons a stream processing task ends in `Failed`
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("media fetch failed: {0}")]
    Fetch(#[source] PortError),

    #[error("failed to create frame decoder: {0}")]
    Decoder(#[source] PortError),

    #[error("container read failed: {0}")]
    Read(#[source] PortError),

    #[error("reader thread panicked or was cancelled: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A single image that could not be stored
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to encode image {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to write image {key} to storage: {source}")]
    Store {
        key: String,
        #[source]
        source: PortError,
    },

    #[error("publish worker for {key} did not complete: {source}")]
    Join {
        key: String,
        #[source]
        source: tokio::task::JoinError,
    },
}
