//! Frame Splitter - Kinesis Video frame extraction service
//!
//! Hexagonal Architecture:
//! - domain/: Requests, stream positions, frames and object keys
//! - ports/: Trait definitions (queue, storage, stream media, codec)
//! - adapters/: Concrete implementations
//! - application/: Dispatcher, stream processing task, image publisher
//! - config: Flag and environment configuration
//!
//! # Features
//! - `aws`: SQS, S3 and Kinesis Video adapters (default)
//! - `ffmpeg`: libav container reader and frame decoder
//! - `full`: All features

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;

pub use config::{SplitterArgs, SplitterConfig};
pub use error::{ConfigError, PublishError, TaskError};
