//! Adapters - Concrete implementations of ports.

#[cfg(feature = "aws")]
pub mod aws;

#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;

pub mod local;
