//! libav-backed container reader and frame decoder.

pub mod decoder;
pub mod ebml;
pub mod reader;

pub use decoder::{FfmpegDecoders, FfmpegFrameDecoder};
pub use reader::FfmpegContainerReader;

/// Matroska tag carrying the fragment number of a GetMedia fragment.
pub const FRAGMENT_NUMBER_TAG: &str = "AWS_KINESISVIDEO_FRAGMENT_NUMBER";
