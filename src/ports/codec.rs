//! Container and codec capabilities.
//!
//! Both are blocking and run on the blocking thread pool. Container bytes
//! are pulled from a synchronous reader as the stream delivers them.

use crate::domain::{DecodedImage, FragmentBoundary, RawFrame, TrackMetadata};
use std::error::Error;
use std::io::Read;

/// Receives container elements in stream order.
pub trait FrameVisitor {
    fn visit(
        &mut self,
        frame: RawFrame,
        track: &TrackMetadata,
        boundary: Option<FragmentBoundary>,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// Demuxes container bytes into frames and fragment boundaries.
pub trait ContainerReader: Send + Sync {
    /// Drive `visitor` once per frame until `source` is exhausted.
    /// The first visitor or parse error aborts the read and is returned.
    fn read(
        &self,
        source: &mut dyn Read,
        visitor: &mut dyn FrameVisitor,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// Turns encoded frames into images. Holds per-stream codec state.
pub trait FrameDecoder: Send {
    fn decode(
        &mut self,
        frame: &RawFrame,
        track: &TrackMetadata,
    ) -> Result<DecodedImage, Box<dyn Error + Send + Sync>>;
}

/// Creates one decoder per stream task.
pub trait DecoderFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn FrameDecoder>, Box<dyn Error + Send + Sync>>;
}
