//! Domain layer - Pure data types for requests, stream positions and frames.

pub mod frame;
pub mod keys;
pub mod position;
pub mod request;

pub use frame::{DecodedImage, RawFrame, TrackMetadata};
pub use position::{FragmentBoundary, StreamPosition};
pub use request::{ProcessingRequest, RequestError};
