//! Application layer - The stream splitting pipeline, built on the ports.
//!
//! Queue message -> `TaskDispatcher` -> `StreamProcessingTask` -> container
//! reader -> `FrameDecodeAdapter` -> `ImagePublisher` -> object storage.

pub mod decode_adapter;
pub mod dispatcher;
pub mod processing_task;
pub mod publisher;

#[cfg(test)]
pub(crate) mod testing;

pub use dispatcher::{DispatchSettings, TaskDispatcher, VISIBILITY_TIMEOUT_SECONDS};
pub use processing_task::{StreamProcessingTask, TaskOutcome, TaskState, EMPTY_STREAM_BACKOFF};
pub use publisher::{ImagePublisher, PublishReport};
