//! Ports - Trait definitions for the collaborators the pipeline talks to.

pub mod codec;
pub mod queue;
pub mod storage;
pub mod stream;

pub use codec::{ContainerReader, DecoderFactory, FrameDecoder, FrameVisitor};
pub use queue::{QueueMessage, QueuePort};
pub use storage::ObjectStorePort;
pub use stream::{MediaResponse, StreamDirectoryPort, StreamMediaPort};
