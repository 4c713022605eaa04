//! AWS adapters: SQS queue, S3 storage, Kinesis Video Streams media.

pub mod kinesis;
pub mod s3;
pub mod sqs;

pub use kinesis::{KinesisVideoAdapter, KinesisVideoMediaAdapter};
pub use s3::S3Adapter;
pub use sqs::SqsAdapter;
