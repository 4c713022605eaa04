use crate::domain::keys::{normalize_prefix, object_key, IMAGE_CONTENT_TYPE};
use crate::domain::DecodedImage;
use crate::error::PublishError;
use crate::ports::ObjectStorePort;
use image::ImageFormat;
use std::io::Cursor;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

/// Totals of finished publish work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub stored: u64,
    pub failed: u64,
}

/// Publishes decoded frames of one stream to object storage.
///
/// `publish` assigns sequence numbers in call order and returns immediately;
/// encoding and upload run on a pool of at most `threads` concurrent writes.
/// Writes can finish in any order, only the key carries the decode order.
pub struct ImagePublisher {
    storage: Arc<dyn ObjectStorePort>,
    bucket: Arc<str>,
    prefix: String,
    // u64 is enough for one frame per microsecond for half a million years.
    next_sequence: u64,
    slots: Arc<Semaphore>,
    runtime: Handle,
    pending: JoinSet<Result<String, PublishError>>,
    report: PublishReport,
}

impl ImagePublisher {
    /// Must be called from within a tokio runtime; publish work is spawned onto it.
    pub fn new(
        storage: Arc<dyn ObjectStorePort>,
        bucket: impl Into<String>,
        directory: &str,
        threads: usize,
    ) -> Self {
        Self {
            storage,
            bucket: Arc::from(bucket.into()),
            prefix: normalize_prefix(directory),
            next_sequence: 1,
            slots: Arc::new(Semaphore::new(threads.max(1))),
            runtime: Handle::current(),
            pending: JoinSet::new(),
            report: PublishReport::default(),
        }
    }

    /// Schedule `image` for storage and return its sequence number.
    /// Safe to call from blocking threads.
    pub fn publish(&mut self, image: DecodedImage) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let key = object_key(&self.prefix, sequence);
        debug!(bucket = %self.bucket, key = %key, "Publishing image no. {}", sequence);

        let work = store_image(
            Arc::clone(&self.storage),
            Arc::clone(&self.bucket),
            key,
            image,
            Arc::clone(&self.slots),
        );
        self.pending.spawn_on(work, &self.runtime);
        self.collect_finished();

        sequence
    }

    /// Number of images handed to `publish` so far.
    pub fn published(&self) -> u64 {
        self.next_sequence - 1
    }

    /// Wait for every scheduled write to finish.
    pub async fn drain(&mut self) -> PublishReport {
        while let Some(result) = self.pending.join_next().await {
            self.record(result);
        }
        self.report
    }

    fn collect_finished(&mut self) {
        while let Some(result) = self.pending.try_join_next() {
            self.record(result);
        }
    }

    fn record(&mut self, result: Result<Result<String, PublishError>, tokio::task::JoinError>) {
        match result {
            Ok(Ok(_)) => self.report.stored += 1,
            Ok(Err(_)) => self.report.failed += 1,
            Err(e) => {
                error!(bucket = %self.bucket, error = %e, "Publish worker aborted");
                self.report.failed += 1;
            }
        }
    }
}

async fn store_image(
    storage: Arc<dyn ObjectStorePort>,
    bucket: Arc<str>,
    key: String,
    image: DecodedImage,
    slots: Arc<Semaphore>,
) -> Result<String, PublishError> {
    // The semaphore is never closed.
    let _slot = slots.acquire_owned().await.ok();
    debug!(bucket = %bucket, key = %key, "Start internal image publish");

    let result = encode_and_put(storage.as_ref(), &bucket, &key, image).await;
    match &result {
        Ok(()) => info!(bucket = %bucket, key = %key, "Successfully published image"),
        Err(e) => error!(bucket = %bucket, key = %key, error = %e, "Failed to write frame"),
    }
    result.map(|()| key)
}

async fn encode_and_put(
    storage: &dyn ObjectStorePort,
    bucket: &str,
    key: &str,
    image: DecodedImage,
) -> Result<(), PublishError> {
    let encoded = tokio::task::spawn_blocking(move || encode_png(&image))
        .await
        .map_err(|source| PublishError::Join {
            key: key.to_string(),
            source,
        })?
        .map_err(|source| PublishError::Encode {
            key: key.to_string(),
            source,
        })?;

    storage
        .put_object(bucket, key, encoded, IMAGE_CONTENT_TYPE)
        .await
        .map_err(|source| PublishError::Store {
            key: key.to_string(),
            source,
        })
}

fn encode_png(image: &DecodedImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}
