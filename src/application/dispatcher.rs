use crate::application::processing_task::{StreamProcessingTask, TaskOutcome};
use crate::application::publisher::ImagePublisher;
use crate::domain::ProcessingRequest;
use crate::error::PortError;
use crate::ports::{
    ContainerReader, DecoderFactory, ObjectStorePort, QueueMessage, QueuePort, StreamDirectoryPort,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Received messages stay hidden for this long. Kept short so a crashed
/// dispatcher's messages come back quickly.
pub const VISIBILITY_TIMEOUT_SECONDS: u32 = 10;

/// Pause before polling again after the queue itself failed.
const RECEIVE_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy)]
pub struct DispatchSettings {
    /// Long-poll wait per receive, 0..=20
    pub wait_seconds: u32,
    /// Streams processed concurrently
    pub frame_splitter_threads: usize,
    /// Concurrent image writes per stream
    pub image_publisher_threads: usize,
}

/// Polls the queue and runs one `StreamProcessingTask` per valid request.
///
/// Every received message is deleted after it was handled, whether or not a
/// task could be started for it.
pub struct TaskDispatcher<Q, D> {
    queue: Q,
    directory: D,
    storage: Arc<dyn ObjectStorePort>,
    reader: Arc<dyn ContainerReader>,
    decoders: Arc<dyn DecoderFactory>,
    settings: DispatchSettings,
    slots: Arc<Semaphore>,
    tasks: JoinSet<TaskOutcome>,
}

impl<Q, D> TaskDispatcher<Q, D>
where
    Q: QueuePort,
    D: StreamDirectoryPort,
{
    pub fn new(
        queue: Q,
        directory: D,
        storage: Arc<dyn ObjectStorePort>,
        reader: Arc<dyn ContainerReader>,
        decoders: Arc<dyn DecoderFactory>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            queue,
            directory,
            storage,
            reader,
            decoders,
            settings,
            slots: Arc::new(Semaphore::new(settings.frame_splitter_threads.max(1))),
            tasks: JoinSet::new(),
        }
    }

    /// Dispatch loop. Only returns once `shutdown` is cancelled, after every
    /// running stream task has stopped and drained its image writes.
    pub async fn run(&mut self, shutdown: CancellationToken) {
        info!(
            wait_seconds = self.settings.wait_seconds,
            frame_splitter_threads = self.settings.frame_splitter_threads,
            "Dispatcher started, polling for messages"
        );

        loop {
            let received = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                received = self.queue.receive(self.settings.wait_seconds, VISIBILITY_TIMEOUT_SECONDS) => received,
            };
            self.collect_finished();

            match received {
                Ok(messages) if messages.is_empty() => info!("No messages"),
                Ok(messages) => {
                    for message in &messages {
                        self.handle_message(message, &shutdown).await;
                    }
                }
                Err(e) => {
                    error!(error = %e, "Queue receive failed");
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(RECEIVE_RETRY_DELAY) => {}
                    }
                }
            }
        }

        info!(running = self.tasks.len(), "Dispatcher stopping, waiting for stream tasks");
        while let Some(result) = self.tasks.join_next().await {
            report(result);
        }
        info!("Dispatcher stopped");
    }

    /// Number of stream tasks submitted and not yet collected.
    pub fn running_tasks(&self) -> usize {
        self.tasks.len()
    }

    async fn handle_message(&mut self, message: &QueueMessage, shutdown: &CancellationToken) {
        info!(message_id = %message.id, body = %message.body, "Received message");

        match ProcessingRequest::from_message_body(&message.body) {
            Ok(request) => match self.submit(request, shutdown.child_token()).await {
                Ok(()) => info!(message_id = %message.id, "Message submitted for processing"),
                Err(e) => error!(
                    message_id = %message.id,
                    error = %e,
                    "Failed to start stream processing"
                ),
            },
            // Dropped, not retried. A dead-letter queue would keep it.
            Err(e) => error!(
                message_id = %message.id,
                body = %message.body,
                error = %e,
                "Can't deserialize message body"
            ),
        }

        if let Err(e) = self.queue.delete(&message.receipt_handle).await {
            error!(message_id = %message.id, error = %e, "Failed to delete message");
        }
    }

    async fn submit(
        &mut self,
        request: ProcessingRequest,
        cancel: CancellationToken,
    ) -> Result<(), PortError> {
        let endpoint = self.directory.data_endpoint(&request.stream_arn).await?;
        debug!(stream = %request.stream_arn, endpoint = %endpoint, "Resolved media endpoint");
        let media = self.directory.media_client(&endpoint)?;

        let publisher = ImagePublisher::new(
            Arc::clone(&self.storage),
            request.bucket,
            &request.s3_directory,
            self.settings.image_publisher_threads,
        );
        let task = StreamProcessingTask::new(
            request.stream_arn,
            media,
            Arc::clone(&self.reader),
            self.decoders.as_ref(),
            publisher,
        )?;

        let slots = Arc::clone(&self.slots);
        self.tasks.spawn(async move {
            // The semaphore is never closed.
            let _slot = slots.acquire_owned().await.ok();
            task.run(cancel).await
        });
        Ok(())
    }

    fn collect_finished(&mut self) {
        while let Some(result) = self.tasks.try_join_next() {
            report(result);
        }
    }
}

fn report(result: Result<TaskOutcome, JoinError>) {
    match result {
        Ok(outcome) => debug!(
            stream = %outcome.stream_id,
            state = %outcome.state,
            frames = outcome.frames_published,
            "Stream task collected"
        ),
        Err(e) => error!(error = %e, "Stream task panicked"),
    }
}
