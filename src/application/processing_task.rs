use crate::application::decode_adapter::FrameDecodeAdapter;
use crate::application::publisher::{ImagePublisher, PublishReport};
use crate::domain::StreamPosition;
use crate::error::{PortError, TaskError};
use crate::ports::{ContainerReader, DecoderFactory, FrameDecoder, StreamMediaPort};
use std::fmt;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::io::SyncIoBridge;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Pause after a read that returned no media.
pub const EMPTY_STREAM_BACKOFF: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Idle,
    Fetching,
    Reading,
    Sleeping,
    Stopped,
    Failed,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskState::Idle => "idle",
            TaskState::Fetching => "fetching",
            TaskState::Reading => "reading",
            TaskState::Sleeping => "sleeping",
            TaskState::Stopped => "stopped",
            TaskState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// How a task ended.
#[derive(Debug)]
pub struct TaskOutcome {
    pub stream_id: String,
    /// `Stopped` or `Failed`
    pub state: TaskState,
    pub error: Option<TaskError>,
    /// Position the next read would have started from
    pub position: StreamPosition,
    pub frames_published: u64,
    pub publish: PublishReport,
}

/// Decoder, publisher and resume position of one stream. Shared with the
/// blocking pool for each read so that it survives a reader that panics.
struct ReadSession {
    decoder: Box<dyn FrameDecoder>,
    publisher: ImagePublisher,
    position: StreamPosition,
}

impl ReadSession {
    fn read(&mut self, reader: &dyn ContainerReader, source: &mut dyn Read) -> Result<(), PortError> {
        let ReadSession {
            decoder,
            publisher,
            position,
        } = self;
        let mut adapter = FrameDecodeAdapter::new(&mut **decoder, publisher, |boundary| {
            position.advance(boundary)
        });
        reader.read(source, &mut adapter)
    }
}

/// Pulls media from one stream and turns it into stored frames until it is
/// cancelled or reading fails.
pub struct StreamProcessingTask {
    stream_id: String,
    media: Arc<dyn StreamMediaPort>,
    reader: Arc<dyn ContainerReader>,
    session: ReadSession,
    empty_backoff: Duration,
}

impl StreamProcessingTask {
    pub fn new(
        stream_id: impl Into<String>,
        media: Arc<dyn StreamMediaPort>,
        reader: Arc<dyn ContainerReader>,
        decoders: &dyn DecoderFactory,
        publisher: ImagePublisher,
    ) -> Result<Self, TaskError> {
        let decoder = decoders.create().map_err(TaskError::Decoder)?;
        Ok(Self {
            stream_id: stream_id.into(),
            media,
            reader,
            session: ReadSession {
                decoder,
                publisher,
                position: StreamPosition::Earliest,
            },
            empty_backoff: EMPTY_STREAM_BACKOFF,
        })
    }

    pub fn with_empty_backoff(mut self, backoff: Duration) -> Self {
        self.empty_backoff = backoff;
        self
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    /// Run until `cancel` fires or the stream fails. Cancellation is checked
    /// before every fetch and during the empty-stream pause, never during a
    /// read. Outstanding image writes are awaited before returning.
    pub async fn run(self, cancel: CancellationToken) -> TaskOutcome {
        let StreamProcessingTask {
            stream_id,
            media,
            reader,
            session,
            empty_backoff,
        } = self;
        info!(stream = %stream_id, "Starting to wait for media data");

        let session = Arc::new(Mutex::new(session));
        let mut state = TaskState::Idle;
        let mut failure = None;

        loop {
            if cancel.is_cancelled() {
                enter(&stream_id, &mut state, TaskState::Stopped);
                break;
            }

            enter(&stream_id, &mut state, TaskState::Fetching);
            let position = session.lock().await.position.clone();
            debug!(stream = %stream_id, position = %position, "Requesting media");
            let response = match media.get_media(&stream_id, &position).await {
                Ok(response) => response,
                Err(e) => {
                    enter(&stream_id, &mut state, TaskState::Failed);
                    failure = Some(TaskError::Fetch(e));
                    break;
                }
            };

            if !response.is_success() {
                enter(&stream_id, &mut state, TaskState::Sleeping);
                debug!(stream = %stream_id, status = response.status, "No media data in stream");
                let interrupted = tokio::select! {
                    _ = cancel.cancelled() => true,
                    _ = tokio::time::sleep(empty_backoff) => false,
                };
                if interrupted {
                    enter(&stream_id, &mut state, TaskState::Stopped);
                    break;
                }
                continue;
            }

            enter(&stream_id, &mut state, TaskState::Reading);
            let reader = Arc::clone(&reader);
            let shared = Arc::clone(&session);
            let mut source = SyncIoBridge::new(response.body);
            let joined = tokio::task::spawn_blocking(move || {
                shared.blocking_lock().read(reader.as_ref(), &mut source)
            })
            .await;

            let error = match joined {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => TaskError::Read(e),
                Err(e) => TaskError::Join(e),
            };
            enter(&stream_id, &mut state, TaskState::Failed);
            failure = Some(error);
            break;
        }

        let mut finished = session.lock().await;
        let position = finished.position.clone();
        let frames_published = finished.publisher.published();
        let publish = finished.publisher.drain().await;

        match &failure {
            Some(e) => error!(stream = %stream_id, error = %e, "Exception while processing stream"),
            None if publish.failed > 0 => warn!(
                stream = %stream_id,
                failed = publish.failed,
                "Finished processing stream with failed image writes"
            ),
            None => {}
        }
        info!(
            stream = %stream_id,
            state = %state,
            position = %position,
            frames = frames_published,
            stored = publish.stored,
            "Finished processing stream"
        );

        TaskOutcome {
            stream_id,
            state,
            error: failure,
            position,
            frames_published,
            publish,
        }
    }
}

fn enter(stream_id: &str, state: &mut TaskState, next: TaskState) {
    trace!(stream = %stream_id, from = %state, to = %next, "Task state changed");
    *state = next;
}
