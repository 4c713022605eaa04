use crate::domain::StreamPosition;
use async_trait::async_trait;
use bytes::Bytes;
use std::error::Error;
use std::fmt;
use std::io::Cursor;
use std::sync::Arc;
use tokio::io::AsyncRead;

/// Container bytes as they arrive from the media endpoint.
pub type MediaBody = Box<dyn AsyncRead + Send + Unpin>;

/// Answer to a single media read.
pub struct MediaResponse {
    /// HTTP status of the read
    pub status: u16,
    /// Streamed container bytes. Empty unless the read succeeded.
    pub body: MediaBody,
}

impl MediaResponse {
    /// A successful read whose body is consumed as it arrives.
    pub fn streaming(body: MediaBody) -> Self {
        Self { status: 200, body }
    }

    /// A successful read of an already buffered payload.
    pub fn ok(payload: impl Into<Bytes>) -> Self {
        Self::streaming(Box::new(Cursor::new(payload.into())))
    }

    pub fn unavailable(status: u16) -> Self {
        Self {
            status,
            body: Box::new(tokio::io::empty()),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl fmt::Debug for MediaResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Reads media from one stream endpoint.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StreamMediaPort: Send + Sync {
    /// Fetch the media available after `position`.
    /// A non-2xx answer is returned as a response, transport failures as errors.
    async fn get_media(
        &self,
        stream_id: &str,
        position: &StreamPosition,
    ) -> Result<MediaResponse, Box<dyn Error + Send + Sync>>;
}

/// Locates the endpoint serving a stream's media.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StreamDirectoryPort: Send + Sync {
    /// Resolve the media-read endpoint URI for `stream_id`
    async fn data_endpoint(&self, stream_id: &str) -> Result<String, Box<dyn Error + Send + Sync>>;

    /// Build a media client bound to `endpoint`
    fn media_client(
        &self,
        endpoint: &str,
    ) -> Result<Arc<dyn StreamMediaPort>, Box<dyn Error + Send + Sync>>;
}
