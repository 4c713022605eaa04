//! Fakes shared by the integration tests.
//!
//! Payloads are text: one `frame` line per frame, `frame <token>` for the
//! frame that closes fragment `<token>`.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use frame_splitter::domain::{DecodedImage, FragmentBoundary, RawFrame, StreamPosition, TrackMetadata};
use frame_splitter::ports::{
    ContainerReader, DecoderFactory, FrameDecoder, FrameVisitor, MediaResponse, QueueMessage,
    QueuePort, StreamDirectoryPort, StreamMediaPort,
};
use image::Rgb;
use std::collections::VecDeque;
use std::error::Error;
use std::io::Read;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const WIDTH: u32 = 8;
pub const HEIGHT: u32 = 6;

/// A payload of `count` frames closing fragment `token`.
pub fn fragment_payload(count: usize, token: &str) -> MediaResponse {
    let mut lines = vec!["frame".to_string(); count];
    if let Some(last) = lines.last_mut() {
        *last = format!("frame {}", token);
    }
    MediaResponse::ok(lines.join("\n"))
}

pub struct LineReader;

impl ContainerReader for LineReader {
    fn read(
        &self,
        source: &mut dyn Read,
        visitor: &mut dyn FrameVisitor,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut text = String::new();
        source.read_to_string(&mut text)?;
        let track = TrackMetadata {
            track_number: 1,
            codec_id: "V_MPEG4/ISO/AVC".to_string(),
            pixel_width: WIDTH,
            pixel_height: HEIGHT,
            codec_private_data: Bytes::new(),
        };
        for (timecode, line) in text.lines().enumerate() {
            let mut parts = line.split_whitespace();
            if parts.next() != Some("frame") {
                return Err(format!("unexpected element {:?}", line).into());
            }
            let frame = RawFrame {
                track_number: 1,
                timecode: timecode as i64,
                key_frame: timecode == 0,
                data: Bytes::from(vec![(timecode % 256) as u8]),
            };
            visitor.visit(frame, &track, parts.next().map(FragmentBoundary::new))?;
        }
        Ok(())
    }
}

/// Fills the whole image with the frame's first byte.
pub struct ShadeDecoders;

struct ShadeDecoder;

impl FrameDecoder for ShadeDecoder {
    fn decode(
        &mut self,
        frame: &RawFrame,
        track: &TrackMetadata,
    ) -> Result<DecodedImage, Box<dyn Error + Send + Sync>> {
        let shade = frame.data.first().copied().unwrap_or_default();
        Ok(DecodedImage::from_pixel(
            track.pixel_width,
            track.pixel_height,
            Rgb([shade, 255 - shade, 0]),
        ))
    }
}

impl DecoderFactory for ShadeDecoders {
    fn create(&self) -> Result<Box<dyn FrameDecoder>, Box<dyn Error + Send + Sync>> {
        Ok(Box::new(ShadeDecoder))
    }
}

/// Serves responses in order, then 404s. Cancels `stop` when the last
/// scripted response is handed out.
pub struct ScriptedMedia {
    responses: Mutex<VecDeque<MediaResponse>>,
    positions: Mutex<Vec<StreamPosition>>,
    stop: CancellationToken,
}

impl ScriptedMedia {
    pub fn new(responses: Vec<MediaResponse>, stop: CancellationToken) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            positions: Mutex::new(Vec::new()),
            stop,
        })
    }

    pub fn positions(&self) -> Vec<StreamPosition> {
        self.positions.lock().unwrap().clone()
    }
}

#[async_trait]
impl StreamMediaPort for ScriptedMedia {
    async fn get_media(
        &self,
        _stream_id: &str,
        position: &StreamPosition,
    ) -> Result<MediaResponse, Box<dyn Error + Send + Sync>> {
        self.positions.lock().unwrap().push(position.clone());
        let mut responses = self.responses.lock().unwrap();
        let next = responses.pop_front().unwrap_or_else(|| MediaResponse::unavailable(404));
        if responses.is_empty() {
            self.stop.cancel();
        }
        Ok(next)
    }
}

/// Hands the same media client out for every stream.
pub struct SingleEndpoint {
    pub media: Arc<ScriptedMedia>,
    pub resolved: Mutex<Vec<String>>,
}

#[async_trait]
impl StreamDirectoryPort for SingleEndpoint {
    async fn data_endpoint(&self, stream_id: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
        self.resolved.lock().unwrap().push(stream_id.to_string());
        Ok("https://media.example.test".to_string())
    }

    fn media_client(
        &self,
        _endpoint: &str,
    ) -> Result<Arc<dyn StreamMediaPort>, Box<dyn Error + Send + Sync>> {
        Ok(self.media.clone())
    }
}

/// Delivers each batch once, then empty batches. Clones share state.
#[derive(Clone, Default)]
pub struct ScriptedQueue {
    batches: Arc<Mutex<VecDeque<Vec<QueueMessage>>>>,
    deleted: Arc<Mutex<Vec<String>>>,
}

impl ScriptedQueue {
    pub fn new(batches: Vec<Vec<QueueMessage>>) -> Self {
        Self {
            batches: Arc::new(Mutex::new(batches.into())),
            deleted: Arc::default(),
        }
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

pub fn message(id: &str, body: &str) -> QueueMessage {
    QueueMessage {
        id: id.to_string(),
        body: body.to_string(),
        receipt_handle: format!("receipt-{}", id),
    }
}

#[async_trait]
impl QueuePort for ScriptedQueue {
    async fn receive(
        &self,
        _wait_seconds: u32,
        _visibility_timeout_seconds: u32,
    ) -> Result<Vec<QueueMessage>, Box<dyn Error + Send + Sync>> {
        let batch = self.batches.lock().unwrap().pop_front();
        match batch {
            Some(batch) => Ok(batch),
            None => {
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok(Vec::new())
            }
        }
    }

    async fn delete(&self, receipt_handle: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.deleted.lock().unwrap().push(receipt_handle.to_string());
        Ok(())
    }
}
