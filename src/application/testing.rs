//! In-memory collaborators for pipeline tests.
//!
//! Container payloads are a line-based script instead of real Matroska:
//! `frame` emits an interior frame, `frame <token>` a frame closing fragment
//! `<token>`, `corrupt` makes the read fail at that point and `panic` aborts
//! the reading thread.

use crate::domain::{DecodedImage, FragmentBoundary, RawFrame, StreamPosition, TrackMetadata};
use crate::ports::{
    ContainerReader, DecoderFactory, FrameDecoder, FrameVisitor, MediaResponse, ObjectStorePort,
    QueueMessage, QueuePort, StreamMediaPort,
};
use async_trait::async_trait;
use bytes::Bytes;
use image::Rgb;
use std::collections::{BTreeMap, VecDeque};
use std::error::Error;
use std::io::{BufRead, BufReader, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub fn script(lines: &[&str]) -> Bytes {
    Bytes::from(lines.join("\n"))
}

/// `count` interior frames, the last one closing fragment `token` if given.
pub fn fragment(count: usize, token: Option<&str>) -> Vec<String> {
    let mut lines = vec!["frame".to_string(); count];
    if let (Some(last), Some(token)) = (lines.last_mut(), token) {
        *last = format!("frame {}", token);
    }
    lines
}

pub struct ScriptReader;

impl ContainerReader for ScriptReader {
    fn read(
        &self,
        source: &mut dyn Read,
        visitor: &mut dyn FrameVisitor,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {

        let track = TrackMetadata {
            track_number: 1,
            codec_id: "V_MPEG4/ISO/AVC".to_string(),
            pixel_width: 4,
            pixel_height: 4,
            codec_private_data: Bytes::new(),
        };
        for (timecode, line) in BufReader::new(source).lines().enumerate() {
            let line = line?;
            let mut parts = line.split_whitespace();
            match parts.next() {
                Some("frame") => {
                    let frame = RawFrame {
                        track_number: 1,
                        timecode: timecode as i64,
                        key_frame: timecode == 0,
                        data: Bytes::from(vec![(timecode % 256) as u8]),
                    };
                    visitor.visit(frame, &track, parts.next().map(FragmentBoundary::new))?;
                }
                Some("corrupt") => return Err("unexpected EBML element id".into()),
                Some("panic") => panic!("reader aborted at line {}", timecode),
                _ => {}
            }
        }
        Ok(())
    }
}

/// Decodes each frame to a 4x4 image filled with the frame's first byte.
pub struct SolidDecoder;

impl FrameDecoder for SolidDecoder {
    fn decode(
        &mut self,
        frame: &RawFrame,
        track: &TrackMetadata,
    ) -> Result<DecodedImage, Box<dyn Error + Send + Sync>> {
        let shade = frame.data.first().copied().unwrap_or_default();
        Ok(DecodedImage::from_pixel(
            track.pixel_width,
            track.pixel_height,
            Rgb([shade, shade, shade]),
        ))
    }
}

pub struct SolidDecoders;

impl DecoderFactory for SolidDecoders {
    fn create(&self) -> Result<Box<dyn FrameDecoder>, Box<dyn Error + Send + Sync>> {
        Ok(Box::new(SolidDecoder))
    }
}

/// Answers reads from a fixed script and cancels `stop` once `stop_after`
/// reads were served. Reads past the end of the script get a 404.
pub struct ScriptedMedia {
    responses: Mutex<VecDeque<MediaResponse>>,
    positions: Mutex<Vec<StreamPosition>>,
    stop: CancellationToken,
    stop_after: usize,
    calls: AtomicUsize,
}

impl ScriptedMedia {
    pub fn new(
        responses: Vec<MediaResponse>,
        stop: CancellationToken,
        stop_after: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            positions: Mutex::new(Vec::new()),
            stop,
            stop_after,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
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
        let served = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if served >= self.stop_after {
            self.stop.cancel();
        }
        Ok(self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| MediaResponse::unavailable(404)))
    }
}

/// Keeps every stored object in memory, keyed by `bucket/key`.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    delay: Duration,
}

impl MemoryStore {
    /// Each put waits `delay` before it lands.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn object(&self, path: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl ObjectStorePort for MemoryStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.objects
            .lock()
            .unwrap()
            .insert(format!("{}/{}", bucket, key), body);
        Ok(())
    }
}

/// Serves each batch once, then idles briefly and returns empty batches.
/// Clones share state.
#[derive(Clone, Default)]
pub struct BatchQueue {
    batches: Arc<Mutex<VecDeque<Vec<QueueMessage>>>>,
    deleted: Arc<Mutex<Vec<String>>>,
}

impl BatchQueue {
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

#[async_trait]
impl QueuePort for BatchQueue {
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
