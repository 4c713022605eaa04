use super::ebml::{fragment_number, SegmentSplitter};
use super::FRAGMENT_NUMBER_TAG;
use crate::domain::{FragmentBoundary, RawFrame, TrackMetadata};
use crate::ports::codec::{ContainerReader, FrameVisitor};
use bytes::Bytes;
use ffmpeg_next as ffmpeg;
use std::error::Error;
use std::io::{Read, Write};
use tracing::debug;

/// Demuxes a stream of Matroska fragments with libavformat.
///
/// The stream is cut into fragments as it arrives and each one is spooled
/// to a temporary file, since libavformat reads from a path. Only the best
/// video track is visited. A fragment's number is attached to its last frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegContainerReader;

impl FfmpegContainerReader {
    pub fn new() -> Result<Self, Box<dyn Error + Send + Sync>> {
        ffmpeg::init()?;
        Ok(Self)
    }

    fn read_fragment(
        &self,
        fragment: &[u8],
        visitor: &mut dyn FrameVisitor,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut spool = tempfile::Builder::new()
            .prefix("fragment-")
            .suffix(".mkv")
            .tempfile()?;
        spool.write_all(fragment)?;
        spool.flush()?;

        let mut ictx = ffmpeg::format::input(&spool.path())?;
        let input_stream = ictx
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or(ffmpeg::Error::StreamNotFound)?;
        let stream_index = input_stream.index();
        let track = track_metadata(&input_stream)?;

        let mut pending: Option<RawFrame> = None;
        for (stream, packet) in ictx.packets() {
            if stream.index() != stream_index {
                continue;
            }
            let Some(data) = packet.data() else {
                continue;
            };
            let frame = RawFrame {
                track_number: track.track_number,
                timecode: packet.pts().unwrap_or_default(),
                key_frame: packet.is_key(),
                data: Bytes::copy_from_slice(data),
            };
            if let Some(previous) = pending.replace(frame) {
                visitor.visit(previous, &track, None)?;
            }
        }

        let boundary = fragment_number(fragment)
            .or_else(|| ictx.metadata().get(FRAGMENT_NUMBER_TAG).map(str::to_string))
            .map(FragmentBoundary::new);
        debug!(
            codec = %track.codec_id,
            bytes = fragment.len(),
            fragment = ?boundary.as_ref().map(FragmentBoundary::token),
            "Demuxed fragment"
        );
        if let Some(last) = pending {
            visitor.visit(last, &track, boundary)?;
        }
        Ok(())
    }
}

impl ContainerReader for FfmpegContainerReader {
    fn read(
        &self,
        source: &mut dyn Read,
        visitor: &mut dyn FrameVisitor,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut fragments = SegmentSplitter::new(source);
        while let Some(fragment) = fragments.next_segment()? {
            self.read_fragment(&fragment, visitor)?;
        }
        Ok(())
    }
}

fn track_metadata(
    stream: &ffmpeg::format::stream::Stream,
) -> Result<TrackMetadata, Box<dyn Error + Send + Sync>> {
    let parameters = stream.parameters();
    let codec = ffmpeg::decoder::find(parameters.id()).ok_or(ffmpeg::Error::DecoderNotFound)?;
    let video = ffmpeg::codec::context::Context::from_parameters(parameters.clone())?
        .decoder()
        .video()?;

    // SAFETY: the parameters outlive this borrow and extradata_size bounds
    // the allocation libavformat filled in.
    let codec_private_data = unsafe {
        let raw = parameters.as_ptr();
        if (*raw).extradata.is_null() || (*raw).extradata_size <= 0 {
            Bytes::new()
        } else {
            Bytes::copy_from_slice(std::slice::from_raw_parts(
                (*raw).extradata,
                (*raw).extradata_size as usize,
            ))
        }
    };

    Ok(TrackMetadata {
        track_number: stream.index() as u64 + 1,
        codec_id: codec.name().to_string(),
        pixel_width: video.width(),
        pixel_height: video.height(),
        codec_private_data,
    })
}
