use crate::domain::{DecodedImage, RawFrame, TrackMetadata};
use crate::ports::codec::{DecoderFactory, FrameDecoder};
use ffmpeg_next as ffmpeg;
use std::error::Error;

/// Decodes frames of one track to RGB images with libavcodec.
///
/// The codec context is opened on the first frame and reopened whenever the
/// track description changes.
pub struct FfmpegFrameDecoder {
    opened: Option<(TrackMetadata, ffmpeg::decoder::Video)>,
    decoded: ffmpeg::util::frame::Video,
}

impl FfmpegFrameDecoder {
    pub fn new() -> Self {
        Self {
            opened: None,
            decoded: ffmpeg::util::frame::Video::empty(),
        }
    }

    fn decoder_for(
        &mut self,
        track: &TrackMetadata,
    ) -> Result<&mut ffmpeg::decoder::Video, Box<dyn Error + Send + Sync>> {
        let stale = !matches!(&self.opened, Some((current, _)) if current == track);
        if stale {
            self.opened = Some((track.clone(), open_decoder(track)?));
        }
        match self.opened.as_mut() {
            Some((_, decoder)) => Ok(decoder),
            None => Err(ffmpeg::Error::DecoderNotFound.into()),
        }
    }
}

impl Default for FfmpegFrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

fn open_decoder(
    track: &TrackMetadata,
) -> Result<ffmpeg::decoder::Video, Box<dyn Error + Send + Sync>> {
    let codec = ffmpeg::decoder::find_by_name(&track.codec_id)
        .ok_or_else(|| format!("No decoder for codec {}", track.codec_id))?;
    let mut context = ffmpeg::codec::context::Context::new_with_codec(codec);

    // SAFETY: the context is freshly allocated and not yet opened. Extradata
    // is allocated with av_mallocz so avcodec_free_context can release it.
    unsafe {
        let raw = context.as_mut_ptr();
        (*raw).width = track.pixel_width as i32;
        (*raw).height = track.pixel_height as i32;
        (*raw).flags |= ffmpeg::ffi::AV_CODEC_FLAG_LOW_DELAY as i32;
        if !track.codec_private_data.is_empty() {
            let len = track.codec_private_data.len();
            let padded = len + ffmpeg::ffi::AV_INPUT_BUFFER_PADDING_SIZE as usize;
            let extradata = ffmpeg::ffi::av_mallocz(padded) as *mut u8;
            if extradata.is_null() {
                return Err("Failed to allocate codec extradata".into());
            }
            std::ptr::copy_nonoverlapping(track.codec_private_data.as_ptr(), extradata, len);
            (*raw).extradata = extradata;
            (*raw).extradata_size = len as i32;
        }
    }

    Ok(context.decoder().video()?)
}

impl FrameDecoder for FfmpegFrameDecoder {
    fn decode(
        &mut self,
        frame: &RawFrame,
        track: &TrackMetadata,
    ) -> Result<DecodedImage, Box<dyn Error + Send + Sync>> {
        let mut packet = ffmpeg::Packet::copy(&frame.data);
        packet.set_pts(Some(frame.timecode));
        if frame.key_frame {
            packet.set_flags(ffmpeg::packet::Flags::KEY);
        }

        let mut decoded = std::mem::replace(&mut self.decoded, ffmpeg::util::frame::Video::empty());
        let received = {
            let decoder = self.decoder_for(track)?;
            decoder.send_packet(&packet)?;
            decoder.receive_frame(&mut decoded)
        };
        let image = match received {
            Ok(()) => to_rgb_image(&decoded),
            Err(e) => Err(format!("No picture for frame at {}: {}", frame.timecode, e).into()),
        };
        self.decoded = decoded;
        image
    }
}

fn to_rgb_image(
    frame: &ffmpeg::util::frame::Video,
) -> Result<DecodedImage, Box<dyn Error + Send + Sync>> {
    let (width, height) = (frame.width(), frame.height());
    let mut scaler = ffmpeg::software::scaling::context::Context::get(
        frame.format(),
        width,
        height,
        ffmpeg::format::Pixel::RGB24,
        width,
        height,
        ffmpeg::software::scaling::flag::Flags::BILINEAR,
    )?;
    let mut rgb_frame = ffmpeg::util::frame::Video::empty();
    scaler.run(frame, &mut rgb_frame)?;

    // Rows may be padded past width * 3.
    let row_len = width as usize * 3;
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let mut buffer = Vec::with_capacity(row_len * height as usize);
    for row in data.chunks(stride).take(height as usize) {
        buffer.extend_from_slice(&row[..row_len]);
    }

    DecodedImage::from_raw(width, height, buffer)
        .ok_or_else(|| "Failed to create image buffer".into())
}

/// Hands out a fresh [`FfmpegFrameDecoder`] per stream task.
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegDecoders;

impl FfmpegDecoders {
    pub fn new() -> Result<Self, Box<dyn Error + Send + Sync>> {
        ffmpeg::init()?;
        Ok(Self)
    }
}

impl DecoderFactory for FfmpegDecoders {
    fn create(&self) -> Result<Box<dyn FrameDecoder>, Box<dyn Error + Send + Sync>> {
        Ok(Box::new(FfmpegFrameDecoder::new()))
    }
}
