use bytes::Bytes;

/// A decoded video frame, ready to be encoded to a raster file.
pub type DecodedImage = image::RgbImage;

/// One encoded frame as it appears in the container.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub track_number: u64,
    pub timecode: i64,
    pub key_frame: bool,
    pub data: Bytes,
}

/// Track description needed to decode frames of that track.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackMetadata {
    pub track_number: u64,
    pub codec_id: String,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub codec_private_data: Bytes,
}
