use crate::application::publisher::ImagePublisher;
use crate::domain::{FragmentBoundary, RawFrame, TrackMetadata};
use crate::ports::{FrameDecoder, FrameVisitor};
use std::error::Error;
use tracing::trace;

/// Frame visitor that decodes every frame, hands the image to the publisher
/// and then reports the frame's fragment boundary (or its absence) to
/// `on_boundary`.
pub struct FrameDecodeAdapter<'a, F> {
    decoder: &'a mut dyn FrameDecoder,
    publisher: &'a mut ImagePublisher,
    on_boundary: F,
}

impl<'a, F> FrameDecodeAdapter<'a, F>
where
    F: FnMut(Option<&FragmentBoundary>),
{
    pub fn new(
        decoder: &'a mut dyn FrameDecoder,
        publisher: &'a mut ImagePublisher,
        on_boundary: F,
    ) -> Self {
        Self {
            decoder,
            publisher,
            on_boundary,
        }
    }
}

impl<F> FrameVisitor for FrameDecodeAdapter<'_, F>
where
    F: FnMut(Option<&FragmentBoundary>),
{
    fn visit(
        &mut self,
        frame: RawFrame,
        track: &TrackMetadata,
        boundary: Option<FragmentBoundary>,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        trace!(track = frame.track_number, timecode = frame.timecode, "Decoding frame");
        let image = self.decoder.decode(&frame, track)?;

        let sequence = self.publisher.publish(image);
        trace!(sequence, "Frame decoded, invoking fragment callback");

        (self.on_boundary)(boundary.as_ref());
        Ok(())
    }
}
