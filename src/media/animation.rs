use std::io::Cursor;

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, DynamicImage, ImageFormat};
use tracing::debug;

use super::still::pack_decoded;
use super::{FrameGeometry, FrameSequence, MediaError, StillImageCodec};

/// Decodes source media into bounded, ordered frame sequences.
///
/// The builder recognises exactly one animated container format (GIF). A
/// source requested as animated that fails the container signature check is
/// rejected rather than guessed at; still sources may be any format the
/// `image` crate decodes.
#[derive(Debug, Clone, Copy)]
pub struct FrameSequenceBuilder {
    geometry: FrameGeometry,
    max_frames: usize,
}

impl FrameSequenceBuilder {
    /// Creates a builder for the given panel geometry and frame cap.
    #[must_use]
    pub fn new(geometry: FrameGeometry, max_frames: usize) -> Self {
        Self {
            geometry,
            max_frames,
        }
    }

    /// Returns whether the source bytes carry the GIF container signature.
    #[must_use]
    pub fn is_animated_container(source_bytes: &[u8]) -> bool {
        matches!(image::guess_format(source_bytes), Ok(ImageFormat::Gif))
    }

    /// Decodes an animated GIF into at most `max_frames` frames.
    ///
    /// Frames keep their original order; frames past the cap are silently
    /// dropped. Per-frame disposal and transparency are flattened to opaque
    /// RGB.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::NotAnimated`] when the signature check fails,
    /// or a decode error when the GIF stream is malformed.
    pub fn build_animated(&self, source_bytes: &[u8]) -> Result<FrameSequence, MediaError> {
        if !Self::is_animated_container(source_bytes) {
            return Err(match image::guess_format(source_bytes) {
                Ok(other) => MediaError::NotAnimated {
                    detected: other.to_mime_type().to_string(),
                },
                Err(source) => MediaError::UnknownFormat(source),
            });
        }

        let decoder = GifDecoder::new(Cursor::new(source_bytes)).map_err(MediaError::Decode)?;
        let mut frames = Vec::new();
        for frame in decoder.into_frames().take(self.max_frames) {
            let frame = frame.map_err(MediaError::Decode)?;
            let flattened = DynamicImage::ImageRgba8(frame.into_buffer());
            frames.push(pack_decoded(&flattened, self.geometry)?);
        }
        if frames.is_empty() {
            return Err(MediaError::EmptyAnimation);
        }

        debug!(frame_count = frames.len(), "decoded animated source");
        Ok(FrameSequence::new(frames, self.max_frames)?)
    }

    /// Decodes a single-frame source into a sequence of length exactly 1.
    ///
    /// # Errors
    ///
    /// Returns an error when the bytes cannot be decoded as an image.
    pub fn build_still(&self, source_bytes: &[u8]) -> Result<FrameSequence, MediaError> {
        let frame = StillImageCodec::encode(source_bytes, self.geometry)?;
        Ok(FrameSequence::new(vec![frame], self.max_frames)?)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use image::codecs::gif::GifEncoder;
    use image::{Delay, Frame, Rgba, RgbaImage};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn gif_with_frames(frame_count: usize) -> Vec<u8> {
        let mut gif_bytes = Vec::new();
        {
            let mut encoder = GifEncoder::new(&mut gif_bytes);
            for index in 0..frame_count {
                let shade = u8::try_from(index % 256).expect("index fits u8");
                let buffer = RgbaImage::from_pixel(2, 2, Rgba([shade, shade, shade, 0xFF]));
                encoder
                    .encode_frame(Frame::from_parts(
                        buffer,
                        0,
                        0,
                        Delay::from_numer_denom_ms(100, 1),
                    ))
                    .expect("in-memory gif encoding should succeed");
            }
        }
        gif_bytes
    }

    fn builder() -> FrameSequenceBuilder {
        FrameSequenceBuilder::new(
            FrameGeometry::new(2, 2).expect("2x2 should be valid"),
            32,
        )
    }

    #[rstest]
    #[case(1)]
    #[case(3)]
    #[case(10)]
    fn build_animated_keeps_source_frame_count(#[case] frame_count: usize) {
        let sequence = builder()
            .build_animated(&gif_with_frames(frame_count))
            .expect("valid gif should decode");

        assert_eq!(frame_count, usize::from(sequence.frame_count()));
    }

    #[test]
    fn build_animated_truncates_long_sources() {
        let sequence = builder()
            .build_animated(&gif_with_frames(40))
            .expect("valid gif should decode");

        assert_eq!(32, sequence.frame_count());
    }

    #[test]
    fn build_animated_rejects_non_gif_container() {
        let mut png_bytes = Vec::new();
        let source = RgbaImage::from_pixel(1, 1, Rgba([0x00, 0x00, 0x00, 0xFF]));
        image::DynamicImage::ImageRgba8(source)
            .write_to(&mut std::io::Cursor::new(&mut png_bytes), ImageFormat::Png)
            .expect("in-memory png encoding should succeed");

        let result = builder().build_animated(&png_bytes);

        assert_matches!(result, Err(MediaError::NotAnimated { detected }) if detected == "image/png");
    }

    #[test]
    fn animated_container_check_matches_gif_signature_only() {
        assert!(FrameSequenceBuilder::is_animated_container(
            &gif_with_frames(1)
        ));
        assert!(!FrameSequenceBuilder::is_animated_container(
            b"\x89PNG\r\n\x1a\n"
        ));
        assert!(!FrameSequenceBuilder::is_animated_container(b"GI"));
    }

    #[test]
    fn build_animated_rejects_unrecognised_bytes() {
        let result = builder().build_animated(b"GI");
        assert_matches!(result, Err(MediaError::UnknownFormat(_)));
    }

    #[test]
    fn build_still_yields_exactly_one_frame() {
        let sequence = builder()
            .build_still(&gif_with_frames(3))
            .expect("gif decodes as a still too");

        assert_eq!(1, sequence.frame_count());
        assert_eq!(8, sequence.to_payload().len());
    }
}
