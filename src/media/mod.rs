use std::path::PathBuf;

use thiserror::Error;

mod animation;
mod pixel_frame;
mod still;

pub use self::animation::FrameSequenceBuilder;
pub use self::pixel_frame::{
    FrameGeometry, FrameSequence, PixelFrame, PixelFrameError, pack_rgb565, unpack_rgb565,
};
pub use self::still::StillImageCodec;

/// Errors returned while turning source media into upload frames.
#[derive(Debug, Error)]
pub enum MediaError {
    /// The source file could not be read from disk.
    #[error("failed to read source file `{path}`")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The source bytes are not a recognisable image container.
    #[error("failed to detect image format from source bytes")]
    UnknownFormat(#[source] image::ImageError),
    /// The source image failed to decode.
    #[error("failed to decode source image")]
    Decode(#[source] image::ImageError),
    /// An animated upload was requested for a non-GIF source.
    #[error("not an animated image: expected a GIF container, detected {detected}")]
    NotAnimated { detected: String },
    /// The animated container decoded to zero frames.
    #[error("animated source contains no frames")]
    EmptyAnimation,
    /// The packed output failed frame validation.
    #[error(transparent)]
    Frame(#[from] PixelFrameError),
}
