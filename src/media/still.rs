use std::io::Cursor;

use image::DynamicImage;
use image::imageops::FilterType;

use super::{FrameGeometry, MediaError, PixelFrame, pack_rgb565};

/// Converts decoded still images into packed RGB565 panel frames.
pub struct StillImageCodec;

impl StillImageCodec {
    /// Decodes, orients, resizes, and packs source bytes into one frame.
    ///
    /// The image is forced to RGB (alpha is discarded, not composited) and
    /// resized to exactly the panel geometry before packing.
    ///
    /// # Errors
    ///
    /// Returns an error when the bytes are not a decodable image.
    pub fn encode(source_bytes: &[u8], geometry: FrameGeometry) -> Result<PixelFrame, MediaError> {
        let format = image::guess_format(source_bytes).map_err(MediaError::UnknownFormat)?;
        let decoded = image::load_from_memory_with_format(source_bytes, format)
            .map_err(MediaError::Decode)?;
        let oriented = apply_exif_orientation(decoded, source_bytes);
        pack_decoded(&oriented, geometry)
    }
}

/// Resizes a decoded image to the panel geometry and packs it to RGB565.
///
/// Shared by the still codec and the animated-frame path.
pub(crate) fn pack_decoded(
    image: &DynamicImage,
    geometry: FrameGeometry,
) -> Result<PixelFrame, MediaError> {
    let rgb = image
        .resize_exact(
            u32::from(geometry.width()),
            u32::from(geometry.height()),
            FilterType::Lanczos3,
        )
        .to_rgb8();

    let pixels: Vec<u16> = rgb
        .pixels()
        .map(|pixel| pack_rgb565(pixel.0[0], pixel.0[1], pixel.0[2]))
        .collect();

    Ok(PixelFrame::try_from((geometry, pixels))?)
}

fn apply_exif_orientation(image: DynamicImage, source_bytes: &[u8]) -> DynamicImage {
    match exif_orientation(source_bytes) {
        Some(2) => image.fliph(),
        Some(3) => image.rotate180(),
        Some(4) => image.flipv(),
        Some(5) => image.fliph().rotate90(),
        Some(6) => image.rotate90(),
        Some(7) => image.fliph().rotate270(),
        Some(8) => image.rotate270(),
        _ => image,
    }
}

fn exif_orientation(source_bytes: &[u8]) -> Option<u32> {
    let mut cursor = Cursor::new(source_bytes);
    let exif = exif::Reader::new().read_from_container(&mut cursor).ok()?;
    exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?
        .value
        .get_uint(0)
}
