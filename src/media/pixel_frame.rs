use std::fmt;

use thiserror::Error;

/// Errors returned when validating packed pixel frames and frame sequences.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum PixelFrameError {
    /// The pixel buffer length does not match `width * height`.
    #[error(
        "pixel buffer length mismatch for panel {geometry}: expected {expected_len} entries, got {actual_len}"
    )]
    LengthMismatch {
        geometry: FrameGeometry,
        expected_len: usize,
        actual_len: usize,
    },
    /// A frame sequence was constructed without any frames.
    #[error("frame sequence cannot be empty")]
    EmptySequence,
    /// Frames in one sequence were packed against differing panel geometries.
    #[error("frame sequence mixes panel geometries: {first} and {other}")]
    MixedGeometries {
        first: FrameGeometry,
        other: FrameGeometry,
    },
}

/// Packs one 8-bit RGB triple into a 16-bit RGB565 value.
///
/// The top 5 bits of red, top 6 bits of green, and top 5 bits of blue are
/// kept; the mapping is deterministic and lossy.
///
/// ```
/// assert_eq!(0xFFFF, emx::pack_rgb565(0xFF, 0xFF, 0xFF));
/// assert_eq!(0x0000, emx::pack_rgb565(0x00, 0x00, 0x00));
/// assert_eq!(0xF800, emx::pack_rgb565(0xFF, 0x00, 0x00));
/// ```
#[must_use]
pub const fn pack_rgb565(r: u8, g: u8, b: u8) -> u16 {
    ((r as u16 & 0xF8) << 8) | ((g as u16 & 0xFC) << 3) | (b as u16 >> 3)
}

/// Expands a packed RGB565 value back to an 8-bit RGB triple.
///
/// RGB565 packing is one-way; this helper reverses the bit placement for
/// tests and previews, recovering channels within the quantization loss
/// (±4 for red/blue, ±2 for green). Each channel is reconstructed at the
/// midpoint of its quantization bucket, which re-packs to the same value.
#[must_use]
pub const fn unpack_rgb565(packed: u16) -> (u8, u8, u8) {
    let r = (((packed >> 8) & 0xF8) | 0x04) as u8;
    let g = (((packed >> 3) & 0xFC) | 0x02) as u8;
    let b = (((packed << 3) & 0xF8) | 0x04) as u8;
    (r, g, b)
}

/// Validated non-zero panel geometry, e.g. `64x64`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct FrameGeometry {
    width: u16,
    height: u16,
}

impl FrameGeometry {
    /// Creates a geometry, returning `None` when either side is zero.
    ///
    /// ```
    /// use emx::FrameGeometry;
    ///
    /// assert!(FrameGeometry::new(64, 64).is_some());
    /// assert!(FrameGeometry::new(0, 64).is_none());
    /// ```
    #[must_use]
    pub const fn new(width: u16, height: u16) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self { width, height })
    }

    /// Panel width in pixels.
    #[must_use]
    pub const fn width(self) -> u16 {
        self.width
    }

    /// Panel height in pixels.
    #[must_use]
    pub const fn height(self) -> u16 {
        self.height
    }

    /// Number of pixels in one frame.
    #[must_use]
    pub const fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Serialized byte length of one packed frame (two bytes per pixel).
    ///
    /// ```
    /// use emx::FrameGeometry;
    ///
    /// let geometry = FrameGeometry::default();
    /// assert_eq!(8192, geometry.frame_byte_len());
    /// ```
    #[must_use]
    pub const fn frame_byte_len(self) -> usize {
        self.pixel_count() * 2
    }
}

impl Default for FrameGeometry {
    /// The stock 64x64 HUB75 panel.
    fn default() -> Self {
        Self {
            width: 64,
            height: 64,
        }
    }
}

impl fmt::Display for FrameGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One packed RGB565 frame sized exactly to a panel geometry.
///
/// Pixels are row-major, top-to-bottom, left-to-right. Immutable once
/// constructed.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PixelFrame {
    geometry: FrameGeometry,
    pixels: Vec<u16>,
}

impl PixelFrame {
    /// Panel geometry this frame was validated against.
    #[must_use]
    pub fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    /// Packed RGB565 pixel values.
    #[must_use]
    pub fn pixels(&self) -> &[u16] {
        &self.pixels
    }

    /// Serializes the frame as little-endian bytes, the device wire format.
    ///
    /// ```
    /// use emx::{FrameGeometry, PixelFrame};
    ///
    /// let geometry = FrameGeometry::new(1, 2).expect("1x2 should be valid");
    /// let frame = PixelFrame::try_from((geometry, vec![0xF800, 0x07E0]))?;
    /// assert_eq!(vec![0x00, 0xF8, 0xE0, 0x07], frame.to_le_bytes());
    /// # Ok::<(), emx::PixelFrameError>(())
    /// ```
    #[must_use]
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 2);
        for pixel in &self.pixels {
            bytes.extend_from_slice(&pixel.to_le_bytes());
        }
        bytes
    }
}

impl TryFrom<(FrameGeometry, Vec<u16>)> for PixelFrame {
    type Error = PixelFrameError;

    fn try_from(value: (FrameGeometry, Vec<u16>)) -> Result<Self, Self::Error> {
        let (geometry, pixels) = value;
        let expected_len = geometry.pixel_count();
        let actual_len = pixels.len();

        if actual_len != expected_len {
            return Err(PixelFrameError::LengthMismatch {
                geometry,
                expected_len,
                actual_len,
            });
        }

        Ok(Self { geometry, pixels })
    }
}

/// Ordered, non-empty, bounded list of frames destined for one upload.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FrameSequence {
    frames: Vec<PixelFrame>,
}

impl FrameSequence {
    /// Builds a sequence, truncating anything past `max_frames`.
    ///
    /// Truncation is silent: the device caps stored animations, so overly
    /// long sources are shortened rather than rejected.
    ///
    /// # Errors
    ///
    /// Returns an error when `frames` is empty or mixes geometries.
    pub fn new(mut frames: Vec<PixelFrame>, max_frames: usize) -> Result<Self, PixelFrameError> {
        if frames.is_empty() {
            return Err(PixelFrameError::EmptySequence);
        }
        frames.truncate(max_frames.max(1));

        let first = frames[0].geometry();
        if let Some(other) = frames.iter().find(|frame| frame.geometry() != first) {
            return Err(PixelFrameError::MixedGeometries {
                first,
                other: other.geometry(),
            });
        }

        Ok(Self { frames })
    }

    /// Frames in upload order.
    #[must_use]
    pub fn frames(&self) -> &[PixelFrame] {
        &self.frames
    }

    /// Number of frames; always `1..=max_frames`.
    #[must_use]
    pub fn frame_count(&self) -> u16 {
        u16::try_from(self.frames.len()).unwrap_or(u16::MAX)
    }

    /// Geometry shared by every frame.
    #[must_use]
    pub fn geometry(&self) -> FrameGeometry {
        self.frames[0].geometry()
    }

    /// Concatenates all frames into one little-endian upload payload.
    #[must_use]
    pub fn to_payload(&self) -> Vec<u8> {
        let mut payload =
            Vec::with_capacity(self.frames.len() * self.geometry().frame_byte_len());
        for frame in &self.frames {
            payload.extend_from_slice(&frame.to_le_bytes());
        }
        payload
    }
}
