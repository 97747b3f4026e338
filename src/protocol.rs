use thiserror::Error;

/// Acknowledgment sentinel the device writes back during transfers.
pub const ACK_BYTE: u8 = b'A';

const KIND_STILL: u8 = 0;
const KIND_ANIMATED: u8 = 1;

/// Errors returned while framing device commands.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum FramingError {
    /// The text payload does not fit the 16-bit wire length field.
    #[error("text payload is too long: {len} bytes exceeds max {max}")]
    TextTooLong { len: usize, max: usize },
}

/// Caller-chosen identifier naming a storage slot on the device.
///
/// The device owns identifier semantics; the client enforces no uniqueness.
#[derive(
    Debug,
    Clone,
    Copy,
    Eq,
    PartialEq,
    Hash,
    derive_more::Display,
    derive_more::From,
    serde::Serialize,
)]
#[display("{_0}")]
pub struct ItemId(u16);

impl ItemId {
    /// Creates an identifier from a raw slot number.
    #[must_use]
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Raw slot number.
    #[must_use]
    pub const fn value(self) -> u16 {
        self.0
    }
}

/// One framed exchange with the device.
///
/// Every variant maps to exactly one wire header; [`DeviceCommand::Upload`]
/// and [`DeviceCommand::SendText`] are followed by a chunked payload and the
/// acknowledgment handshake, the rest are header-only.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DeviceCommand {
    /// Store a pixel payload (`'U'`).
    Upload {
        id: ItemId,
        animated: bool,
        frame_count: u16,
    },
    /// Store and display a text string (`'T'`).
    SendText { id: ItemId, text_len: u16 },
    /// Delete a stored slot (`'D'`).
    Delete { id: ItemId },
    /// Run a stored slot (`'R'`).
    Run { id: ItemId },
}

impl DeviceCommand {
    /// Builds a text command, validating the wire length field.
    ///
    /// # Errors
    ///
    /// Returns an error when `text` exceeds `u16::MAX` bytes.
    pub fn send_text(id: ItemId, text: &str) -> Result<Self, FramingError> {
        let text_len = u16::try_from(text.len()).map_err(|_overflow| FramingError::TextTooLong {
            len: text.len(),
            max: usize::from(u16::MAX),
        })?;
        Ok(Self::SendText { id, text_len })
    }

    /// Single-byte opcode leading the header.
    #[must_use]
    pub const fn opcode(self) -> u8 {
        match self {
            Self::Upload { .. } => b'U',
            Self::SendText { .. } => b'T',
            Self::Delete { .. } => b'D',
            Self::Run { .. } => b'R',
        }
    }

    /// Whether the command carries a payload and expects acknowledgments.
    #[must_use]
    pub const fn expects_ack(self) -> bool {
        matches!(self, Self::Upload { .. } | Self::SendText { .. })
    }

    /// Encodes the command header, little-endian throughout.
    ///
    /// This layout is a compatibility contract with unmodifiable device
    /// firmware and must stay bit-exact.
    ///
    /// ```
    /// use emx::{DeviceCommand, ItemId};
    ///
    /// let header = DeviceCommand::Delete { id: ItemId::new(7) }.encode_header();
    /// assert_eq!(vec![b'D', 0x07, 0x00], header);
    /// ```
    #[must_use]
    pub fn encode_header(self) -> Vec<u8> {
        let mut header = vec![self.opcode()];
        match self {
            Self::Upload {
                id,
                animated,
                frame_count,
            } => {
                header.extend_from_slice(&id.value().to_le_bytes());
                header.push(if animated { KIND_ANIMATED } else { KIND_STILL });
                header.extend_from_slice(&frame_count.to_le_bytes());
            }
            Self::SendText { id, text_len } => {
                header.extend_from_slice(&id.value().to_le_bytes());
                header.extend_from_slice(&text_len.to_le_bytes());
            }
            Self::Delete { id } | Self::Run { id } => {
                header.extend_from_slice(&id.value().to_le_bytes());
            }
        }
        header
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn upload_header_is_six_bytes_little_endian() {
        let command = DeviceCommand::Upload {
            id: ItemId::new(0x0201),
            animated: true,
            frame_count: 10,
        };

        assert_eq!(vec![b'U', 0x01, 0x02, 0x01, 0x0A, 0x00], command.encode_header());
    }

    #[test]
    fn still_upload_encodes_kind_zero_and_one_frame() {
        let command = DeviceCommand::Upload {
            id: ItemId::new(3),
            animated: false,
            frame_count: 1,
        };

        assert_eq!(vec![b'U', 0x03, 0x00, 0x00, 0x01, 0x00], command.encode_header());
    }

    #[test]
    fn text_header_carries_byte_length() {
        let command = DeviceCommand::send_text(ItemId::new(0xBEEF), "héllo")
            .expect("short text should frame");

        // "héllo" is six bytes of UTF-8, not five characters.
        assert_eq!(vec![b'T', 0xEF, 0xBE, 0x06, 0x00], command.encode_header());
    }

    #[test]
    fn text_longer_than_u16_is_rejected() {
        let text = "x".repeat(usize::from(u16::MAX) + 1);
        let result = DeviceCommand::send_text(ItemId::new(0), &text);

        assert_matches!(result, Err(FramingError::TextTooLong { len: 65536, .. }));
    }

    #[test]
    fn delete_and_run_headers_are_three_bytes() {
        assert_eq!(
            vec![b'D', 0x07, 0x00],
            DeviceCommand::Delete { id: ItemId::new(7) }.encode_header()
        );
        assert_eq!(
            vec![b'R', 0xFF, 0xFF],
            DeviceCommand::Run {
                id: ItemId::new(u16::MAX)
            }
            .encode_header()
        );
    }

    #[test]
    fn only_payload_commands_expect_acknowledgments() {
        assert!(
            DeviceCommand::Upload {
                id: ItemId::new(1),
                animated: false,
                frame_count: 1
            }
            .expects_ack()
        );
        assert!(
            DeviceCommand::send_text(ItemId::new(1), "hi")
                .expect("short text should frame")
                .expects_ack()
        );
        assert!(!DeviceCommand::Delete { id: ItemId::new(1) }.expects_ack());
        assert!(!DeviceCommand::Run { id: ItemId::new(1) }.expects_ack());
    }
}
