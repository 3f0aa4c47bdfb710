//! Telegram framing
//!
//! A telegram is one complete protocol frame exchanged with the brick:
//!
//! | Offset | Field | Encoding |
//! |---|---|---|
//! | 0 | telegram type | 1 byte; bit 0x80 set = no reply requested |
//! | 1 | command opcode | 1 byte |
//! | 2.. | payload | opcode specific; multi-byte fields little-endian |
//!
//! The device never accepts frames longer than [`MAX_TELEGRAM_LEN`] bytes.

mod buffer;
pub mod opcode;

pub use buffer::Buffer;

/// Device-imposed maximum telegram size in bytes.
pub const MAX_TELEGRAM_LEN: usize = 64;

/// Type byte plus command byte.
pub const HEADER_LEN: usize = 2;

/// Set on the type byte when the sender does not want a reply.
pub const NO_RESPONSE_BIT: u8 = 0x80;

/// Telegram type carried in the first header byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TelegramType {
    DirectWithResponse = 0x00,
    SystemWithResponse = 0x01,
    Reply = 0x02,
    DirectWithoutResponse = 0x80,
    SystemWithoutResponse = 0x81,
}

impl TelegramType {
    /// Decode a type byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(TelegramType::DirectWithResponse),
            0x01 => Some(TelegramType::SystemWithResponse),
            0x02 => Some(TelegramType::Reply),
            0x80 => Some(TelegramType::DirectWithoutResponse),
            0x81 => Some(TelegramType::SystemWithoutResponse),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Same command family with or without the reply request.
    ///
    /// Replies have no such variant and are returned unchanged.
    pub fn with_response(self, response: bool) -> Self {
        match (self, response) {
            (TelegramType::Reply, _) => TelegramType::Reply,
            (TelegramType::DirectWithResponse | TelegramType::DirectWithoutResponse, true) => {
                TelegramType::DirectWithResponse
            }
            (TelegramType::DirectWithResponse | TelegramType::DirectWithoutResponse, false) => {
                TelegramType::DirectWithoutResponse
            }
            (TelegramType::SystemWithResponse | TelegramType::SystemWithoutResponse, true) => {
                TelegramType::SystemWithResponse
            }
            (TelegramType::SystemWithResponse | TelegramType::SystemWithoutResponse, false) => {
                TelegramType::SystemWithoutResponse
            }
        }
    }

    pub fn is_system(self) -> bool {
        matches!(self, TelegramType::SystemWithResponse | TelegramType::SystemWithoutResponse)
    }
}

/// An assembled, owned frame ready to hand to a transport.
///
/// The payload is fixed once assembled; only the reply-request bit of the type
/// byte may be flipped afterwards, so a prepared telegram can be replayed with
/// and without confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Telegram {
    bytes: Vec<u8>,
}

impl Telegram {
    /// Assemble `[type, command, payload...]`.
    pub fn new(kind: TelegramType, command: u8, payload: &Buffer) -> Self {
        let bytes = Buffer::with_capacity(HEADER_LEN + payload.len())
            .append_byte(kind.as_byte())
            .append_byte(command)
            .append(payload)
            .into_vec();
        Self { bytes }
    }

    /// Wrap raw frame bytes without checking them.
    ///
    /// Size limits are checked by [`crate::Brick::execute`].
    pub fn from_raw(bytes: impl Into<Vec<u8>>) -> Self {
        Self { bytes: bytes.into() }
    }

    /// Raw type byte, if the frame has one.
    pub fn type_byte(&self) -> Option<u8> {
        self.bytes.first().copied()
    }

    pub fn telegram_type(&self) -> Option<TelegramType> {
        self.type_byte().and_then(TelegramType::from_byte)
    }

    /// Command opcode, if the frame has one.
    pub fn command(&self) -> Option<u8> {
        self.bytes.get(1).copied()
    }

    pub fn payload(&self) -> &[u8] {
        self.bytes.get(HEADER_LEN..).unwrap_or(&[])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether the type byte asks the brick for a reply.
    pub fn requests_reply(&self) -> bool {
        self.type_byte().is_some_and(|byte| byte & NO_RESPONSE_BIT == 0)
    }

    /// Set or clear the reply request on the type byte. The payload is untouched.
    pub fn set_reply_requested(&mut self, reply: bool) {
        if let Some(byte) = self.bytes.first_mut() {
            if reply {
                *byte &= !NO_RESPONSE_BIT;
            } else {
                *byte |= NO_RESPONSE_BIT;
            }
        }
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.bytes
    }
}

impl AsRef<[u8]> for Telegram {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}
