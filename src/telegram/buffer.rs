//! Append-only byte builder for telegram payloads

use std::ops::Deref;

/// Ordered byte sequence in wire order.
///
/// Appenders take and return the buffer by value so payloads read as one chain:
///
/// ```rust
/// use nxt_direct::telegram::Buffer;
///
/// let payload = Buffer::new().append_byte(0x01).append_word(700);
/// assert_eq!(payload.as_bytes(), &[0x01, 0xBC, 0x02]);
/// ```
///
/// Appends never fail. The 64-byte frame limit is enforced when a telegram is
/// executed, not here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Buffer {
    bytes: Vec<u8>,
}

impl Buffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty buffer with room for `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self { bytes: Vec::with_capacity(capacity) }
    }

    /// Append a single byte.
    pub fn append_byte(mut self, byte: u8) -> Self {
        self.bytes.push(byte);
        self
    }

    /// Append a 16-bit word, least significant byte first.
    pub fn append_word(mut self, word: u16) -> Self {
        self.bytes.extend_from_slice(&word.to_le_bytes());
        self
    }

    /// Append a 32-bit value, least significant byte first.
    pub fn append_long(mut self, long: u32) -> Self {
        self.bytes.extend_from_slice(&long.to_le_bytes());
        self
    }

    /// Append every byte of `other`, in order.
    pub fn append(mut self, other: &Buffer) -> Self {
        self.bytes.extend_from_slice(&other.bytes);
        self
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.bytes
    }
}

impl Deref for Buffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl AsRef<[u8]> for Buffer {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl From<&[u8]> for Buffer {
    fn from(bytes: &[u8]) -> Self {
        Self { bytes: bytes.to_vec() }
    }
}

impl From<Buffer> for Vec<u8> {
    fn from(buffer: Buffer) -> Self {
        buffer.bytes
    }
}
