//! Binary wire header encoding and decoding.
//!
//! Implements the fixed 16-byte header format:
//!
//! ```text
//! ┌────────────┬────────────┬──────────┬───────────┬──────────┐
//! │ Total Len  │ Header Len │ Version  │ Operation │ Sequence │
//! │ 4 bytes    │ 2 bytes    │ 2 bytes  │ 4 bytes   │ 4 bytes  │
//! │ u32 BE     │ u16 BE     │ u16 BE   │ u32 BE    │ u32 BE   │
//! └────────────┴────────────┴──────────┴───────────┴──────────┘
//! ```
//!
//! All multi-byte integers are Big Endian. Total length includes the
//! header itself; header length is always 16 for this protocol revision.

// ============================================================================
// Imports
// ============================================================================

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Header size in bytes (fixed, exactly 16).
pub const HEADER_SIZE: usize = 16;

/// Sequence number carried by outbound client frames.
pub const DEFAULT_SEQUENCE: u32 = 1;

/// Operation codes identifying a frame's purpose.
///
/// The set below is fixed by the server protocol. Applications may route
/// additional codes by registering handlers for them; unmatched codes are
/// silently ignored by the session.
pub mod opcode {
    /// Client heartbeat request.
    pub const HEARTBEAT: u32 = 2;
    /// Server heartbeat reply.
    pub const HEARTBEAT_REPLY: u32 = 3;
    /// Application push message.
    pub const MESSAGE: u32 = 5;
    /// Client authentication request.
    pub const AUTH: u32 = 7;
    /// Server authentication reply.
    pub const AUTH_REPLY: u32 = 8;
}

/// Protocol version values carried in the header.
pub mod version {
    /// Plain, uncompressed single frame.
    pub const PLAIN: u16 = 0;
    /// Control frame; the operation code carries the meaning, the body has
    /// no framing semantics. Outbound client frames use this version.
    pub const CONTROL: u16 = 1;
    /// Payload is a zlib-compressed concatenation of complete frames.
    pub const ZLIB_BATCH: u16 = 2;
}

// ============================================================================
// Header
// ============================================================================

/// Decoded 16-byte wire header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Total frame length in bytes, header included.
    pub total_len: u32,
    /// Header length in bytes (16 for this protocol revision).
    pub header_len: u16,
    /// Body protocol version (see [`version`]).
    pub version: u16,
    /// Operation code (see [`opcode`]).
    pub opcode: u32,
    /// Sequence number.
    pub sequence: u32,
}

impl Header {
    /// Creates a header for an outbound frame carrying `payload_len` bytes.
    ///
    /// Total length is the header plus the payload; outbound client frames
    /// always use [`version::CONTROL`].
    #[inline]
    #[must_use]
    pub fn pack(sequence: u32, opcode: u32, payload_len: u32) -> Self {
        Self {
            total_len: HEADER_SIZE as u32 + payload_len,
            header_len: HEADER_SIZE as u16,
            version: version::CONTROL,
            opcode,
            sequence,
        }
    }

    /// Encodes the header to its 16-byte Big Endian wire form.
    #[must_use]
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.total_len.to_be_bytes());
        buf[4..6].copy_from_slice(&self.header_len.to_be_bytes());
        buf[6..8].copy_from_slice(&self.version.to_be_bytes());
        buf[8..12].copy_from_slice(&self.opcode.to_be_bytes());
        buf[12..16].copy_from_slice(&self.sequence.to_be_bytes());
        buf
    }

    /// Decodes a header from exactly 16 bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedHeader`] if the input is not exactly
    /// [`HEADER_SIZE`] bytes.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() != HEADER_SIZE {
            return Err(Error::MalformedHeader { len: buf.len() });
        }

        Ok(Self {
            total_len: u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]),
            header_len: u16::from_be_bytes([buf[4], buf[5]]),
            version: u16::from_be_bytes([buf[6], buf[7]]),
            opcode: u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]),
            sequence: u32::from_be_bytes([buf[12], buf[13], buf[14], buf[15]]),
        })
    }

    /// Returns `true` if the body is a zlib-compressed batch of frames.
    #[inline]
    #[must_use]
    pub fn is_compressed_batch(&self) -> bool {
        self.version == version::ZLIB_BATCH
    }
}

// ============================================================================
// Tests
// ============================================================================
