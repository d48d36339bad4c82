//! Decoded protocol messages.
//!
//! A [`Message`] is the immutable pairing of a [`Header`] and a payload.
//! Messages are constructed by the codec when decoding inbound bytes, or
//! by the session when packing outbound auth/heartbeat/application frames,
//! and are not mutated afterwards.
//!
//! Payloads use [`bytes::Bytes`] so a message can be handed from the
//! reader loop to a dispatch handler without copying.

// ============================================================================
// Imports
// ============================================================================

use bytes::{BufMut, Bytes, BytesMut};

use super::header::{HEADER_SIZE, Header};

// ============================================================================
// Message
// ============================================================================

/// A complete protocol message: one header plus its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Decoded header.
    header: Header,
    /// Payload bytes (cheaply cloneable).
    payload: Bytes,
}

impl Message {
    /// Creates a message from an already-decoded header and payload.
    #[inline]
    #[must_use]
    pub fn new(header: Header, payload: Bytes) -> Self {
        Self { header, payload }
    }

    /// Packs an outbound frame from an operation code and payload.
    ///
    /// The header is derived from the payload length; see [`Header::pack`].
    #[must_use]
    pub fn pack(sequence: u32, opcode: u32, payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();
        Self {
            header: Header::pack(sequence, opcode, payload.len() as u32),
            payload,
        }
    }

    /// Returns the message header.
    #[inline]
    #[must_use]
    pub fn header(&self) -> Header {
        self.header
    }

    /// Returns the operation code from the header.
    #[inline]
    #[must_use]
    pub fn opcode(&self) -> u32 {
        self.header.opcode
    }

    /// Returns the sequence number from the header.
    #[inline]
    #[must_use]
    pub fn sequence(&self) -> u32 {
        self.header.sequence
    }

    /// Returns the payload bytes.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Returns a cheap clone of the payload.
    #[inline]
    #[must_use]
    pub fn payload_bytes(&self) -> Bytes {
        self.payload.clone()
    }

    /// Encodes the full frame: header bytes followed by the payload.
    ///
    /// The result is written to the socket verbatim.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_SIZE + self.payload.len());
        buf.put_slice(&self.header.encode());
        buf.put_slice(&self.payload);
        buf.freeze()
    }
}

// ============================================================================
// Tests
// ============================================================================
