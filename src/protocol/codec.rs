//! Frame decoding, including compressed batch expansion.
//!
//! One transport read delivers either a single frame or, when the header
//! version marks a zlib batch, a compressed concatenation of complete
//! frames. [`decode_frames`] handles both with the same per-frame scan:
//! a batch is inflated once and then re-scanned as a flat byte stream.
//!
//! Every length field is server-controlled and is validated against the
//! remaining buffer before any slice is taken.

// ============================================================================
// Imports
// ============================================================================

use std::io::Read;

use bytes::Bytes;
use flate2::read::ZlibDecoder;

use crate::error::{Error, Result};

use super::header::{HEADER_SIZE, Header};
use super::message::Message;

// ============================================================================
// Decoding
// ============================================================================

/// Decodes one transport read into the messages it contains.
///
/// # Errors
///
/// - [`Error::FrameTooShort`] if the buffer cannot hold a header plus body
/// - [`Error::FrameTruncated`] if a declared length exceeds the buffer
/// - [`Error::MalformedHeader`] if a header slice cannot be decoded
/// - [`Error::Decompression`] if zlib inflation of a batch fails
pub fn decode_frames(raw: &[u8]) -> Result<Vec<Message>> {
    if raw.len() <= HEADER_SIZE {
        return Err(Error::FrameTooShort { len: raw.len() });
    }

    let head = Header::decode(&raw[..HEADER_SIZE])?;
    if head.total_len as usize > raw.len() {
        return Err(Error::frame_truncated(head.total_len, raw.len()));
    }

    // A compressed batch replaces the input: the inflated stream is itself
    // zero or more complete frames back-to-back.
    let inflated;
    let mut buf: &[u8] = if head.is_compressed_batch() {
        inflated = inflate(&raw[HEADER_SIZE..])?;
        &inflated
    } else {
        raw
    };

    let mut messages = Vec::with_capacity(8);
    while !buf.is_empty() {
        if buf.len() < HEADER_SIZE {
            return Err(Error::MalformedHeader { len: buf.len() });
        }

        let header = Header::decode(&buf[..HEADER_SIZE])?;
        let total = header.total_len as usize;
        let head_len = header.header_len as usize;

        if total > buf.len() {
            return Err(Error::frame_truncated(header.total_len, buf.len()));
        }
        if head_len < HEADER_SIZE || head_len > total {
            return Err(Error::MalformedHeader { len: head_len });
        }

        // Own the payload; the source buffer belongs to the network read.
        let payload = Bytes::copy_from_slice(&buf[head_len..total]);
        messages.push(Message::new(header, payload));

        buf = &buf[total..];
    }

    Ok(messages)
}

/// Inflates the zlib-compressed body of a batch frame.
fn inflate(compressed: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(compressed);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(Error::decompression)?;
    Ok(out)
}

// ============================================================================
// Tests
// ============================================================================
