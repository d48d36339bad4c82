//! Binary wire protocol: header, message, and frame codec.
//!
//! Every transport read and write is a length-prefixed binary frame:
//! a fixed 16-byte Big Endian header followed by an opaque payload.
//! When the header version marks a zlib batch, the payload is a compressed
//! concatenation of further complete frames.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `header` | 16-byte wire header, operation codes, version constants |
//! | `message` | Immutable header + payload pairing |
//! | `codec` | Frame decoding, batch inflation, length validation |
//! | `envelope` | Typed views over JSON payload bodies |

// ============================================================================
// Submodules
// ============================================================================

/// Wire header and protocol constants.
pub mod header;

/// Decoded protocol messages.
pub mod message;

/// Frame decoding, including compressed batches.
pub mod codec;

/// Typed views over JSON payload bodies.
pub mod envelope;

// ============================================================================
// Re-exports
// ============================================================================

pub use codec::decode_frames;
pub use envelope::{AuthReply, Envelope};
pub use header::{DEFAULT_SEQUENCE, HEADER_SIZE, Header, opcode, version};
pub use message::Message;
