//! Error types for the push-message client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use pushlink::{Result, Session};
//!
//! async fn example(session: &Session) -> Result<()> {
//!     session.send_message(5, b"payload".to_vec()).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidEndpoint`] |
//! | Transport | [`Error::Dial`], [`Error::NotConnected`], [`Error::WebSocket`] |
//! | Framing | [`Error::FrameTooShort`], [`Error::FrameTruncated`], [`Error::MalformedHeader`], [`Error::Decompression`] |
//! | Authentication | [`Error::AuthRejected`] |
//! | External | [`Error::Json`] |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// DialAttempt
// ============================================================================

/// Outcome of one failed connection attempt during [`Error::Dial`].
///
/// Every candidate endpoint contributes one entry so the caller can see
/// why each address was rejected.
#[derive(Debug, Clone)]
pub struct DialAttempt {
    /// The endpoint that was tried.
    pub endpoint: String,
    /// Failure description for this endpoint.
    pub message: String,
}

impl fmt::Display for DialAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.endpoint, self.message)
    }
}

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging. Errors raised
/// inside the detached session loops are never returned through this type;
/// they funnel into the session's close machinery instead (see the
/// `session` module docs).
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when session configuration is invalid or incomplete.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Candidate endpoint is not a valid URL.
    #[error("Invalid endpoint {endpoint}: {source}")]
    InvalidEndpoint {
        /// The rejected endpoint string.
        endpoint: String,
        /// Underlying parse failure.
        source: url::ParseError,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Every candidate endpoint failed to connect.
    ///
    /// Carries one [`DialAttempt`] per endpoint tried, in order.
    #[error("Dial failed after {} attempt(s)", attempts.len())]
    Dial {
        /// Per-endpoint failures, in attempt order.
        attempts: Vec<DialAttempt>,
    },

    /// Operation requires a live connection but none is open.
    ///
    /// Returned by send operations on an idle or closed session.
    #[error("Not connected")]
    NotConnected,

    // ========================================================================
    // Framing Errors
    // ========================================================================
    /// Inbound buffer is too short to contain a single frame.
    ///
    /// A frame is at least the 16-byte header plus one payload byte.
    #[error("Frame too short: {len} byte(s)")]
    FrameTooShort {
        /// Length of the rejected buffer.
        len: usize,
    },

    /// Declared frame length exceeds the available bytes.
    ///
    /// Frame lengths are server-controlled; they are validated against the
    /// remaining buffer before any slice is taken.
    #[error("Frame truncated: declared {declared} byte(s), {available} available")]
    FrameTruncated {
        /// Total length declared in the frame header.
        declared: u32,
        /// Bytes actually available in the buffer.
        available: usize,
    },

    /// Header bytes do not form a valid 16-byte header.
    #[error("Malformed header: {len} byte(s), expected 16")]
    MalformedHeader {
        /// Length of the rejected header slice.
        len: usize,
    },

    /// Zlib inflation of a compressed batch failed.
    #[error("Decompression failed: {source}")]
    Decompression {
        /// Underlying inflate error.
        source: IoError,
    },

    // ========================================================================
    // Authentication Errors
    // ========================================================================
    /// Server rejected the authentication frame.
    ///
    /// Carries the non-success status code from the auth reply.
    #[error("Authentication rejected: code {code}")]
    AuthRejected {
        /// Status code returned by the server (0 is success).
        code: i64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid endpoint error.
    #[inline]
    pub fn invalid_endpoint(endpoint: impl Into<String>, source: url::ParseError) -> Self {
        Self::InvalidEndpoint {
            endpoint: endpoint.into(),
            source,
        }
    }

    /// Creates a dial error from the per-endpoint failures.
    #[inline]
    pub fn dial(attempts: Vec<DialAttempt>) -> Self {
        Self::Dial { attempts }
    }

    /// Creates a frame truncation error.
    #[inline]
    pub fn frame_truncated(declared: u32, available: usize) -> Self {
        Self::FrameTruncated {
            declared,
            available,
        }
    }

    /// Creates a decompression error.
    #[inline]
    pub fn decompression(source: IoError) -> Self {
        Self::Decompression { source }
    }

    /// Creates an authentication rejection error.
    #[inline]
    pub fn auth_rejected(code: i64) -> Self {
        Self::AuthRejected { code }
    }
}

// ============================================================================
// Tests
// ============================================================================
