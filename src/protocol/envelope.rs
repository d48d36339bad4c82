//! Typed views over JSON payload bodies.
//!
//! Push payloads arrive as an envelope `{"cmd": "...", "data": {...}}`.
//! The crate does not model individual command bodies; [`Envelope`] exposes
//! the command tag and leaves `data` as raw JSON for the application layer.
//!
//! [`AuthReply`] is the one body the session itself interprets: the status
//! code returned for the authentication frame.

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;

// ============================================================================
// Envelope
// ============================================================================

/// Command envelope of an application push payload.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    /// Command tag identifying the body shape.
    pub cmd: String,

    /// Untyped command body.
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    /// Parses a push-message payload into its envelope.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if the payload is not an envelope.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(payload)?)
    }
}

// ============================================================================
// AuthReply
// ============================================================================

/// Status body of an authentication reply frame.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AuthReply {
    /// Server status code; 0 is success.
    #[serde(default)]
    pub code: i64,
}

impl AuthReply {
    /// Parses an auth-reply payload.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if the payload is not a status body.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(payload)?)
    }

    /// Returns `true` if the server accepted the authentication frame.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

// ============================================================================
// Tests
// ============================================================================
