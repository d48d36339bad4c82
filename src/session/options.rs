//! Session timing and capacity configuration.
//!
//! The defaults match the server protocol: authentication must complete
//! within 10 seconds of dialing, heartbeats are expected every 15 seconds,
//! and the inbound queue holds 1024 messages before the reader loop blocks.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use pushlink::SessionOptions;
//!
//! let options = SessionOptions::new()
//!     .with_heartbeat_interval(Duration::from_secs(20))
//!     .with_queue_capacity(256);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// Window for the server to accept the authentication frame.
pub const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(10);

/// Interval between client heartbeat frames.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Inbound message queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

// ============================================================================
// SessionOptions
// ============================================================================

/// Timing and capacity configuration for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// One-shot window for authentication to succeed after dialing.
    pub auth_timeout: Duration,

    /// Cadence of outbound heartbeat frames.
    pub heartbeat_interval: Duration,

    /// Bounded inbound queue capacity; the reader loop blocks when full.
    pub queue_capacity: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors & Builder Methods
// ============================================================================

impl SessionOptions {
    /// Creates options with the protocol defaults.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            auth_timeout: DEFAULT_AUTH_TIMEOUT,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    /// Sets the authentication timeout window.
    #[inline]
    #[must_use]
    pub fn with_auth_timeout(mut self, timeout: Duration) -> Self {
        self.auth_timeout = timeout;
        self
    }

    /// Sets the heartbeat interval.
    #[inline]
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Sets the inbound queue capacity.
    ///
    /// A zero capacity is clamped to 1; the queue must be able to hold at
    /// least one message for the loops to make progress.
    #[inline]
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
