//! Session lifecycle: dial, authenticate, heartbeat, dispatch, close.
//!
//! A session is one logical authenticated connection lifecycle,
//! potentially spanning multiple physical reconnects. It owns the
//! connection and exactly two background tasks:
//!
//! ```text
//! ┌──────────────┐  frames   ┌─────────────┐  bounded queue  ┌─────────────┐
//! │  WebSocket   │──────────►│ reader loop │────────────────►│ event loop  │
//! │  connection  │           └─────────────┘                 │  · timers   │
//! └──────────────┘                                           │  · dispatch │
//!        ▲                                                   └─────────────┘
//!        └────────────── writes (auth, heartbeat, caller sends) ────┘
//! ```
//!
//! Closing is idempotent: the first trigger — caller, read error, server
//! shutdown frame, or auth timeout — runs the shutdown sequence once,
//! waits for both loops to exit, and then invokes the close callback with
//! a [`CloseReason`]. The callback may decide to reconnect.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | Session handle, connection state, lifecycle operations |
//! | `loops` | Reader loop and event loop |
//! | `handlers` | Built-in auth-reply and heartbeat-reply handlers |
//! | `builder` | Fluent configuration and bootstrap |
//! | `options` | Timing and capacity configuration |

// ============================================================================
// Submodules
// ============================================================================

/// Session handle and lifecycle operations.
pub mod core;

/// Fluent configuration and bootstrap.
pub mod builder;

/// Timing and capacity configuration.
pub mod options;

mod handlers;
mod loops;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::SessionBuilder;
pub use self::core::{CloseCallback, CloseReason, Session};
pub use options::{
    DEFAULT_AUTH_TIMEOUT, DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_QUEUE_CAPACITY, SessionOptions,
};
