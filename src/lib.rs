//! Pushlink - authenticated push-message client.
//!
//! This library maintains a persistent, authenticated, auto-reconnecting
//! WebSocket connection to a push-message server, decodes the server's
//! length-prefixed binary protocol (including zlib-compressed batches),
//! and dispatches decoded messages to registered handlers by operation
//! code.
//!
//! # Architecture
//!
//! Each [`Session`] owns one physical connection and two background tasks:
//!
//! - **Reader loop**: reads wire messages, deframes them through the
//!   codec, pushes decoded messages onto a bounded queue
//! - **Event loop**: drains the queue into handlers and drives the
//!   authentication timeout and the heartbeat tick
//!
//! Key design principles:
//!
//! - Fatal loop-internal errors funnel into one idempotent close sequence
//!   with a [`CloseReason`]; the close callback is the caller's single
//!   async failure channel
//! - Handlers are capability objects keyed by a 32-bit operation code;
//!   unknown codes are ignored for forward compatibility
//! - Reconnecting allocates fresh per-connection state and reuses the
//!   dispatch table and callback
//!
//! # Quick Start
//!
//! ```no_run
//! use pushlink::{Session, StaticCredentials};
//! use pushlink::protocol::opcode;
//!
//! #[tokio::main]
//! async fn main() -> pushlink::Result<()> {
//!     // Credentials come from your session-negotiation API.
//!     let credentials = StaticCredentials::new(
//!         br#"{"token":"..."}"#.to_vec(),
//!         vec!["ws://push.example:2243/sub".to_string()],
//!     );
//!
//!     let session = Session::builder()
//!         .credentials(credentials)
//!         .handler(opcode::MESSAGE, |_session, msg| {
//!             println!("push: {}", String::from_utf8_lossy(msg.payload()));
//!             Ok(())
//!         })
//!         .on_close(|_session, _credentials, reason| {
//!             println!("session closed: {reason}");
//!         })
//!         .connect()
//!         .await?;
//!
//!     tokio::signal::ctrl_c().await.ok();
//!     session.close().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`protocol`] | Binary frame codec: header, message, batch decoding |
//! | [`dispatch`] | Operation code → handler registry |
//! | [`session`] | Connection state machine, loops, bootstrap |
//! | [`credentials`] | Credentials contract consumed at dial time |
//! | [`error`] | Error types and [`Result`] alias |

// ============================================================================
// Modules
// ============================================================================

/// Credentials contract consumed at dial and reconnect time.
pub mod credentials;

/// Message dispatch by operation code.
pub mod dispatch;

/// Error types and result aliases.
pub mod error;

/// Binary wire protocol: header, message, and frame codec.
pub mod protocol;

/// Session lifecycle: dial, authenticate, heartbeat, dispatch, close.
pub mod session;

// ============================================================================
// Re-exports
// ============================================================================

pub use credentials::{Credentials, StaticCredentials};
pub use dispatch::{DispatchTable, MessageHandler};
pub use error::{Error, Result};
pub use protocol::{Header, Message};
pub use session::{CloseReason, Session, SessionBuilder, SessionOptions};
