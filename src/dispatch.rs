//! Message dispatch by operation code.
//!
//! The dispatch table routes each decoded [`Message`] to at most one
//! handler, keyed by the 32-bit operation code. The session pre-registers
//! handlers for the authentication and heartbeat replies; caller
//! registrations are layered on top and win on conflict. Operation codes
//! with no handler are silently ignored, which keeps the client forward
//! compatible with codes the server adds later.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::protocol::Message;
use crate::session::Session;

// ============================================================================
// MessageHandler
// ============================================================================

/// A dispatch target for one operation code.
///
/// Handlers run on the session's event loop; a handler that blocks delays
/// heartbeats and every queued message behind it. Handler errors are
/// logged by the event loop and never crash the session.
///
/// Any `Fn(&Session, &Message) -> Result<()>` closure is a handler:
///
/// ```ignore
/// use pushlink::protocol::opcode;
///
/// session.register_handler(opcode::MESSAGE, |_session, msg| {
///     println!("push: {} bytes", msg.payload().len());
///     Ok(())
/// });
/// ```
pub trait MessageHandler: Send + Sync {
    /// Handles one decoded message.
    ///
    /// # Errors
    ///
    /// Returned errors are logged by the event loop and otherwise ignored.
    fn handle(&self, session: &Session, message: &Message) -> Result<()>;
}

impl<F> MessageHandler for F
where
    F: Fn(&Session, &Message) -> Result<()> + Send + Sync,
{
    fn handle(&self, session: &Session, message: &Message) -> Result<()> {
        self(session, message)
    }
}

// ============================================================================
// DispatchTable
// ============================================================================

/// Operation code → handler registry.
///
/// Owned by the session; handlers are supplied and owned by the caller.
#[derive(Default)]
pub struct DispatchTable {
    /// Registered handlers by operation code.
    handlers: FxHashMap<u32, Arc<dyn MessageHandler>>,
}

impl DispatchTable {
    /// Creates an empty dispatch table.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for an operation code.
    ///
    /// The last registration for a given code wins; overwriting is not an
    /// error.
    pub fn register(&mut self, opcode: u32, handler: impl MessageHandler + 'static) {
        self.handlers.insert(opcode, Arc::new(handler));
    }

    /// Registers an already-shared handler for an operation code.
    pub fn register_arc(&mut self, opcode: u32, handler: Arc<dyn MessageHandler>) {
        self.handlers.insert(opcode, handler);
    }

    /// Looks up the handler for an operation code.
    ///
    /// Absence is not an error; the session ignores unmatched codes.
    #[must_use]
    pub fn lookup(&self, opcode: u32) -> Option<Arc<dyn MessageHandler>> {
        self.handlers.get(&opcode).cloned()
    }

    /// Returns the number of registered handlers.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns `true` if no handlers are registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut opcodes: Vec<u32> = self.handlers.keys().copied().collect();
        opcodes.sort_unstable();
        f.debug_struct("DispatchTable")
            .field("opcodes", &opcodes)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
