//! Built-in reply handlers.
//!
//! Two operation codes are handled by the session itself before any
//! caller registrations apply: the authentication reply and the heartbeat
//! reply. Callers may override either by registering their own handler
//! for the same code.

// ============================================================================
// Imports
// ============================================================================

use tracing::{debug, info};

use crate::dispatch::MessageHandler;
use crate::error::{Error, Result};
use crate::protocol::{AuthReply, Message};

use super::core::{CloseReason, Session};

// ============================================================================
// AuthReplyHandler
// ============================================================================

/// Interprets the server's answer to the authentication frame.
///
/// A success status marks the session authenticated. Any other outcome
/// (non-success code, unparseable payload) leaves it unauthenticated and
/// triggers a detached close with [`CloseReason::AuthFailed`] — unless
/// authentication had already succeeded separately by the time the final
/// check runs.
pub(crate) struct AuthReplyHandler;

impl MessageHandler for AuthReplyHandler {
    fn handle(&self, session: &Session, message: &Message) -> Result<()> {
        let result = match AuthReply::decode(message.payload()) {
            Ok(reply) if reply.is_success() => {
                info!("auth success");
                session.mark_authenticated();
                Ok(())
            }
            Ok(reply) => Err(Error::auth_rejected(reply.code)),
            Err(e) => Err(e),
        };

        if !session.is_authenticated() {
            session.close_detached(CloseReason::AuthFailed);
        }

        result
    }
}

// ============================================================================
// HeartbeatReplyHandler
// ============================================================================

/// Observability-only handler for heartbeat replies.
///
/// A missing reply is not separately enforced; the one-shot auth timeout
/// is the only timeout the session maintains.
pub(crate) struct HeartbeatReplyHandler;

impl MessageHandler for HeartbeatReplyHandler {
    fn handle(&self, _session: &Session, _message: &Message) -> Result<()> {
        debug!("heartbeat reply");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
