//! Builder and bootstrap for sessions.
//!
//! Provides a fluent API for configuring a [`Session`] and, with
//! [`SessionBuilder::connect`], the one-shot bootstrap that dials the
//! first reachable endpoint, sends the authentication frame, and starts
//! the background loops.
//!
//! # Example
//!
//! ```no_run
//! use pushlink::{Session, StaticCredentials};
//! use pushlink::protocol::opcode;
//!
//! # async fn example() -> pushlink::Result<()> {
//! let credentials = StaticCredentials::new(
//!     br#"{"token":"..."}"#.to_vec(),
//!     vec!["ws://push.example:2243/sub".to_string()],
//! );
//!
//! let session = Session::builder()
//!     .credentials(credentials)
//!     .handler(opcode::MESSAGE, |_session, msg| {
//!         println!("push: {} bytes", msg.payload().len());
//!         Ok(())
//!     })
//!     .connect()
//!     .await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crate::credentials::Credentials;
use crate::dispatch::MessageHandler;
use crate::error::{Error, Result};
use crate::protocol::Message;

use super::core::{CloseCallback, CloseReason, Session};
use super::options::SessionOptions;

// ============================================================================
// SessionBuilder
// ============================================================================

/// Builder for configuring a [`Session`].
///
/// Use [`Session::builder()`] to create one.
#[derive(Default)]
pub struct SessionBuilder {
    /// Credentials for dial and authentication.
    credentials: Option<Arc<dyn Credentials>>,
    /// Caller handler registrations, applied over the built-ins in order.
    handlers: Vec<(u32, Arc<dyn MessageHandler>)>,
    /// Optional close callback.
    on_close: Option<CloseCallback>,
    /// Timing and capacity configuration.
    options: SessionOptions,
}

impl fmt::Debug for SessionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let opcodes: Vec<u32> = self.handlers.iter().map(|(op, _)| *op).collect();
        f.debug_struct("SessionBuilder")
            .field("has_credentials", &self.credentials.is_some())
            .field("handler_opcodes", &opcodes)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SessionBuilder Implementation
// ============================================================================

impl SessionBuilder {
    /// Creates a new builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the session credentials.
    #[inline]
    #[must_use]
    pub fn credentials(mut self, credentials: impl Credentials + 'static) -> Self {
        self.credentials = Some(Arc::new(credentials));
        self
    }

    /// Sets already-shared session credentials.
    #[inline]
    #[must_use]
    pub fn credentials_arc(mut self, credentials: Arc<dyn Credentials>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Registers a handler closure for an operation code.
    ///
    /// Applied after the built-in handlers; the last registration for a
    /// code wins.
    #[must_use]
    pub fn handler<F>(mut self, opcode: u32, handler: F) -> Self
    where
        F: Fn(&Session, &Message) -> Result<()> + Send + Sync + 'static,
    {
        self.handlers.push((opcode, Arc::new(handler)));
        self
    }

    /// Sets the close callback.
    #[must_use]
    pub fn on_close<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Session, &Arc<dyn Credentials>, CloseReason) + Send + Sync + 'static,
    {
        self.on_close = Some(Arc::new(callback));
        self
    }

    /// Sets the session options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds an idle session without connecting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if no credentials were supplied.
    pub fn build(self) -> Result<Session> {
        let credentials = self
            .credentials
            .ok_or_else(|| Error::config("credentials are required"))?;

        let session = Session::new(credentials, self.options);

        {
            let mut dispatch = session.inner.dispatch.write();
            for (opcode, handler) in self.handlers {
                dispatch.register_arc(opcode, handler);
            }
        }

        if let Some(callback) = self.on_close {
            *session.inner.on_close.write() = Some(callback);
        }

        Ok(session)
    }

    /// Builds the session and performs the full bootstrap:
    /// dial → send auth → start loops.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no credentials were supplied
    /// - [`Error::Dial`] if every candidate endpoint fails
    /// - [`Error::WebSocket`] if the auth frame cannot be written
    pub async fn connect(self) -> Result<Session> {
        let session = self.build()?;

        session.dial().await?;
        session.send_auth().await?;
        session.run();

        Ok(session)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::StaticCredentials;
    use crate::protocol::{Message, opcode};

    #[test]
    fn test_build_requires_credentials() {
        let err = SessionBuilder::new().build().expect_err("must fail");
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_build_applies_handlers_over_builtins() {
        let session = SessionBuilder::new()
            .credentials(StaticCredentials::new(
                b"auth".to_vec(),
                vec!["ws://127.0.0.1:9".to_string()],
            ))
            .handler(opcode::MESSAGE, |_: &Session, _: &Message| Ok(()))
            .handler(opcode::AUTH_REPLY, |_: &Session, _: &Message| Ok(()))
            .build()
            .expect("build");

        let dispatch = session.inner.dispatch.read();
        // Two built-ins plus the MESSAGE handler; AUTH_REPLY was overridden
        // in place.
        assert_eq!(dispatch.len(), 3);
        assert!(dispatch.lookup(opcode::MESSAGE).is_some());
    }

    #[test]
    fn test_build_sets_close_callback() {
        let session = SessionBuilder::new()
            .credentials(StaticCredentials::new(b"auth".to_vec(), Vec::new()))
            .on_close(|_session, _credentials, _reason| {})
            .build()
            .expect("build");

        assert!(session.inner.on_close.read().is_some());
    }
}
