//! Session core: connection ownership and lifecycle operations.
//!
//! A [`Session`] owns at most one physical WebSocket connection at a time,
//! plus the two background loops that service it. The handle is cheaply
//! cloneable; all clones share the same state.
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──dial()──► Connected(unauthenticated) ──auth reply──► Connected(authenticated)
//!   ▲                      │ run()                                   │
//!   │                      ▼                                         ▼
//!   └──reset()──── Closed ◄──────────── close_with_reason() ◄────────┘
//!                    │
//!                    └──reconnect()──► fresh dial/auth/run
//! ```
//!
//! Errors inside the running loops are never returned to a caller; they
//! funnel into [`Session::close_with_reason`], and the close callback is
//! the sole channel through which the caller learns of them.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{Instrument, Span, debug, info, info_span, warn};
use url::Url;

use crate::credentials::Credentials;
use crate::dispatch::DispatchTable;
use crate::error::{DialAttempt, Error, Result};
use crate::protocol::{DEFAULT_SEQUENCE, Message, opcode};

use super::handlers::{AuthReplyHandler, HeartbeatReplyHandler};
use super::loops;
use super::options::SessionOptions;

// ============================================================================
// Types
// ============================================================================

/// Connected client stream (plain or TLS).
pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Write half of the connection.
pub(crate) type WsSink = SplitSink<WsStream, WsMessage>;

/// Read half of the connection.
pub(crate) type WsSource = SplitStream<WsStream>;

/// Close callback invoked at the end of the shutdown sequence.
///
/// Receives the session handle, the last-known credentials, and the close
/// reason. Runs synchronously on the closing task after both loops have
/// exited; to reconnect from here, clone the session and spawn
/// [`Session::reconnect`].
pub type CloseCallback = Arc<dyn Fn(&Session, &Arc<dyn Credentials>, CloseReason) + Send + Sync>;

/// Monotonic session ids for log correlation.
static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

// ============================================================================
// CloseReason
// ============================================================================

/// Cause attached to every session termination.
///
/// Callers branch on this in the close callback to decide whether a
/// reconnect is safe ([`ReadError`](Self::ReadError),
/// [`ServerShutdown`](Self::ServerShutdown)) or pointless
/// ([`AuthFailed`](Self::AuthFailed)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CloseReason {
    /// Authentication was rejected or timed out.
    AuthFailed = 1,
    /// The caller closed the session.
    Actively = 2,
    /// The connection failed while reading.
    ReadError = 3,
    /// The server sent a shutdown control frame.
    ServerShutdown = 4,
    /// Cause unknown.
    Unknown = 5,
}

impl CloseReason {
    /// Returns the stable numeric code for this reason.
    #[inline]
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::AuthFailed => "auth failed",
            Self::Actively => "closed by caller",
            Self::ReadError => "read error",
            Self::ServerShutdown => "server shutdown",
            Self::Unknown => "unknown",
        };
        f.write_str(text)
    }
}

// ============================================================================
// Conn
// ============================================================================

/// Per-connection state, replaced wholesale on every dial.
///
/// Reconnecting never reuses a cancellation signal or close guard; a
/// signalled one is invalid for a fresh pair of loops.
pub(crate) struct Conn {
    /// Write half; serializes heartbeats, caller sends, and the close frame.
    pub(crate) write: tokio::sync::Mutex<WsSink>,

    /// Read half, parked here between dial and run.
    pub(crate) read: Mutex<Option<WsSource>>,

    /// Cancellation signal observed by both loops.
    pub(crate) cancel: watch::Sender<bool>,

    /// Receiver template; loops clone it so a signal sent before a loop
    /// starts is still observed.
    pub(crate) cancel_rx: watch::Receiver<bool>,

    /// Exactly-once close guard; doubles as the already-closing flag the
    /// reader consults to suppress expected read errors.
    closing: AtomicBool,

    /// Loop join handles, awaited during close.
    pub(crate) tasks: Mutex<Vec<JoinHandle<()>>>,

    /// Endpoint this connection reached.
    pub(crate) endpoint: String,
}

impl Conn {
    fn new(stream: WsStream, endpoint: String) -> Self {
        let (write, read) = stream.split();
        let (cancel, cancel_rx) = watch::channel(false);

        Self {
            write: tokio::sync::Mutex::new(write),
            read: Mutex::new(Some(read)),
            cancel,
            cancel_rx,
            closing: AtomicBool::new(false),
            tasks: Mutex::new(Vec::with_capacity(2)),
            endpoint,
        }
    }

    /// Returns `true` once the shutdown sequence has been claimed.
    #[inline]
    pub(crate) fn is_closing(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }

    /// Claims the shutdown sequence; only the first caller gets `true`.
    #[inline]
    fn claim_close(&self) -> bool {
        !self.closing.swap(true, Ordering::SeqCst)
    }
}

// ============================================================================
// SessionInner
// ============================================================================

/// State shared by all clones of a [`Session`] handle.
pub(crate) struct SessionInner {
    /// Last-known credentials; replaced on reconnect.
    pub(crate) credentials: RwLock<Arc<dyn Credentials>>,

    /// Handler registry; built-ins first, caller entries layered on top.
    pub(crate) dispatch: RwLock<DispatchTable>,

    /// Set by the auth-reply handler on a success code.
    authed: AtomicBool,

    /// Invoked at the end of every shutdown sequence.
    pub(crate) on_close: RwLock<Option<CloseCallback>>,

    /// Live connection, if any.
    conn: RwLock<Option<Arc<Conn>>>,

    /// Timing and capacity configuration.
    pub(crate) options: SessionOptions,

    /// Per-session span entered by both loops.
    pub(crate) span: Span,
}

// ============================================================================
// Session
// ============================================================================

/// Handle to one logical push-message session.
///
/// Cloning is cheap and all clones share state; the handle can be moved
/// into handlers, close callbacks, and spawned tasks freely.
#[derive(Clone)]
pub struct Session {
    /// Shared inner state.
    pub(crate) inner: Arc<SessionInner>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Session - Construction
// ============================================================================

impl Session {
    /// Creates an idle session from credentials and options.
    ///
    /// The dispatch table starts with the built-in authentication-reply
    /// and heartbeat-reply handlers; use [`Session::register_handler`] to
    /// add application handlers (or override the built-ins) before
    /// [`Session::run`].
    #[must_use]
    pub fn new(credentials: Arc<dyn Credentials>, options: SessionOptions) -> Self {
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);

        let mut dispatch = DispatchTable::new();
        dispatch.register(opcode::AUTH_REPLY, AuthReplyHandler);
        dispatch.register(opcode::HEARTBEAT_REPLY, HeartbeatReplyHandler);

        Self {
            inner: Arc::new(SessionInner {
                credentials: RwLock::new(credentials),
                dispatch: RwLock::new(dispatch),
                authed: AtomicBool::new(false),
                on_close: RwLock::new(None),
                conn: RwLock::new(None),
                options,
                span: info_span!("session", id),
            }),
        }
    }

    /// Creates a builder for configuring and bootstrapping a session.
    #[inline]
    #[must_use]
    pub fn builder() -> super::builder::SessionBuilder {
        super::builder::SessionBuilder::new()
    }
}

// ============================================================================
// Session - State Accessors
// ============================================================================

impl Session {
    /// Returns `true` once the server has accepted the auth frame.
    #[inline]
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.authed.load(Ordering::SeqCst)
    }

    /// Marks the session authenticated.
    ///
    /// Called by the built-in auth-reply handler; exposed for callers that
    /// override it.
    #[inline]
    pub fn mark_authenticated(&self) {
        self.inner.authed.store(true, Ordering::SeqCst);
    }

    /// Returns `true` while a physical connection is open.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.conn.read().is_some()
    }

    /// Returns the last-known credentials.
    #[must_use]
    pub fn credentials(&self) -> Arc<dyn Credentials> {
        self.inner.credentials.read().clone()
    }

    /// Registers a handler closure for an operation code.
    ///
    /// Last registration wins, including over the built-in auth-reply and
    /// heartbeat-reply handlers. Intended to be called before
    /// [`Session::run`]. For handler objects implementing
    /// [`crate::dispatch::MessageHandler`] directly, see
    /// [`DispatchTable::register`].
    pub fn register_handler<F>(&self, opcode: u32, handler: F)
    where
        F: Fn(&Session, &Message) -> Result<()> + Send + Sync + 'static,
    {
        self.inner.dispatch.write().register(opcode, handler);
    }

    /// Sets the close callback.
    pub fn set_close_callback<F>(&self, callback: F)
    where
        F: Fn(&Session, &Arc<dyn Credentials>, CloseReason) + Send + Sync + 'static,
    {
        *self.inner.on_close.write() = Some(Arc::new(callback));
    }

    /// Returns the live connection or [`Error::NotConnected`].
    pub(crate) fn conn(&self) -> Result<Arc<Conn>> {
        self.inner.conn.read().clone().ok_or(Error::NotConnected)
    }
}

// ============================================================================
// Session - Dial
// ============================================================================

impl Session {
    /// Connects to the first reachable candidate endpoint from the
    /// stored credentials.
    ///
    /// # Errors
    ///
    /// Same as [`Session::dial_to`].
    pub async fn dial(&self) -> Result<()> {
        let endpoints: Vec<String> = self.credentials().endpoints().to_vec();
        self.dial_to(&endpoints).await
    }

    /// Connects to the first reachable of the given endpoints.
    ///
    /// Endpoints are tried in order; the first successful handshake wins.
    /// Repeated failure leaves no partial state.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if `endpoints` is empty
    /// - [`Error::Dial`] with one [`DialAttempt`] per endpoint if all fail
    pub async fn dial_to(&self, endpoints: &[String]) -> Result<()> {
        if endpoints.is_empty() {
            return Err(Error::config("no candidate endpoints"));
        }

        let mut attempts = Vec::with_capacity(endpoints.len());
        for endpoint in endpoints {
            if let Err(e) = Url::parse(endpoint) {
                warn!(parent: &self.inner.span, endpoint = %endpoint, error = %e, "invalid endpoint");
                attempts.push(DialAttempt {
                    endpoint: endpoint.clone(),
                    message: e.to_string(),
                });
                continue;
            }

            match connect_async(endpoint.as_str()).await {
                Ok((stream, _response)) => {
                    info!(parent: &self.inner.span, endpoint = %endpoint, "dial success");
                    let conn = Arc::new(Conn::new(stream, endpoint.clone()));
                    *self.inner.conn.write() = Some(conn);
                    return Ok(());
                }
                Err(e) => {
                    warn!(parent: &self.inner.span, endpoint = %endpoint, error = %e, "dial fail");
                    attempts.push(DialAttempt {
                        endpoint: endpoint.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        Err(Error::dial(attempts))
    }
}

// ============================================================================
// Session - Sending
// ============================================================================

impl Session {
    /// Writes one packed message to the connection.
    ///
    /// Concurrent senders (heartbeats, callers, the close frame) are
    /// serialized on the write half's lock.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if no connection is open
    /// - [`Error::WebSocket`] if the transport write fails
    pub async fn send_raw(&self, message: Message) -> Result<()> {
        let conn = self.conn()?;
        let mut write = conn.write.lock().await;
        write.send(WsMessage::Binary(message.to_bytes())).await?;
        Ok(())
    }

    /// Sends an application frame with the given operation code.
    ///
    /// # Errors
    ///
    /// Same as [`Session::send_raw`].
    pub async fn send_message(&self, opcode: u32, payload: impl Into<Bytes>) -> Result<()> {
        self.send_raw(Message::pack(DEFAULT_SEQUENCE, opcode, payload.into()))
            .await
    }

    /// Sends the authentication frame with the caller-supplied body.
    ///
    /// # Errors
    ///
    /// Same as [`Session::send_raw`].
    pub async fn send_auth(&self) -> Result<()> {
        let body = Bytes::copy_from_slice(self.credentials().auth_body());
        debug!(parent: &self.inner.span, bytes = body.len(), "send auth");
        self.send_raw(Message::pack(DEFAULT_SEQUENCE, opcode::AUTH, body))
            .await
    }

    /// Sends a heartbeat frame.
    ///
    /// # Errors
    ///
    /// Same as [`Session::send_raw`].
    pub async fn send_heartbeat(&self) -> Result<()> {
        self.send_raw(Message::pack(DEFAULT_SEQUENCE, opcode::HEARTBEAT, Bytes::new()))
            .await
    }
}

// ============================================================================
// Session - Run / Close / Reconnect
// ============================================================================

impl Session {
    /// Starts the reader and event loops for the current connection.
    ///
    /// Exactly two tasks are spawned; their handles are retained so close
    /// can wait for both to exit. Calling without a connection, or twice
    /// for one connection, logs a warning and does nothing.
    pub fn run(&self) {
        let Ok(conn) = self.conn() else {
            warn!(parent: &self.inner.span, "run called without a connection");
            return;
        };

        let Some(read) = conn.read.lock().take() else {
            warn!(parent: &self.inner.span, "run called twice for one connection");
            return;
        };

        let (queue_tx, queue_rx) = mpsc::channel(self.inner.options.queue_capacity);

        let reader = tokio::spawn(
            loops::read_loop(self.clone(), Arc::clone(&conn), read, queue_tx)
                .instrument(self.inner.span.clone()),
        );
        let events = tokio::spawn(
            loops::event_loop(self.clone(), Arc::clone(&conn), queue_rx)
                .instrument(self.inner.span.clone()),
        );

        conn.tasks.lock().extend([reader, events]);
    }

    /// Closes the session on behalf of the caller.
    ///
    /// Equivalent to [`Session::close_with_reason`] with
    /// [`CloseReason::Actively`].
    pub async fn close(&self) {
        self.close_with_reason(CloseReason::Actively).await;
    }

    /// Executes the shutdown sequence exactly once.
    ///
    /// The first caller sends a best-effort close frame, signals
    /// cancellation, waits for both loops to exit, closes the socket,
    /// clears the connection, and invokes the close callback with the
    /// last-known credentials and `reason`. Concurrent and later callers
    /// return without re-running any side effect.
    ///
    /// Must not be awaited from inside a dispatch handler — the handler
    /// runs on the event loop this waits for. Handlers use
    /// [`Session::close_detached`] instead.
    pub async fn close_with_reason(&self, reason: CloseReason) {
        let conn = { self.inner.conn.read().clone() };
        let Some(conn) = conn else {
            return;
        };

        if !conn.claim_close() {
            return;
        }

        info!(
            parent: &self.inner.span,
            reason = %reason,
            endpoint = %conn.endpoint,
            "session close"
        );

        // Best-effort: the peer may already be gone.
        {
            let mut write = conn.write.lock().await;
            let _ = write.send(WsMessage::Close(None)).await;
        }

        let _ = conn.cancel.send(true);

        // Both loops must be fully stopped before the socket goes away and
        // before the callback observes the close.
        let handles: Vec<JoinHandle<()>> = conn.tasks.lock().drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }

        {
            let mut write = conn.write.lock().await;
            let _ = write.close().await;
        }

        *self.inner.conn.write() = None;

        let callback = self.inner.on_close.read().clone();
        if let Some(callback) = callback {
            let credentials = self.credentials();
            callback(self, &credentials, reason);
        }
    }

    /// Runs the shutdown sequence on a detached task.
    ///
    /// The loops and handlers use this to request a close without
    /// deadlocking on their own join handles.
    pub fn close_detached(&self, reason: CloseReason) {
        let session = self.clone();
        tokio::spawn(async move {
            session.close_with_reason(reason).await;
        });
    }

    /// Clears per-connection state after a close.
    ///
    /// Valid only on a closed session; a fresh cancellation signal and
    /// close guard are allocated by the next [`Session::dial`].
    pub fn reset(&self) {
        self.inner.authed.store(false, Ordering::SeqCst);
        *self.inner.conn.write() = None;
    }

    /// Re-establishes the session with new credentials.
    ///
    /// Replaces the stored credentials, resets per-connection state, then
    /// dials, authenticates, and restarts the loops. Safe to trigger from
    /// a close callback by cloning the handle and spawning this future.
    ///
    /// # Errors
    ///
    /// Same as [`Session::dial`] and [`Session::send_auth`]; the attempt
    /// is fatal on error and the caller decides whether to retry.
    pub async fn reconnect(&self, credentials: Arc<dyn Credentials>) -> Result<()> {
        info!(parent: &self.inner.span, "reconnect");

        *self.inner.credentials.write() = credentials;
        self.reset();

        self.dial().await?;
        self.send_auth().await?;
        self.run();
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
