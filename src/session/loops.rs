//! The two per-connection background loops.
//!
//! The reader loop and the event loop are the only tasks a session runs.
//! They share one bounded queue: the reader decodes inbound frames and
//! enqueues messages; the event loop interleaves queue dispatch with the
//! authentication timeout and the heartbeat tick. Both observe the
//! connection's cancellation signal and exit promptly when it fires.
//!
//! Messages reach handlers in exactly the order the reader decoded them;
//! a slow handler therefore delays heartbeats and everything queued
//! behind it.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, info, trace};

use crate::protocol::{Message, decode_frames};

use super::core::{CloseReason, Conn, Session, WsSource};

// ============================================================================
// Reader Loop
// ============================================================================

/// Reads wire messages, decodes frames, and feeds the inbound queue.
///
/// Fatal conditions never surface to a caller; they are converted into a
/// detached close with the matching [`CloseReason`]. A read failure after
/// the close guard is set is the expected side effect of closing and is
/// suppressed entirely.
pub(crate) async fn read_loop(
    session: Session,
    conn: Arc<Conn>,
    mut read: WsSource,
    queue: mpsc::Sender<Message>,
) {
    info!("read loop start");
    let mut cancel = conn.cancel_rx.clone();

    'outer: loop {
        tokio::select! {
            _ = cancel.changed() => break,

            next = read.next() => match next {
                Some(Ok(WsMessage::Binary(data))) => {
                    let frames = match decode_frames(&data) {
                        Ok(frames) => frames,
                        Err(e) => {
                            // Non-fatal: skip the frame, keep the session.
                            error!(error = %e, "decode inbound frame fail");
                            continue;
                        }
                    };

                    for message in frames {
                        if queue.send(message).await.is_err() {
                            // Event loop is gone; nothing left to deliver to.
                            break 'outer;
                        }
                    }
                }

                Some(Ok(WsMessage::Close(_))) => {
                    info!("received shutdown message");
                    session.close_detached(CloseReason::ServerShutdown);
                    break;
                }

                Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_))) => {
                    trace!("ping/pong");
                }

                Some(Ok(_)) => {
                    debug!("ignoring non-binary message");
                }

                Some(Err(e)) => {
                    if !conn.is_closing() {
                        error!(error = %e, "read message fail");
                        session.close_detached(CloseReason::ReadError);
                    }
                    break;
                }

                None => {
                    if !conn.is_closing() {
                        error!("connection stream ended");
                        session.close_detached(CloseReason::ReadError);
                    }
                    break;
                }
            }
        }
    }

    info!("read loop stop");
}

// ============================================================================
// Event Loop
// ============================================================================

/// Dispatches queued messages and drives the session timers.
///
/// Waits on four things: the cancellation signal (exit), the one-shot
/// authentication deadline (close with `AuthFailed` if still
/// unauthenticated), the heartbeat tick (send, log-only on failure), and
/// the inbound queue (FIFO dispatch; handler errors are logged, never
/// fatal).
pub(crate) async fn event_loop(session: Session, conn: Arc<Conn>, mut queue: mpsc::Receiver<Message>) {
    info!("event loop start");
    let mut cancel = conn.cancel_rx.clone();
    let options = session.inner.options.clone();

    let mut heartbeat = time::interval_at(
        Instant::now() + options.heartbeat_interval,
        options.heartbeat_interval,
    );
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // One-shot, like the server's own auth window.
    let auth_deadline = time::sleep(options.auth_timeout);
    tokio::pin!(auth_deadline);
    let mut auth_pending = true;

    loop {
        tokio::select! {
            _ = cancel.changed() => break,

            () = &mut auth_deadline, if auth_pending => {
                auth_pending = false;
                if !session.is_authenticated() {
                    error!("auth timeout");
                    session.close_detached(CloseReason::AuthFailed);
                }
            }

            _ = heartbeat.tick() => {
                debug!("send heartbeat");
                if let Err(e) = session.send_heartbeat().await {
                    error!(error = %e, "send heartbeat fail");
                }
            }

            message = queue.recv() => {
                let Some(message) = message else {
                    // Reader is gone and the queue is drained.
                    break;
                };

                let handler = { session.inner.dispatch.read().lookup(message.opcode()) };
                if let Some(handler) = handler {
                    if let Err(e) = handler.handle(&session, &message) {
                        error!(opcode = message.opcode(), error = %e, "handle message fail");
                    }
                }
            }
        }
    }

    info!("event loop stop");
}
