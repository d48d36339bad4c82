//! End-to-end session tests against an in-process WebSocket server.
//!
//! Each test binds a localhost listener, scripts the server side of the
//! protocol by hand, and drives a real session through bootstrap,
//! dispatch, and close.

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use pushlink::protocol::{DEFAULT_SEQUENCE, HEADER_SIZE, Header, Message, opcode, version};
use pushlink::{CloseReason, Session, SessionOptions, StaticCredentials};

const WAIT: Duration = Duration::from_secs(5);

/// Routes session logs through the test harness; `RUST_LOG` controls
/// verbosity.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Server-Side Helpers
// ============================================================================

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let endpoint = format!("ws://{}", listener.local_addr().expect("addr"));
    (listener, endpoint)
}

async fn accept(listener: &TcpListener) -> WebSocketStream<TcpStream> {
    let (stream, _) = listener.accept().await.expect("accept");
    accept_async(stream).await.expect("handshake")
}

/// Reads binary frames until one decodes, skipping control messages.
async fn recv_frames(ws: &mut WebSocketStream<TcpStream>) -> Vec<Message> {
    loop {
        match ws.next().await {
            Some(Ok(WsMessage::Binary(data))) => {
                return pushlink::protocol::decode_frames(&data).expect("decode client frame");
            }
            Some(Ok(_)) => continue,
            other => panic!("client hung up early: {other:?}"),
        }
    }
}

async fn send_frame(ws: &mut WebSocketStream<TcpStream>, message: Message) {
    ws.send(WsMessage::Binary(message.to_bytes()))
        .await
        .expect("server send");
}

/// Drains the connection until the client goes away.
async fn serve_until_disconnect(mut ws: WebSocketStream<TcpStream>) {
    while let Some(next) = ws.next().await {
        if next.is_err() {
            break;
        }
    }
}

fn auth_ok() -> Message {
    Message::pack(
        DEFAULT_SEQUENCE,
        opcode::AUTH_REPLY,
        Bytes::from_static(br#"{"code":0}"#),
    )
}

fn push(payload: &'static [u8]) -> Message {
    Message::pack(DEFAULT_SEQUENCE, opcode::MESSAGE, Bytes::from_static(payload))
}

/// Packs frames into one zlib batch frame, as the server does for bursts.
fn compress_batch(frames: &[Message]) -> Vec<u8> {
    let mut plain = Vec::new();
    for frame in frames {
        plain.extend_from_slice(&frame.to_bytes());
    }

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&plain).expect("compress");
    let compressed = encoder.finish().expect("finish");

    let header = Header {
        total_len: (HEADER_SIZE + compressed.len()) as u32,
        header_len: HEADER_SIZE as u16,
        version: version::ZLIB_BATCH,
        opcode: opcode::MESSAGE,
        sequence: 0,
    };

    let mut wire = header.encode().to_vec();
    wire.extend_from_slice(&compressed);
    wire
}

fn credentials_for(endpoint: &str) -> StaticCredentials {
    StaticCredentials::new(br#"{"token":"secret"}"#.to_vec(), vec![endpoint.to_string()])
}

// ============================================================================
// Bootstrap & Dispatch
// ============================================================================

#[tokio::test]
async fn bootstrap_authenticates_and_dispatches_in_order() {
    init_tracing();
    let (listener, endpoint) = bind().await;

    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;

        let auth = recv_frames(&mut ws).await;
        assert_eq!(auth.len(), 1);
        assert_eq!(auth[0].opcode(), opcode::AUTH);
        assert_eq!(auth[0].payload(), br#"{"token":"secret"}"#);

        send_frame(&mut ws, auth_ok()).await;
        send_frame(&mut ws, push(b"one")).await;
        send_frame(&mut ws, push(b"two")).await;
        send_frame(&mut ws, push(b"three")).await;

        serve_until_disconnect(ws).await;
    });

    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let session = Session::builder()
        .credentials(credentials_for(&endpoint))
        .handler(opcode::MESSAGE, move |_session, msg| {
            tx.send(msg.payload().to_vec()).expect("record");
            Ok(())
        })
        .connect()
        .await
        .expect("bootstrap");

    for expected in [b"one".as_slice(), b"two", b"three"] {
        let payload = timeout(WAIT, rx.recv()).await.expect("delivery").expect("open");
        assert_eq!(payload, expected);
    }

    // Auth reply was queued before the pushes, so by now it has run.
    assert!(session.is_authenticated());

    session.close().await;
    assert!(!session.is_connected());
    timeout(WAIT, server).await.expect("server exit").expect("join");
}

#[tokio::test]
async fn compressed_batch_is_expanded_in_order() {
    init_tracing();
    let (listener, endpoint) = bind().await;

    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        let _auth = recv_frames(&mut ws).await;
        send_frame(&mut ws, auth_ok()).await;

        let batch = compress_batch(&[push(b"alpha"), push(b"beta"), push(b"gamma")]);
        ws.send(WsMessage::Binary(batch.into())).await.expect("send batch");

        serve_until_disconnect(ws).await;
    });

    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let session = Session::builder()
        .credentials(credentials_for(&endpoint))
        .handler(opcode::MESSAGE, move |_session, msg| {
            tx.send(msg.payload().to_vec()).expect("record");
            Ok(())
        })
        .connect()
        .await
        .expect("bootstrap");

    for expected in [b"alpha".as_slice(), b"beta", b"gamma"] {
        let payload = timeout(WAIT, rx.recv()).await.expect("delivery").expect("open");
        assert_eq!(payload, expected);
    }

    session.close().await;
    timeout(WAIT, server).await.expect("server exit").expect("join");
}

#[tokio::test]
async fn heartbeat_is_sent_on_the_wire() {
    init_tracing();
    let (listener, endpoint) = bind().await;
    let (beat_tx, mut beat_rx) = mpsc::unbounded_channel::<Vec<u8>>();

    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        let _auth = recv_frames(&mut ws).await;
        send_frame(&mut ws, auth_ok()).await;

        let frames = recv_frames(&mut ws).await;
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].opcode(), opcode::HEARTBEAT);
        beat_tx.send(frames[0].to_bytes().to_vec()).expect("record");

        serve_until_disconnect(ws).await;
    });

    let session = Session::builder()
        .credentials(credentials_for(&endpoint))
        .options(SessionOptions::new().with_heartbeat_interval(Duration::from_millis(100)))
        .connect()
        .await
        .expect("bootstrap");

    let wire = timeout(WAIT, beat_rx.recv()).await.expect("beat").expect("open");
    assert_eq!(wire, [0, 0, 0, 16, 0, 16, 0, 1, 0, 0, 0, 2, 0, 0, 0, 1]);

    session.close().await;
    timeout(WAIT, server).await.expect("server exit").expect("join");
}

// ============================================================================
// Close Semantics
// ============================================================================

#[tokio::test]
async fn server_shutdown_reported_to_close_callback() {
    init_tracing();
    let (listener, endpoint) = bind().await;

    tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        let _auth = recv_frames(&mut ws).await;
        send_frame(&mut ws, auth_ok()).await;
        ws.close(None).await.expect("server close");
        serve_until_disconnect(ws).await;
    });

    let (reason_tx, mut reason_rx) = mpsc::unbounded_channel::<CloseReason>();
    let _session = Session::builder()
        .credentials(credentials_for(&endpoint))
        .on_close(move |_session, _credentials, reason| {
            reason_tx.send(reason).expect("record");
        })
        .connect()
        .await
        .expect("bootstrap");

    let reason = timeout(WAIT, reason_rx.recv()).await.expect("callback").expect("open");
    assert_eq!(reason, CloseReason::ServerShutdown);
}

#[tokio::test]
async fn concurrent_close_fires_callback_exactly_once() {
    init_tracing();
    let (listener, endpoint) = bind().await;

    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        let _auth = recv_frames(&mut ws).await;
        send_frame(&mut ws, auth_ok()).await;
        serve_until_disconnect(ws).await;
    });

    let fired = Arc::new(AtomicUsize::new(0));
    let fired_clone = Arc::clone(&fired);

    let session = Session::builder()
        .credentials(credentials_for(&endpoint))
        .on_close(move |_session, _credentials, _reason| {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        })
        .connect()
        .await
        .expect("bootstrap");

    tokio::join!(session.close(), session.close());
    session.close().await;

    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert!(!session.is_connected());
    timeout(WAIT, server).await.expect("server exit").expect("join");
}

#[tokio::test]
async fn auth_timeout_closes_with_auth_failed() {
    init_tracing();
    let (listener, endpoint) = bind().await;

    tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        // Swallow the auth frame and never answer.
        let _auth = recv_frames(&mut ws).await;
        serve_until_disconnect(ws).await;
    });

    let (reason_tx, mut reason_rx) = mpsc::unbounded_channel::<CloseReason>();
    let session = Session::builder()
        .credentials(credentials_for(&endpoint))
        .options(SessionOptions::new().with_auth_timeout(Duration::from_millis(200)))
        .on_close(move |session, _credentials, reason| {
            assert!(!session.is_authenticated());
            reason_tx.send(reason).expect("record");
        })
        .connect()
        .await
        .expect("bootstrap");

    let reason = timeout(WAIT, reason_rx.recv()).await.expect("callback").expect("open");
    assert_eq!(reason, CloseReason::AuthFailed);
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn auth_rejection_closes_with_auth_failed() {
    init_tracing();
    let (listener, endpoint) = bind().await;

    tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        let _auth = recv_frames(&mut ws).await;
        send_frame(
            &mut ws,
            Message::pack(
                DEFAULT_SEQUENCE,
                opcode::AUTH_REPLY,
                Bytes::from_static(br#"{"code":403}"#),
            ),
        )
        .await;
        serve_until_disconnect(ws).await;
    });

    let (reason_tx, mut reason_rx) = mpsc::unbounded_channel::<CloseReason>();
    let session = Session::builder()
        .credentials(credentials_for(&endpoint))
        .on_close(move |_session, _credentials, reason| {
            reason_tx.send(reason).expect("record");
        })
        .connect()
        .await
        .expect("bootstrap");

    let reason = timeout(WAIT, reason_rx.recv()).await.expect("callback").expect("open");
    assert_eq!(reason, CloseReason::AuthFailed);
    assert!(!session.is_authenticated());
}

// ============================================================================
// Reconnect
// ============================================================================

#[tokio::test]
async fn reconnect_from_close_callback_reauthenticates() {
    init_tracing();
    let (listener, endpoint) = bind().await;

    let server = tokio::spawn(async move {
        // First connection: authenticate, then shut the client out.
        let mut ws = accept(&listener).await;
        let _auth = recv_frames(&mut ws).await;
        send_frame(&mut ws, auth_ok()).await;
        ws.close(None).await.expect("server close");
        serve_until_disconnect(ws).await;

        // Second connection: the reconnect attempt.
        let mut ws = accept(&listener).await;
        let auth = recv_frames(&mut ws).await;
        assert_eq!(auth[0].opcode(), opcode::AUTH);
        send_frame(&mut ws, auth_ok()).await;
        serve_until_disconnect(ws).await;
    });

    let (reason_tx, mut reason_rx) = mpsc::unbounded_channel::<CloseReason>();
    let session = Session::builder()
        .credentials(credentials_for(&endpoint))
        .on_close(move |session, credentials, reason| {
            reason_tx.send(reason).expect("record");
            if reason == CloseReason::ServerShutdown {
                let session = session.clone();
                let credentials = Arc::clone(credentials);
                tokio::spawn(async move {
                    session.reconnect(credentials).await.expect("reconnect");
                });
            }
        })
        .connect()
        .await
        .expect("bootstrap");

    // First observe the server-initiated close, then the reconnect.
    let reason = timeout(WAIT, reason_rx.recv()).await.expect("callback").expect("open");
    assert_eq!(reason, CloseReason::ServerShutdown);

    timeout(WAIT, async {
        while !session.is_authenticated() || !session.is_connected() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("reauthenticated");

    session.close().await;
    timeout(WAIT, server).await.expect("server exit").expect("join");
}
