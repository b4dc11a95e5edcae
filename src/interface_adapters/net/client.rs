use crate::domain::PlayerId;
use crate::interface_adapters::codec;
use crate::interface_adapters::state::AppState;
use crate::use_cases::{ConnId, Connection, HubError, HubHandle};

use axum::{
    Error,
    extract::{
        State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use futures::{Sink, SinkExt, StreamExt};
use futures_util::stream::SplitStream;
use std::{
    fmt::Display,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};
use tokio::sync::{Notify, mpsc};
use tokio::time::timeout;
use tracing::{Instrument, debug, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // The hub queue is gone; nothing left to forward to.
    HubClosed,
}

impl From<HubError> for NetError {
    fn from(e: HubError) -> Self {
        match e {
            HubError::Closed => NetError::HubClosed,
        }
    }
}

enum LoopControl {
    Continue,
    Disconnect,
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Process-unique connection id, used as the registry key and in log spans.
fn next_conn_id() -> ConnId {
    static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);
    NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed)
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

struct ReadStats {
    msgs_in: u64,
    bytes_in: u64,
    invalid: u64,
    last_invalid_log: Instant,
}

impl ReadStats {
    fn new() -> Self {
        Self {
            msgs_in: 0,
            bytes_in: 0,
            invalid: 0,
            // Let the first invalid message through the throttle.
            last_invalid_log: Instant::now()
                .checked_sub(LOG_THROTTLE)
                .unwrap_or_else(Instant::now),
        }
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let conn_id = next_conn_id();
    let player_id = PlayerId::new_random();
    let span = info_span!("conn", conn_id, %player_id);
    run_connection(socket, conn_id, player_id, state)
        .instrument(span)
        .await;
}

async fn run_connection(
    socket: WebSocket,
    conn_id: ConnId,
    player_id: PlayerId,
    state: Arc<AppState>,
) {
    let (sink, stream) = socket.split();
    let (outbound_tx, outbound_rx) = mpsc::channel::<Utf8Bytes>(state.outbound_capacity);
    let writer_done = Arc::new(Notify::new());

    tokio::spawn(
        write_loop(sink, outbound_rx, state.write_timeout, writer_done.clone())
            .instrument(tracing::Span::current()),
    );

    let connection = Connection {
        conn_id,
        player_id,
        outbound: outbound_tx,
    };
    // On failure the connection (and its queue) is dropped, so the writer closes the socket.
    if let Err(e) = state.hub.connect(connection).await {
        warn!(error = %e, "hub unavailable; dropping connection");
        return;
    }
    info!("client connected");

    let mut stats = ReadStats::new();
    if let Err(e) = read_loop(stream, conn_id, &state.hub, &writer_done, &mut stats).await {
        warn!(error = ?e, "client loop exited with error");
    }

    // Unregister closes the outbound queue; the writer then closes the socket.
    if let Err(e) = state.hub.disconnect(conn_id).await {
        debug!(error = %e, "hub gone before disconnect");
    }
    debug!(
        msgs_in = stats.msgs_in,
        bytes_in = stats.bytes_in,
        invalid = stats.invalid,
        "connection stats"
    );
    info!("client disconnected");
}

async fn read_loop(
    mut stream: SplitStream<WebSocket>,
    conn_id: ConnId,
    hub: &HubHandle,
    writer_done: &Notify,
    stats: &mut ReadStats,
) -> Result<(), NetError> {
    loop {
        let incoming = tokio::select! {
            incoming = stream.next() => incoming,
            // A dead writer means the socket is unusable; stop reading too.
            _ = writer_done.notified() => {
                debug!("writer stopped; ending read loop");
                return Ok(());
            }
        };

        match handle_incoming_ws(incoming, conn_id, hub, stats).await? {
            LoopControl::Continue => {}
            LoopControl::Disconnect => return Ok(()),
        }
    }
}

async fn handle_incoming_ws(
    incoming: Option<Result<Message, Error>>,
    conn_id: ConnId,
    hub: &HubHandle,
    stats: &mut ReadStats,
) -> Result<LoopControl, NetError> {
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                forward_message(text.as_str().as_bytes(), conn_id, hub, stats).await
            }
            Message::Binary(bytes) => forward_message(&bytes, conn_id, hub, stats).await,
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!("websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

// Decode failures are dropped; the connection stays open.
async fn forward_message(
    payload: &[u8],
    conn_id: ConnId,
    hub: &HubHandle,
    stats: &mut ReadStats,
) -> Result<LoopControl, NetError> {
    stats.msgs_in += 1;
    stats.bytes_in += payload.len() as u64;

    match codec::decode(payload) {
        Ok(command) => {
            hub.message(conn_id, command).await?;
            Ok(LoopControl::Continue)
        }
        Err(e) => {
            stats.invalid += 1;
            if should_log(&mut stats.last_invalid_log) {
                warn!(bytes = payload.len(), error = %e, "dropping undecodable message");
            }
            Ok(LoopControl::Continue)
        }
    }
}

// Drains the outbound queue into the socket. A failed or timed-out write ends the
// writer, closes the queue and wakes the reader.
async fn write_loop<S>(
    mut sink: S,
    mut outbound_rx: mpsc::Receiver<Utf8Bytes>,
    write_timeout: Duration,
    writer_done: Arc<Notify>,
) where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    let mut msgs_out: u64 = 0;
    let mut bytes_out: u64 = 0;
    let mut close_frame = Some(CloseFrame {
        code: close_code::NORMAL,
        reason: "".into(),
    });

    while let Some(frame) = outbound_rx.recv().await {
        let len = frame.as_str().len();
        match timeout(write_timeout, sink.send(Message::Text(frame))).await {
            Ok(Ok(())) => {
                msgs_out += 1;
                bytes_out += len as u64;
            }
            Ok(Err(e)) => {
                warn!(error = %e, "websocket send failed");
                close_frame = None;
                break;
            }
            Err(_) => {
                warn!(
                    timeout_ms = write_timeout.as_millis() as u64,
                    "websocket send timed out"
                );
                close_frame = Some(CloseFrame {
                    code: close_code::POLICY,
                    reason: "write timeout".into(),
                });
                break;
            }
        }
    }

    // A closed queue makes the hub's next enqueue fail, which removes this connection.
    outbound_rx.close();
    writer_done.notify_one();

    if let Some(frame) = close_frame {
        let _ = timeout(CLOSE_TIMEOUT, sink.send(Message::Close(Some(frame)))).await;
    }
    let _ = timeout(CLOSE_TIMEOUT, sink.close()).await;
    debug!(msgs_out, bytes_out, "writer stopped");
}
