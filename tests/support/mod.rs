// Shared helpers for websocket integration tests: one server per test, real clients.
#![allow(dead_code)]

use flappy_hub::ServerSettings;
use flappy_hub::use_cases::{CountdownSettings, EchoPolicy, HubSettings};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

// Generous bound for anything we expect to arrive.
const RECV_TIMEOUT: Duration = Duration::from_secs(5);

pub fn settings(ticks: u32, interval: Duration) -> ServerSettings {
    ServerSettings {
        hub: HubSettings {
            event_channel_capacity: 256,
            countdown: CountdownSettings { ticks, interval },
            echo_policy: EchoPolicy::ExcludeSender,
        },
        outbound_capacity: 64,
        write_timeout: Duration::from_secs(2),
    }
}

// Start a server on an ephemeral port and return its websocket URL.
pub async fn spawn_server(settings: ServerSettings) -> String {
    // Bind before spawning so early connects queue in the backlog.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral test port");
    let addr = listener.local_addr().expect("get local addr");
    tokio::spawn(async move {
        flappy_hub::run(listener, settings)
            .await
            .expect("server failed");
    });
    format!("ws://{addr}/ws")
}

pub async fn connect(url: &str) -> Client {
    let (client, _response) = connect_async(url).await.expect("websocket handshake");
    client
}

// Connect and consume the client's own `connect` announcement; returns its player id.
pub async fn join(url: &str) -> (Client, String) {
    let mut client = connect(url).await;
    let envelope = next_of_type(&mut client, "connect").await;
    let player_id = envelope["playerID"]
        .as_str()
        .expect("connect carries playerID")
        .to_string();
    (client, player_id)
}

pub async fn send_json(client: &mut Client, payload: Value) {
    client
        .send(Message::text(payload.to_string()))
        .await
        .expect("send message");
}

pub async fn send_raw(client: &mut Client, payload: &str) {
    client
        .send(Message::text(payload))
        .await
        .expect("send message");
}

// Next JSON envelope, or None if nothing arrives within `wait`.
pub async fn try_next_envelope(client: &mut Client, wait: Duration) -> Option<Value> {
    loop {
        let next = tokio::time::timeout(wait, client.next()).await.ok()?;
        let message = next?.expect("websocket read");
        if message.is_text() || message.is_binary() {
            let data = message.into_data();
            return Some(serde_json::from_slice(&data).expect("server sends json"));
        }
    }
}

pub async fn next_envelope(client: &mut Client) -> Value {
    try_next_envelope(client, RECV_TIMEOUT)
        .await
        .expect("expected an envelope")
}

// Skip envelopes until one with the given type arrives.
pub async fn next_of_type(client: &mut Client, kind: &str) -> Value {
    loop {
        let envelope = next_envelope(client).await;
        if envelope["type"] == kind {
            return envelope;
        }
    }
}

// True if no envelope of `kind` arrives within `wait`.
pub async fn stays_silent_about(client: &mut Client, kind: &str, wait: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + wait;
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            return true;
        }
        match try_next_envelope(client, remaining).await {
            Some(envelope) if envelope["type"] == kind => return false,
            Some(_) => continue,
            None => return true,
        }
    }
}
