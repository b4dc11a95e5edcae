// Use-case level inputs/outputs for the hub.

use crate::domain::{GamePhase, Player, PlayerId};
use axum::extract::ws::Utf8Bytes;
use tokio::sync::{mpsc, oneshot};

pub type ConnId = u64;

/// A live client as seen by the hub: identity plus its outbound frame queue.
#[derive(Debug)]
pub struct Connection {
    pub conn_id: ConnId,
    pub player_id: PlayerId,
    pub outbound: mpsc::Sender<Utf8Bytes>,
}

/// Decoded inbound client message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    Jump,
    Die,
    // Well-formed envelope with a type the hub does not act on.
    Other(String),
}

/// Events the hub fans out to connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    Connect { player_id: PlayerId },
    Jump { player_id: PlayerId },
    Die { player_id: PlayerId },
    Countdown { remaining: u32 },
    Playing,
    GameOver,
}

/// Read-only view of the hub for queries.
#[derive(Debug, Clone)]
pub struct GameSnapshot {
    pub phase: GamePhase,
    pub players: Vec<Player>,
    pub connections: usize,
}

/// Everything funneled through the hub's single queue.
#[derive(Debug)]
pub enum HubEvent {
    Connect(Connection),
    Disconnect {
        conn_id: ConnId,
    },
    Message {
        conn_id: ConnId,
        command: ClientCommand,
    },
    CountdownTick {
        generation: u64,
        remaining: u32,
    },
    CountdownFinished {
        generation: u64,
    },
    Snapshot(oneshot::Sender<GameSnapshot>),
}
