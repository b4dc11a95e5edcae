// Wire envelope exchanged with clients over the websocket.
// One flat JSON object per message, discriminated by `type`.

use crate::use_cases::ServerEvent;
use serde::{Deserialize, Serialize};

pub const TYPE_CONNECT: &str = "connect";
pub const TYPE_JUMP: &str = "jump";
pub const TYPE_DIE: &str = "die";
pub const TYPE_COUNTDOWN: &str = "countdown";
pub const TYPE_PLAYING: &str = "playing";
pub const TYPE_GAMEOVER: &str = "gameover";

/// Outbound envelope; fields that do not apply to a type are omitted on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "playerID", skip_serializing_if = "Option::is_none")]
    pub player_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub countdown: Option<u32>,
    // Reserved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    // Reserved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub players: Option<Vec<String>>,
}

/// Inbound message. Only `type` is read; every other field is ignored whatever its shape,
/// including a client-supplied `playerID` (the hub uses the connection's own id).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Inbound {
    #[serde(rename = "type")]
    pub kind: String,
}

impl Envelope {
    fn of_kind(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            ..Self::default()
        }
    }
}

impl From<&ServerEvent> for Envelope {
    fn from(event: &ServerEvent) -> Self {
        match event {
            ServerEvent::Connect { player_id } => Self {
                player_id: Some(player_id.to_string()),
                ..Self::of_kind(TYPE_CONNECT)
            },
            ServerEvent::Jump { player_id } => Self {
                player_id: Some(player_id.to_string()),
                ..Self::of_kind(TYPE_JUMP)
            },
            ServerEvent::Die { player_id } => Self {
                player_id: Some(player_id.to_string()),
                ..Self::of_kind(TYPE_DIE)
            },
            ServerEvent::Countdown { remaining } => Self {
                countdown: Some(*remaining),
                ..Self::of_kind(TYPE_COUNTDOWN)
            },
            ServerEvent::Playing => Self::of_kind(TYPE_PLAYING),
            ServerEvent::GameOver => Self::of_kind(TYPE_GAMEOVER),
        }
    }
}
