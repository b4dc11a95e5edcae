// JSON codec between wire envelopes and hub commands/events.

use crate::interface_adapters::protocol::{Envelope, Inbound, TYPE_DIE, TYPE_JUMP};
use crate::use_cases::{ClientCommand, EventEncoder, ServerEvent};
use axum::extract::ws::Utf8Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("malformed client message: {0}")]
pub struct DecodeError(#[from] serde_json::Error);

#[derive(Debug, Error)]
#[error("failed to encode {kind} event: {source}")]
pub struct EncodeError {
    kind: String,
    #[source]
    source: serde_json::Error,
}

/// Decodes one inbound message. Anything that is not a JSON object with a
/// string `type` is a `DecodeError`.
pub fn decode(bytes: &[u8]) -> Result<ClientCommand, DecodeError> {
    let inbound: Inbound = serde_json::from_slice(bytes)?;
    Ok(match inbound.kind.as_str() {
        TYPE_JUMP => ClientCommand::Jump,
        TYPE_DIE => ClientCommand::Die,
        _ => ClientCommand::Other(inbound.kind),
    })
}

pub fn encode(event: &ServerEvent) -> Result<Utf8Bytes, EncodeError> {
    let envelope = Envelope::from(event);
    serde_json::to_string(&envelope)
        .map(Utf8Bytes::from)
        .map_err(|source| EncodeError {
            kind: envelope.kind,
            source,
        })
}

/// Encoder handed to the hub.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl EventEncoder for JsonCodec {
    type Error = EncodeError;

    fn encode(&self, event: &ServerEvent) -> Result<Utf8Bytes, Self::Error> {
        encode(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PlayerId;
    use serde_json::{Value, json};
    use uuid::Uuid;

    fn encoded_json(event: &ServerEvent) -> Value {
        let frame = encode(event).expect("event encodes");
        serde_json::from_str(frame.as_str()).expect("frame is json")
    }

    #[test]
    fn player_events_carry_only_type_and_player_id() {
        let uuid = Uuid::parse_str("6f1c2a43-2c55-4a7e-9f0b-8d1f1c9a3e21").expect("valid uuid");
        let player_id = PlayerId::from(uuid);

        assert_eq!(
            encoded_json(&ServerEvent::Connect { player_id }),
            json!({"type": "connect", "playerID": "6f1c2a43-2c55-4a7e-9f0b-8d1f1c9a3e21"})
        );
        assert_eq!(
            encoded_json(&ServerEvent::Jump { player_id }),
            json!({"type": "jump", "playerID": "6f1c2a43-2c55-4a7e-9f0b-8d1f1c9a3e21"})
        );
        assert_eq!(
            encoded_json(&ServerEvent::Die { player_id }),
            json!({"type": "die", "playerID": "6f1c2a43-2c55-4a7e-9f0b-8d1f1c9a3e21"})
        );
    }

    #[test]
    fn phase_events_omit_player_fields() {
        assert_eq!(
            encoded_json(&ServerEvent::Countdown { remaining: 29 }),
            json!({"type": "countdown", "countdown": 29})
        );
        assert_eq!(
            encoded_json(&ServerEvent::Playing),
            json!({"type": "playing"})
        );
        assert_eq!(
            encoded_json(&ServerEvent::GameOver),
            json!({"type": "gameover"})
        );
    }

    #[test]
    fn encoding_is_deterministic() {
        let event = ServerEvent::Countdown { remaining: 3 };
        let a = encode(&event).expect("encodes");
        let b = encode(&event).expect("encodes");
        assert_eq!(a.as_str(), b.as_str());
        assert_eq!(a.as_str(), r#"{"type":"countdown","countdown":3}"#);
    }

    #[test]
    fn decodes_known_commands_and_ignores_extra_fields() {
        assert_eq!(
            decode(br#"{"type":"jump"}"#).expect("decodes"),
            ClientCommand::Jump
        );
        assert_eq!(
            decode(br#"{"type":"die","playerID":"00000000-0000-0000-0000-000000000000"}"#)
                .expect("decodes"),
            ClientCommand::Die
        );
        assert_eq!(
            decode(br#"{"type":"jump","playerID":"not-a-uuid","countdown":0}"#)
                .expect("decodes"),
            ClientCommand::Jump
        );
    }

    #[test]
    fn other_fields_are_ignored_whatever_their_shape() {
        assert_eq!(
            decode(br#"{"type":"jump","countdown":-1}"#).expect("decodes"),
            ClientCommand::Jump
        );
        assert_eq!(
            decode(br#"{"type":"jump","playerID":7}"#).expect("decodes"),
            ClientCommand::Jump
        );
        assert_eq!(
            decode(br#"{"type":"die","state":{},"players":"nobody"}"#).expect("decodes"),
            ClientCommand::Die
        );
        assert_eq!(
            decode(br#"{"playerID":null,"type":"dance","countdown":"soon"}"#).expect("decodes"),
            ClientCommand::Other("dance".to_string())
        );
    }

    #[test]
    fn unknown_types_decode_as_other() {
        assert_eq!(
            decode(br#"{"type":"dance"}"#).expect("decodes"),
            ClientCommand::Other("dance".to_string())
        );
        assert_eq!(
            decode(br#"{"type":"gameover"}"#).expect("decodes"),
            ClientCommand::Other("gameover".to_string())
        );
    }

    #[test]
    fn malformed_input_is_a_decode_error() {
        for bytes in [
            &b"not json"[..],
            &b"{\"type\":"[..],
            &b"[]"[..],
            &b"{}"[..],
            &b"{\"type\":7}"[..],
            &b"\"jump\""[..],
        ] {
            assert!(decode(bytes).is_err(), "expected error for {bytes:?}");
        }
    }
}
