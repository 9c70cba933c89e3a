// Wire protocol DTOs and conversions for viewer WebSocket messages.

use crate::domain::{Instruction, Position};
use serde::{Deserialize, Serialize};

/// Plain-text reply for any inbound message that cannot be processed.
pub const DEFAULT_ERROR_MESSAGE: &str = "could not process last message";

/// Messages viewers send to the server over the WebSocket.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    // Start (or restart) receiving instruction batches.
    Subscribe { time: i64 },
}

/// Messages the server sends to viewers over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    Instruction {
        time: i64,
        instructions: Vec<InstructionDto>,
    },
}

impl ServerMessage {
    pub fn instructions(time: i64, batch: &[Instruction]) -> Self {
        ServerMessage::Instruction {
            time,
            instructions: batch.iter().map(InstructionDto::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum InstructionDto {
    Create {
        id: String,
        from: PositionDto,
        to: PositionDto,
        direction: &'static str,
        duration: usize,
    },
    Update {
        id: String,
        from: PositionDto,
        to: PositionDto,
        direction: &'static str,
        duration: usize,
    },
    Delete {
        id: String,
    },
}

impl From<&Instruction> for InstructionDto {
    fn from(instruction: &Instruction) -> Self {
        match instruction {
            Instruction::Create {
                id,
                direction,
                from,
                to,
                duration,
            } => InstructionDto::Create {
                id: id.to_string(),
                from: from.into(),
                to: to.into(),
                direction: direction.as_str(),
                duration: *duration,
            },
            Instruction::Update {
                id,
                direction,
                from,
                to,
                duration,
            } => InstructionDto::Update {
                id: id.to_string(),
                from: from.into(),
                to: to.into(),
                direction: direction.as_str(),
                duration: *duration,
            },
            Instruction::Delete { id } => InstructionDto::Delete { id: id.to_string() },
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PositionDto {
    pub latitude: i32,
    pub longitude: i32,
    pub altitude: i32,
}

impl From<&Position> for PositionDto {
    fn from(p: &Position) -> Self {
        Self {
            latitude: p.latitude,
            longitude: p.longitude,
            altitude: p.altitude,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Direction;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn when_subscribe_is_well_formed_then_it_parses() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"subscribe","time":1700000000000}"#).expect("parse");

        assert_eq!(
            msg,
            ClientMessage::Subscribe {
                time: 1_700_000_000_000
            }
        );
    }

    #[test]
    fn when_type_is_unknown_or_missing_then_parsing_fails() {
        for raw in [
            r#"{"type":"unsubscribe","time":1}"#,
            r#"{"time":1}"#,
            r#"{"type":"subscribe"}"#,
            r#"{"type":"subscribe","time":"soon"}"#,
            "subscribe",
            "",
        ] {
            assert!(
                serde_json::from_str::<ClientMessage>(raw).is_err(),
                "expected {raw:?} to be rejected"
            );
        }
    }

    #[test]
    fn when_batch_is_serialized_then_json_matches_viewer_protocol() {
        let created = Uuid::from_u128(1);
        let deleted = Uuid::from_u128(2);
        let batch = vec![
            Instruction::Create {
                id: created,
                direction: Direction::NW,
                from: Position::new(25, 48, 10),
                to: Position::new(23, 52, 10),
                duration: 3,
            },
            Instruction::Delete { id: deleted },
        ];

        let value = serde_json::to_value(ServerMessage::instructions(42, &batch)).expect("json");

        assert_eq!(
            value,
            json!({
                "type": "instruction",
                "time": 42,
                "instructions": [
                    {
                        "action": "create",
                        "id": created.to_string(),
                        "from": {"latitude": 25, "longitude": 48, "altitude": 10},
                        "to": {"latitude": 23, "longitude": 52, "altitude": 10},
                        "direction": "NW",
                        "duration": 3
                    },
                    {"action": "delete", "id": deleted.to_string()}
                ]
            })
        );
    }

    #[test]
    fn when_update_is_serialized_then_action_tag_is_update() {
        let update = Instruction::Update {
            id: Uuid::from_u128(3),
            direction: Direction::S,
            from: Position::new(1, 2, 3),
            to: Position::new(1, -1, 3),
            duration: 4,
        };

        let value = serde_json::to_value(InstructionDto::from(&update)).expect("json");

        assert_eq!(value["action"], "update");
        assert_eq!(value["direction"], "S");
    }
}
