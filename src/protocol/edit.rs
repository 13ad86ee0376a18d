//! Wire-level edit operations and the text-snapshot query.
//!
//! Transport-agnostic on purpose: these are plain `serde` types carried as
//! JSON text frames over the edit WebSocket (`server::edit_ws`) instead of
//! a second binary framing.

use serde::{Deserialize, Serialize};

/// Sentinel encoding on the wire: `origin_left_site == ""` and
/// `origin_left_clock == 0` means "beginning of document".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Op {
    #[serde(rename = "INSERT")]
    Insert {
        site: String,
        clock: u32,
        /// Exactly one codepoint.
        content: String,
        origin_left_site: String,
        origin_left_clock: u32,
    },
    #[serde(rename = "DELETE")]
    Delete { target_site: String, target_clock: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpRequest {
    pub doc: String,
    #[serde(flatten)]
    pub op: Op,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpAck {
    pub ok: bool,
    pub message: String,
}

impl OpAck {
    pub fn ok() -> Self {
        OpAck {
            ok: true,
            message: String::new(),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        OpAck {
            ok: false,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateQuery {
    pub doc: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub content: String,
}

/// A single message on the edit WebSocket, tagged so client and server can
/// share one connection for both operation submission and state polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "message")]
pub enum EditMessage {
    #[serde(rename = "op")]
    Op(OpRequest),
    #[serde(rename = "ack")]
    Ack(OpAck),
    #[serde(rename = "query")]
    Query(StateQuery),
    #[serde(rename = "snapshot")]
    Snapshot(StateSnapshot),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_op_round_trips_through_json() {
        let op = Op::Insert {
            site: "A".into(),
            clock: 1,
            content: "x".into(),
            origin_left_site: String::new(),
            origin_left_clock: 0,
        };
        let json = serde_json::to_string(&op).unwrap();
        let back: Op = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, Op::Insert { clock: 1, .. }));
    }

    #[test]
    fn edit_message_tags_distinguish_variants() {
        let query = EditMessage::Query(StateQuery { doc: "d".into() });
        let json = serde_json::to_string(&query).unwrap();
        assert!(json.contains("\"message\":\"query\""));
    }
}
