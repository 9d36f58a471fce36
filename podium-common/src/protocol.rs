//! Streaming wire protocol messages
//!
//! JSON messages exchanged over the per-session duplex connection.
//! Inbound messages are tagged `heartbeat`, `frame` or `audio`; outbound
//! messages are tagged `connected`, `ack`, `feedback` or `error`.

use crate::feedback::{MetricsExcerpt, ScoreSet, Suggestion, TrendDelta};
use serde::{Deserialize, Serialize};

fn default_sample_rate() -> u32 {
    16000
}

/// Client-to-server stream message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Liveness probe; answered with an `ack` carrying the same timestamp
    Heartbeat { timestamp_ms: i64 },

    /// One base64-encoded video frame
    Frame {
        timestamp_ms: i64,
        #[serde(default)]
        frame_number: Option<u64>,
        data: String,
    },

    /// One base64-encoded PCM audio chunk
    Audio {
        timestamp_ms: i64,
        #[serde(default = "default_sample_rate")]
        sample_rate: u32,
        data: String,
    },
}

impl ClientMessage {
    /// Client-supplied timestamp of this message
    pub fn timestamp_ms(&self) -> i64 {
        match self {
            ClientMessage::Heartbeat { timestamp_ms }
            | ClientMessage::Frame { timestamp_ms, .. }
            | ClientMessage::Audio { timestamp_ms, .. } => *timestamp_ms,
        }
    }
}

/// Server-to-client stream message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Sent once after the connection is registered
    Connected { session_id: String, message: String },

    /// Heartbeat reply, or frame acknowledgment when `status` is set
    /// (`"skipped"` marks a frame rejected by the sampling gate, so the
    /// client can distinguish load-shedding from failure)
    Ack {
        timestamp_ms: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<String>,
    },

    /// One feedback cycle result
    Feedback {
        timestamp_ms: i64,
        scores: ScoreSet,
        metrics: MetricsExcerpt,
        suggestions: Vec<Suggestion>,
        trends: TrendDelta,
    },

    /// Best-effort error report before the offending message is dropped
    /// or the connection is torn down
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heartbeat_round_trip() {
        let json = r#"{"type": "heartbeat", "timestamp_ms": 12345}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(msg, ClientMessage::Heartbeat { timestamp_ms: 12345 }));
    }

    #[test]
    fn test_audio_default_sample_rate() {
        let json = r#"{"type": "audio", "timestamp_ms": 1, "data": "AAAA"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::Audio { sample_rate, .. } => assert_eq!(sample_rate, 16000),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_type_rejected() {
        let json = r#"{"type": "telemetry", "timestamp_ms": 1}"#;
        assert!(serde_json::from_str::<ClientMessage>(json).is_err());
    }

    #[test]
    fn test_ack_omits_absent_status() {
        let ack = ServerMessage::Ack { timestamp_ms: 7, status: None };
        let json = serde_json::to_value(&ack).unwrap();
        assert_eq!(json["type"], "ack");
        assert!(json.get("status").is_none());

        let skipped = ServerMessage::Ack {
            timestamp_ms: 7,
            status: Some("skipped".into()),
        };
        let json = serde_json::to_value(&skipped).unwrap();
        assert_eq!(json["status"], "skipped");
    }
}
