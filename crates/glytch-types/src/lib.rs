use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// The closed five-symbol gesture vocabulary reported by the wristband.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GestureType {
    Yes,
    No,
    Help,
    Fall,
    Unknown,
}

impl GestureType {
    /// Upper-case wire spelling, e.g. `"YES"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            GestureType::Yes => "YES",
            GestureType::No => "NO",
            GestureType::Help => "HELP",
            GestureType::Fall => "FALL",
            GestureType::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for GestureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A gesture reported by the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GestureEvent {
    pub kind: GestureType,
    /// The trimmed telemetry line this event was classified from.
    pub raw_text: String,
    pub timestamp: DateTime<Utc>,
}

impl GestureEvent {
    /// Build an event stamped with the current time.
    pub fn new(kind: GestureType, raw_text: impl Into<String>) -> Self {
        Self::at(kind, raw_text, Utc::now())
    }

    pub fn at(kind: GestureType, raw_text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind,
            raw_text: raw_text.into(),
            timestamp,
        }
    }
}

/// Coarse physiological state reported on `STATE:` lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EmotionLabel {
    Calm,
    Stressed,
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmotionLabel::Calm => f.write_str("CALM"),
            EmotionLabel::Stressed => f.write_str("STRESSED"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmotionSample {
    pub label: EmotionLabel,
    pub timestamp: DateTime<Utc>,
}

impl EmotionSample {
    pub fn new(label: EmotionLabel) -> Self {
        Self::at(label, Utc::now())
    }

    pub fn at(label: EmotionLabel, timestamp: DateTime<Utc>) -> Self {
        Self { label, timestamp }
    }
}

/// The conversational frame a gesture is interpreted against.
///
/// Only explicit setter calls on the resolver move between variants; handling
/// a gesture never does.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "context", content = "payload")]
pub enum AppContext {
    #[default]
    Idle,
    /// A pending yes/no question, e.g. `"are you in pain?"`.
    Question { text: String },
    /// A pending medicine confirmation, e.g. `"Paracetamol 500mg"`.
    Medicine { name: String },
}

impl fmt::Display for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppContext::Idle => f.write_str("Idle"),
            AppContext::Question { text } => write!(f, "Asking: \"{text}\""),
            AppContext::Medicine { name } => write!(f, "Medicine: {name}"),
        }
    }
}

/// Resolved user-facing outcome of one gesture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", content = "payload")]
pub enum IntentResult {
    None,
    AnswerYes {
        spoken_text: String,
        log_text: String,
        display_text: String,
    },
    AnswerNo {
        spoken_text: String,
        log_text: String,
        display_text: String,
    },
    Emergency {
        spoken_text: String,
        sms_text: String,
        display_text: String,
        /// What raised the emergency: `"HELP Gesture"` or `"FALL"`.
        source: String,
    },
}

impl IntentResult {
    pub fn is_emergency(&self) -> bool {
        matches!(self, IntentResult::Emergency { .. })
    }
}

/// Link state of the device connection as seen by the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    #[default]
    Connecting,
    Connected,
    Disconnected { reason: String },
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Connecting => f.write_str("connecting"),
            ConnectionState::Connected => f.write_str("connected"),
            ConnectionState::Disconnected { reason } => write!(f, "disconnected ({reason})"),
        }
    }
}

/// Envelope routed over the internal event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g. `"glytch-runtime::pipeline"`
    pub source: String,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(source: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    Gesture(GestureEvent),
    Emotion(EmotionSample),
    Intent(IntentResult),
    Connection(ConnectionState),
}

/// Workspace error type.
///
/// Classification and intent resolution are total and never produce one of
/// these; the ingestion connection is the only failure path of a session.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GlytchError {
    #[error("Connection lost: {reason}")]
    ConnectionLost { reason: String },

    #[error("Could not connect to {target}: {reason}")]
    Connect { target: String, reason: String },

    #[error("Event bus error: {0}")]
    Channel(String),
}

impl GlytchError {
    pub fn connection_lost(reason: impl Into<String>) -> Self {
        GlytchError::ConnectionLost {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gesture_type_wire_spelling() {
        assert_eq!(GestureType::Yes.to_string(), "YES");
        assert_eq!(GestureType::Help.as_str(), "HELP");
        let json = serde_json::to_string(&GestureType::Fall).unwrap();
        assert_eq!(json, "\"FALL\"");
    }

    #[test]
    fn app_context_defaults_to_idle() {
        assert_eq!(AppContext::default(), AppContext::Idle);
    }

    #[test]
    fn app_context_display() {
        let q = AppContext::Question {
            text: "are you in pain?".to_string(),
        };
        assert_eq!(q.to_string(), "Asking: \"are you in pain?\"");
        let m = AppContext::Medicine {
            name: "Paracetamol 500mg".to_string(),
        };
        assert_eq!(m.to_string(), "Medicine: Paracetamol 500mg");
    }

    #[test]
    fn intent_result_is_tagged_in_json() {
        let result = IntentResult::Emergency {
            spoken_text: "Emergency. The user needs help.".to_string(),
            sms_text: "sms".to_string(),
            display_text: "SOS SENT".to_string(),
            source: "FALL".to_string(),
        };
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"intent\":\"Emergency\""));
        let back: IntentResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
        assert!(back.is_emergency());
    }

    #[test]
    fn event_envelope_carries_payload() {
        let event = Event::new(
            "glytch-middleware::classifier",
            EventPayload::Emotion(EmotionSample::new(EmotionLabel::Calm)),
        );
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, event.id);
        assert!(matches!(
            back.payload,
            EventPayload::Emotion(EmotionSample {
                label: EmotionLabel::Calm,
                ..
            })
        ));
    }

    #[test]
    fn glytch_error_display() {
        let err = GlytchError::connection_lost("end of stream");
        assert_eq!(err.to_string(), "Connection lost: end of stream");

        let err = GlytchError::Connect {
            target: "tcp://127.0.0.1:7777".to_string(),
            reason: "refused".to_string(),
        };
        assert!(err.to_string().contains("127.0.0.1:7777"));
    }
}
