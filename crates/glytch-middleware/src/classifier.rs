//! Telemetry line classifier.
//!
//! The wristband protocol is one ASCII instruction per line:
//!
//! | Line | Result |
//! |---|---|
//! | `GESTURE:YES` / `GESTURE:NO` / `GESTURE:HELP` / `GESTURE:FALL` | gesture of that type (prefix match on the remainder) |
//! | `EVENT:FALL` | FALL gesture |
//! | any other `GESTURE:` / `EVENT:` line | UNKNOWN gesture |
//! | `STATE:<text>` | CALM if `<text>` contains `calm` (any case), else STRESSED if it contains `stressed`, else discarded |
//! | anything else | discarded |
//!
//! Prefixes are case-sensitive.  Discarding is silent: the stream is noisy
//! and a malformed line must never raise an alarm.

use chrono::{DateTime, Utc};
use glytch_types::{EmotionLabel, EmotionSample, GestureEvent, GestureType};

const GESTURE_PREFIX: &str = "GESTURE:";
const EVENT_PREFIX: &str = "EVENT:";
const STATE_PREFIX: &str = "STATE:";

/// Outcome of classifying a single line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Gesture(GestureEvent),
    Emotion(EmotionSample),
    Discard,
}

/// Classify `line`, stamping any event with the current time.
pub fn classify(line: &str) -> Classification {
    classify_at(line, Utc::now())
}

/// Classify `line`, stamping any event with `now`.
pub fn classify_at(line: &str, now: DateTime<Utc>) -> Classification {
    let line = line.trim();

    if let Some(rest) = line.strip_prefix(GESTURE_PREFIX) {
        return Classification::Gesture(GestureEvent::at(gesture_kind(rest), line, now));
    }
    if let Some(rest) = line.strip_prefix(EVENT_PREFIX) {
        let kind = if rest.starts_with("FALL") {
            GestureType::Fall
        } else {
            GestureType::Unknown
        };
        return Classification::Gesture(GestureEvent::at(kind, line, now));
    }
    if let Some(rest) = line.strip_prefix(STATE_PREFIX) {
        return match emotion_label(rest) {
            Some(label) => Classification::Emotion(EmotionSample::at(label, now)),
            None => Classification::Discard,
        };
    }
    Classification::Discard
}

fn gesture_kind(rest: &str) -> GestureType {
    [
        GestureType::Yes,
        GestureType::No,
        GestureType::Help,
        GestureType::Fall,
    ]
    .into_iter()
    .find(|kind| rest.starts_with(kind.as_str()))
    .unwrap_or(GestureType::Unknown)
}

fn emotion_label(rest: &str) -> Option<EmotionLabel> {
    let upper = rest.to_ascii_uppercase();
    if upper.contains("CALM") {
        Some(EmotionLabel::Calm)
    } else if upper.contains("STRESSED") {
        Some(EmotionLabel::Stressed)
    } else {
        None
    }
}
