//! [`HistoryAggregator`] – emotion history, event log, and summary.
//!
//! * The emotion history keeps the [`EMOTION_HISTORY_CAPACITY`] most recent
//!   samples in a [`RingBuffer`], oldest evicted first.
//! * The event log is an unbounded, append-only list of caregiver-readable
//!   lines, newest last.
//!
//! Times in log lines are rendered in the local timezone (`HH:MM` for
//! gestures, `HH:MM:SS` for stress samples).
//!
//! Readers only ever receive owned snapshots; nothing here hands out a live
//! reference into the buffers.

use chrono::{DateTime, Local, Utc};
use glytch_types::{EmotionLabel, EmotionSample, GestureEvent, GestureType};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ring::RingBuffer;

/// Number of emotion samples retained.
pub const EMOTION_HISTORY_CAPACITY: usize = 30;

pub const TREND_NO_DATA: &str = "No data yet";
pub const TREND_CALM: &str = "Your recent pattern looks mostly calm.";
pub const TREND_STRESS: &str = "We noticed repeated stress spikes recently.";

/// `HH:MM` in local time.
pub fn clock_minutes(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%H:%M").to_string()
}

/// `HH:MM:SS` in local time.
pub fn clock_seconds(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%H:%M:%S").to_string()
}

/// Calm/stress counts over the current emotion history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub calm_count: usize,
    pub stress_count: usize,
    pub total: usize,
    pub trend_text: String,
}

impl Summary {
    fn from_counts(calm_count: usize, stress_count: usize) -> Self {
        let total = calm_count + stress_count;
        let trend_text = if total == 0 {
            TREND_NO_DATA
        } else if stress_count <= calm_count {
            TREND_CALM
        } else {
            TREND_STRESS
        };
        Self {
            calm_count,
            stress_count,
            total,
            trend_text: trend_text.to_string(),
        }
    }

    /// Share of calm samples in `0.0..=1.0`; `0.0` without data.
    pub fn calm_percent(&self) -> f32 {
        ratio(self.calm_count, self.total)
    }

    /// Share of stressed samples in `0.0..=1.0`; `0.0` without data.
    pub fn stress_percent(&self) -> f32 {
        ratio(self.stress_count, self.total)
    }
}

fn ratio(part: usize, total: usize) -> f32 {
    if total == 0 {
        0.0
    } else {
        part as f32 / total as f32
    }
}

#[derive(Debug, Clone)]
pub struct HistoryAggregator {
    emotions: RingBuffer<EmotionSample>,
    event_log: Vec<String>,
}

impl Default for HistoryAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryAggregator {
    pub fn new() -> Self {
        Self::with_capacity(EMOTION_HISTORY_CAPACITY)
    }

    /// Aggregator retaining `capacity` emotion samples instead of the default.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            emotions: RingBuffer::new(capacity),
            event_log: Vec::new(),
        }
    }

    /// Append `"{TYPE} at HH:MM"` (or `"Unknown gesture at HH:MM"`) to the log.
    pub fn record_gesture(&mut self, event: &GestureEvent) {
        let at = clock_minutes(event.timestamp);
        let line = match event.kind {
            GestureType::Unknown => format!("Unknown gesture at {at}"),
            kind => format!("{kind} at {at}"),
        };
        debug!(line = %line, "event log append");
        self.event_log.push(line);
    }

    /// Push `sample` into the bounded history; stress also lands in the log.
    pub fn record_emotion(&mut self, sample: EmotionSample) {
        if sample.label == EmotionLabel::Stressed {
            self.event_log
                .push(format!("Stress detected at {}", clock_seconds(sample.timestamp)));
        }
        if let Some(evicted) = self.emotions.push(sample) {
            debug!(evicted = %evicted.label, "emotion history full; oldest sample evicted");
        }
    }

    /// Append a free-form caregiver note as `"{text} at HH:MM"`.
    pub fn record_note(&mut self, text: &str, at: DateTime<Utc>) {
        self.event_log.push(format!("{text} at {}", clock_minutes(at)));
    }

    /// Emotion samples, oldest → newest.
    pub fn emotion_history(&self) -> Vec<EmotionSample> {
        self.emotions.to_vec()
    }

    /// Event log lines, oldest → newest.
    pub fn event_log(&self) -> Vec<String> {
        self.event_log.clone()
    }

    /// Label of the most recent emotion sample.
    pub fn current_emotion(&self) -> Option<EmotionLabel> {
        self.emotions.latest().map(|s| s.label)
    }

    pub fn summary(&self) -> Summary {
        let (calm, stress) = self
            .emotions
            .iter()
            .fold((0, 0), |(calm, stress), sample| match sample.label {
                EmotionLabel::Calm => (calm + 1, stress),
                EmotionLabel::Stressed => (calm, stress + 1),
            });
        Summary::from_counts(calm, stress)
    }
}
