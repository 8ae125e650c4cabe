//! [`OutputDispatcher`] – ordered fan-out of an [`IntentResult`].
//!
//! The dispatcher never talks to speech engines, displays or the SOS flow
//! directly; it drives an injected [`FeedbackSink`] in a fixed order:
//!
//! | Result | Calls |
//! |---|---|
//! | `AnswerYes` / `AnswerNo` | `speak` → `display` → `log` |
//! | `Emergency` | `speak` → `display` → `log("EMERGENCY from {source}")` → `escalate(source)` |
//! | `None` | nothing |

use glytch_types::IntentResult;
use tracing::{info, warn};

/// The collaborators an intent is delivered to.
pub trait FeedbackSink: Send {
    /// Say `text` aloud.
    fn speak(&mut self, text: &str);

    /// Show `text` on the glasses / visual surface.
    fn display(&mut self, text: &str);

    /// Append `text` to the caller-visible activity log.
    fn log(&mut self, text: &str);

    /// Hand control to the emergency flow.
    fn escalate(&mut self, source: &str);
}

/// Text passed to [`FeedbackSink::log`] for `result`, if any.
pub fn log_line(result: &IntentResult) -> Option<String> {
    match result {
        IntentResult::None => None,
        IntentResult::AnswerYes { log_text, .. } | IntentResult::AnswerNo { log_text, .. } => {
            Some(log_text.clone())
        }
        IntentResult::Emergency { source, .. } => Some(format!("EMERGENCY from {source}")),
    }
}

pub struct OutputDispatcher {
    sink: Box<dyn FeedbackSink>,
}

impl OutputDispatcher {
    pub fn new(sink: Box<dyn FeedbackSink>) -> Self {
        Self { sink }
    }

    /// Deliver `result` synchronously.  Each `Emergency` escalates exactly once.
    pub fn dispatch(&mut self, result: &IntentResult) {
        match result {
            IntentResult::None => {}
            IntentResult::AnswerYes {
                spoken_text,
                log_text,
                display_text,
            }
            | IntentResult::AnswerNo {
                spoken_text,
                log_text,
                display_text,
            } => {
                info!(log = %log_text, "answer dispatched");
                self.sink.speak(spoken_text);
                self.sink.display(display_text);
                self.sink.log(log_text);
            }
            IntentResult::Emergency {
                spoken_text,
                display_text,
                source,
                ..
            } => {
                warn!(source = %source, "emergency escalated");
                self.sink.speak(spoken_text);
                self.sink.display(display_text);
                self.sink.log(&format!("EMERGENCY from {source}"));
                self.sink.escalate(source);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::FeedbackSink;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        Speak(String),
        Display(String),
        Log(String),
        Escalate(String),
    }

    /// Sink that records every call; clones share the same record.
    #[derive(Clone, Default)]
    pub struct RecordingSink {
        pub calls: Arc<Mutex<Vec<Call>>>,
    }

    impl RecordingSink {
        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        pub fn escalations(&self) -> Vec<String> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    Call::Escalate(source) => Some(source),
                    _ => None,
                })
                .collect()
        }
    }

    impl FeedbackSink for RecordingSink {
        fn speak(&mut self, text: &str) {
            self.calls.lock().unwrap().push(Call::Speak(text.to_string()));
        }
        fn display(&mut self, text: &str) {
            self.calls.lock().unwrap().push(Call::Display(text.to_string()));
        }
        fn log(&mut self, text: &str) {
            self.calls.lock().unwrap().push(Call::Log(text.to_string()));
        }
        fn escalate(&mut self, source: &str) {
            self.calls.lock().unwrap().push(Call::Escalate(source.to_string()));
        }
    }
}
