//! Terminal stand-ins for the phone's speech, glasses and SOS collaborators.

use colored::Colorize;
use glytch_runtime::FeedbackSink;
use glytch_types::{ConnectionState, Event, EventPayload, IntentResult};
use tracing::info;

use crate::config::Language;

pub struct ConsoleSink {
    language: Language,
}

impl ConsoleSink {
    pub fn new(language: Language) -> Self {
        Self { language }
    }
}

impl FeedbackSink for ConsoleSink {
    fn speak(&mut self, text: &str) {
        println!("  {} {}", format!("🔊 [{}]", self.language).cyan(), text);
    }

    fn display(&mut self, text: &str) {
        println!("  {} {}", "👓".bold(), text.bold());
    }

    fn log(&mut self, text: &str) {
        info!(target: "glytch::caregiver", entry = %text, "caregiver log");
    }

    fn escalate(&mut self, source: &str) {
        for line in sos_panel(source) {
            println!("{}", line.red().bold());
        }
    }
}

pub fn sos_panel(source: &str) -> Vec<String> {
    let title = format!("SOS – triggered by {source}");
    let width = title.chars().count() + 4;
    vec![
        format!("  ╔{}╗", "═".repeat(width)),
        format!("  ║  {title}  ║"),
        format!("  ╚{}╝", "═".repeat(width)),
    ]
}

/// One-line console notice for a `SystemAlerts` event.
pub fn alert_line(event: &Event) -> Option<String> {
    match &event.payload {
        EventPayload::Connection(ConnectionState::Connected) => {
            Some(format!("{}", "● wristband connected".green()))
        }
        EventPayload::Connection(ConnectionState::Disconnected { reason }) => Some(format!(
            "{} {}",
            "○ wristband disconnected:".yellow(),
            reason
        )),
        EventPayload::Intent(IntentResult::Emergency { sms_text, .. }) => Some(format!(
            "{} {}",
            "✉ SMS to caregiver:".red().bold(),
            sms_text
        )),
        _ => None,
    }
}
