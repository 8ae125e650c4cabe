//! [`IntentResolver`] – the conversational context state machine.
//!
//! The resolver owns the single [`AppContext`] cell.  Context changes only
//! through [`set_question`](IntentResolver::set_question),
//! [`set_medicine`](IntentResolver::set_medicine) and
//! [`set_idle`](IntentResolver::set_idle); [`handle_gesture`](IntentResolver::handle_gesture)
//! reads it but never writes it.  Setters and gesture handling serialize on
//! the same lock, so a context change from a UI task can never interleave
//! with a resolution in flight on the ingestion task.
//!
//! | type | Idle | Question(q) | Medicine(m) |
//! |---|---|---|---|
//! | YES | `AnswerYes` "Yes, I need attention." | `AnswerYes` "Yes, {q}" | `AnswerYes` "Medicine accepted: {m}" |
//! | NO | `AnswerNo` "No." | `AnswerNo` "No, I am okay." | `AnswerNo` "Medicine declined or postponed." |
//! | HELP | `Emergency` source "HELP Gesture" | same | same |
//! | FALL | `Emergency` source "FALL" | same | same |
//! | UNKNOWN | `None` | `None` | `None` |
//!
//! Answering never returns the context to `Idle`; it stays until a
//! collaborator changes it.

use std::sync::{Mutex, MutexGuard, PoisonError};

use glytch_types::{AppContext, GestureEvent, GestureType, IntentResult};
use tracing::{debug, info};

pub const EMERGENCY_SPOKEN: &str = "Emergency. The user needs help.";
pub const EMERGENCY_DISPLAY: &str = "SOS SENT";
pub const HELP_SOURCE: &str = "HELP Gesture";
pub const FALL_SOURCE: &str = "FALL";

/// Placeholder coordinates used until a real location source is wired in.
pub const PLACEHOLDER_LOCATION: &str = "[x,y]";

/// Supplies the location text embedded in the emergency SMS body.
pub trait LocationProvider: Send + Sync {
    fn location(&self) -> String;
}

/// A fixed location string.
#[derive(Debug, Clone)]
pub struct StaticLocation(pub String);

impl Default for StaticLocation {
    fn default() -> Self {
        Self(PLACEHOLDER_LOCATION.to_string())
    }
}

impl LocationProvider for StaticLocation {
    fn location(&self) -> String {
        self.0.clone()
    }
}

/// SMS body sent to emergency contacts.
pub fn emergency_sms(location: &str) -> String {
    format!("Patient requesting urgent help at location: {location}")
}

pub struct IntentResolver {
    context: Mutex<AppContext>,
    location: Box<dyn LocationProvider>,
}

impl Default for IntentResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl IntentResolver {
    /// Resolver starting in [`AppContext::Idle`] with the placeholder location.
    pub fn new() -> Self {
        Self::with_location(Box::new(StaticLocation::default()))
    }

    pub fn with_location(location: Box<dyn LocationProvider>) -> Self {
        Self {
            context: Mutex::new(AppContext::Idle),
            location,
        }
    }

    pub fn set_question(&self, text: impl Into<String>) {
        self.replace(AppContext::Question { text: text.into() });
    }

    pub fn set_medicine(&self, name: impl Into<String>) {
        self.replace(AppContext::Medicine { name: name.into() });
    }

    pub fn set_idle(&self) {
        self.replace(AppContext::Idle);
    }

    /// Snapshot of the active context.
    pub fn current_context(&self) -> AppContext {
        self.lock().clone()
    }

    /// Interpret `event` against the current context.
    pub fn handle_gesture(&self, event: &GestureEvent) -> IntentResult {
        let guard = self.lock();
        let context: &AppContext = &guard;
        let result = resolve(context, event.kind, &self.location.location());
        debug!(gesture = %event.kind, context = %context, "gesture resolved");
        result
    }

    fn replace(&self, next: AppContext) {
        let mut context = self.lock();
        let previous: &AppContext = &context;
        info!(from = %previous, to = %next, "context changed");
        *context = next;
    }

    fn lock(&self) -> MutexGuard<'_, AppContext> {
        self.context.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The dispatch table: a pure function of context, gesture type and location.
pub fn resolve(context: &AppContext, kind: GestureType, location: &str) -> IntentResult {
    match kind {
        GestureType::Yes => answer_yes(context),
        GestureType::No => answer_no(context),
        GestureType::Help => emergency(HELP_SOURCE, location),
        GestureType::Fall => emergency(FALL_SOURCE, location),
        GestureType::Unknown => IntentResult::None,
    }
}

fn answer_yes(context: &AppContext) -> IntentResult {
    let (spoken, log, display) = match context {
        AppContext::Idle => (
            "Yes, I need attention.".to_string(),
            "Idle YES → user needs attention".to_string(),
            "YES – needs attention".to_string(),
        ),
        AppContext::Question { text } => (
            format!("Yes, {text}"),
            format!("Q: \"{text}\" → YES"),
            "YES".to_string(),
        ),
        AppContext::Medicine { name } => (
            format!("Medicine accepted: {name}"),
            format!("Medicine accepted: {name} (notify caregiver: give 1 tablet)"),
            "Medicine accepted".to_string(),
        ),
    };
    IntentResult::AnswerYes {
        spoken_text: spoken,
        log_text: log,
        display_text: display,
    }
}

fn answer_no(context: &AppContext) -> IntentResult {
    let (spoken, log, display) = match context {
        AppContext::Idle => ("No.".to_string(), "Idle NO".to_string(), "NO".to_string()),
        AppContext::Question { text } => (
            "No, I am okay.".to_string(),
            format!("Q: \"{text}\" → NO"),
            "NO".to_string(),
        ),
        AppContext::Medicine { name } => (
            "Medicine declined or postponed.".to_string(),
            format!("Medicine declined/postponed: {name}"),
            "Medicine postponed".to_string(),
        ),
    };
    IntentResult::AnswerNo {
        spoken_text: spoken,
        log_text: log,
        display_text: display,
    }
}

fn emergency(source: &str, location: &str) -> IntentResult {
    IntentResult::Emergency {
        spoken_text: EMERGENCY_SPOKEN.to_string(),
        sms_text: emergency_sms(location),
        display_text: EMERGENCY_DISPLAY.to_string(),
        source: source.to_string(),
    }
}
