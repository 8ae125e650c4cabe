//! [`Engine`] – the shared, cloneable handle onto engine state.
//!
//! The engine bundles the [`IntentResolver`], the [`HistoryAggregator`] and a
//! small status board.  UI-side callers get:
//!
//! * context setters, serialized with gesture handling by the resolver lock;
//! * read-only snapshots of context, history, log, summary and status.
//!
//! Writes to history and status are crate-private and happen only on the
//! ingestion consumer inside [`IngestionPipeline`][crate::pipeline::IngestionPipeline].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use glytch_memory::history::{EMOTION_HISTORY_CAPACITY, HistoryAggregator, Summary, clock_minutes};
use glytch_middleware::EventBus;
use glytch_types::{
    AppContext, ConnectionState, EmotionLabel, EmotionSample, GestureEvent, GestureType,
};

use crate::resolver::{IntentResolver, LocationProvider, StaticLocation};

/// Status line shown before the first gesture arrives.
pub const STATUS_WAITING: &str = "Waiting for wristband gesture...";

/// Tunables fixed at engine construction (the two detection toggles can also
/// be flipped later).
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Emotion samples retained in the history, capped at
    /// [`EMOTION_HISTORY_CAPACITY`] (30); larger values are clamped.
    pub history_capacity: usize,
    /// Stored and reported only; FALL always resolves to an emergency.
    pub fall_detection: bool,
    /// When off, `STATE:` lines are ignored entirely.
    pub emotion_detection: bool,
    /// Also append each dispatched log text to the event log.
    pub mirror_intent_log: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            history_capacity: EMOTION_HISTORY_CAPACITY,
            fall_detection: true,
            emotion_detection: true,
            mirror_intent_log: false,
        }
    }
}

/// Dashboard status snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub text: String,
    pub last_gesture: Option<GestureEvent>,
    pub current_emotion: Option<EmotionLabel>,
    pub connection: ConnectionState,
    pub context: AppContext,
}

#[derive(Debug, Clone)]
struct StatusBoard {
    text: String,
    last_gesture: Option<GestureEvent>,
    connection: ConnectionState,
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self {
            text: STATUS_WAITING.to_string(),
            last_gesture: None,
            connection: ConnectionState::Connecting,
        }
    }
}

/// Status line for a freshly received gesture.
pub fn gesture_status_line(kind: GestureType, at: DateTime<Utc>) -> String {
    let at = clock_minutes(at);
    match kind {
        GestureType::Yes => format!("Last gesture: YES at {at}"),
        GestureType::No => format!("Last gesture: NO at {at}"),
        GestureType::Fall => format!("FALL detected at {at}"),
        GestureType::Help => format!("HELP gesture at {at}"),
        GestureType::Unknown => format!("Unknown gesture at {at}"),
    }
}

struct Inner {
    resolver: IntentResolver,
    history: RwLock<HistoryAggregator>,
    status: RwLock<StatusBoard>,
    fall_detection: AtomicBool,
    emotion_detection: AtomicBool,
    mirror_intent_log: bool,
    bus: EventBus,
}

#[derive(Clone)]
pub struct Engine {
    inner: Arc<Inner>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineSettings::default())
    }
}

impl Engine {
    pub fn new(settings: EngineSettings) -> Self {
        Self::with_location(settings, Box::new(StaticLocation::default()))
    }

    pub fn with_location(settings: EngineSettings, location: Box<dyn LocationProvider>) -> Self {
        Self {
            inner: Arc::new(Inner {
                resolver: IntentResolver::with_location(location),
                history: RwLock::new(HistoryAggregator::with_capacity(
                    settings.history_capacity.min(EMOTION_HISTORY_CAPACITY),
                )),
                status: RwLock::new(StatusBoard::default()),
                fall_detection: AtomicBool::new(settings.fall_detection),
                emotion_detection: AtomicBool::new(settings.emotion_detection),
                mirror_intent_log: settings.mirror_intent_log,
                bus: EventBus::default(),
            }),
        }
    }

    // -------------------------------------------------------------------------
    // Context control
    // -------------------------------------------------------------------------

    pub fn set_question(&self, text: impl Into<String>) {
        self.inner.resolver.set_question(text);
    }

    pub fn set_medicine(&self, name: impl Into<String>) {
        self.inner.resolver.set_medicine(name);
    }

    pub fn set_idle(&self) {
        self.inner.resolver.set_idle();
    }

    pub fn current_context(&self) -> AppContext {
        self.inner.resolver.current_context()
    }

    // -------------------------------------------------------------------------
    // Settings toggles
    // -------------------------------------------------------------------------

    pub fn set_fall_detection(&self, enabled: bool) {
        self.inner.fall_detection.store(enabled, Ordering::SeqCst);
    }

    pub fn fall_detection_enabled(&self) -> bool {
        self.inner.fall_detection.load(Ordering::SeqCst)
    }

    pub fn set_emotion_detection(&self, enabled: bool) {
        self.inner.emotion_detection.store(enabled, Ordering::SeqCst);
    }

    pub fn emotion_detection_enabled(&self) -> bool {
        self.inner.emotion_detection.load(Ordering::SeqCst)
    }

    // -------------------------------------------------------------------------
    // Snapshots
    // -------------------------------------------------------------------------

    /// Emotion samples, oldest → newest.
    pub fn emotion_history(&self) -> Vec<EmotionSample> {
        self.read_history().emotion_history()
    }

    /// Event log lines, oldest → newest.
    pub fn event_log(&self) -> Vec<String> {
        self.read_history().event_log()
    }

    pub fn summary(&self) -> Summary {
        self.read_history().summary()
    }

    pub fn status(&self) -> Status {
        let board = self
            .inner
            .status
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        Status {
            text: board.text,
            last_gesture: board.last_gesture,
            current_emotion: self.read_history().current_emotion(),
            connection: board.connection,
            context: self.current_context(),
        }
    }

    /// Bus on which the pipeline publishes events, intents and alerts.
    pub fn bus(&self) -> EventBus {
        self.inner.bus.clone()
    }

    // -------------------------------------------------------------------------
    // Pipeline-side access
    // -------------------------------------------------------------------------

    pub(crate) fn resolver(&self) -> &IntentResolver {
        &self.inner.resolver
    }

    pub(crate) fn mirror_intent_log(&self) -> bool {
        self.inner.mirror_intent_log
    }

    pub(crate) fn write_history(&self) -> RwLockWriteGuard<'_, HistoryAggregator> {
        self.inner
            .history
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn note_gesture(&self, event: &GestureEvent) {
        let mut board = self.write_status();
        board.text = gesture_status_line(event.kind, event.timestamp);
        board.last_gesture = Some(event.clone());
    }

    pub(crate) fn set_connection(&self, state: ConnectionState) {
        self.write_status().connection = state;
    }

    fn read_history(&self) -> RwLockReadGuard<'_, HistoryAggregator> {
        self.inner
            .history
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_status(&self) -> RwLockWriteGuard<'_, StatusBoard> {
        self.inner
            .status
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
