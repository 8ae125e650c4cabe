//! `glytch-runtime` – the intent engine.
//!
//! Wires the framed, classified device stream into conversational intents
//! and caregiver history.
//!
//! # Modules
//!
//! - [`resolver`] – [`IntentResolver`]: the context state machine.  Given a
//!   gesture and the current [`AppContext`][glytch_types::AppContext] it
//!   produces exactly one [`IntentResult`][glytch_types::IntentResult]; only
//!   explicit setter calls change the context.
//! - [`dispatcher`] – [`OutputDispatcher`]: ordered fan-out of an intent to an
//!   injected [`FeedbackSink`] (speech, display, log, escalation).
//! - [`engine`] – [`Engine`]: cloneable handle combining resolver, history and
//!   status, with snapshot readers for dashboards.
//! - [`pipeline`] – [`IngestionPipeline`]: one reader task feeding a bounded
//!   queue drained by a single in-order consumer.
//! - [`telemetry`] – [`init_tracing`]: global `tracing` subscriber with
//!   optional OTLP span export.

pub mod dispatcher;
pub mod engine;
pub mod pipeline;
pub mod resolver;
pub mod telemetry;

pub use dispatcher::{FeedbackSink, OutputDispatcher};
pub use engine::{Engine, EngineSettings, Status};
pub use pipeline::{IngestionPipeline, PipelineConfig};
pub use resolver::{IntentResolver, LocationProvider, StaticLocation};
pub use telemetry::{TelemetryGuard, init_tracing};
