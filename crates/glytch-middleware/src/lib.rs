//! `glytch-middleware` – from raw device bytes to typed events.
//!
//! # Modules
//!
//! - [`framer`] – [`LineFramer`]: turns an unbounded byte connection into an
//!   ordered sequence of trimmed text lines.
//! - [`classifier`] – [`classify`]: maps one telemetry line to a
//!   [`GestureEvent`][glytch_types::GestureEvent], an
//!   [`EmotionSample`][glytch_types::EmotionSample], or a silent discard.
//! - [`bus`] – topic-based publish/subscribe event bus built on Tokio
//!   broadcast channels, used by dashboards to observe the pipeline.

pub mod bus;
pub mod classifier;
pub mod framer;

pub use bus::{EventBus, Topic, TopicReceiver};
pub use classifier::{Classification, classify, classify_at};
pub use framer::LineFramer;
