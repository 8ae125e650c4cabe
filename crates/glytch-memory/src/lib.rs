//! `glytch-memory` – the caregiver history.
//!
//! Everything here is in-memory only and is lost when the process exits.
//!
//! # Modules
//!
//! - [`ring`] – [`RingBuffer`][ring::RingBuffer]: a fixed-capacity FIFO that
//!   overwrites its oldest slot instead of growing.
//! - [`history`] – [`HistoryAggregator`][history::HistoryAggregator]: the
//!   bounded emotion history, the append-only event log, and the calm/stress
//!   [`Summary`][history::Summary] shown on the dashboard.

pub mod history;
pub mod ring;

pub use history::{EMOTION_HISTORY_CAPACITY, HistoryAggregator, Summary};
pub use ring::RingBuffer;
