//! [`IngestionPipeline`] – the single-consumer event pipeline.
//!
//! One session looks like this:
//!
//! ```text
//!  device bytes ──► reader task ──(bounded mpsc)──► consumer
//!                   LineFramer                      ├─ gesture: history log → resolver → dispatcher
//!                   classify                        └─ emotion: history
//! ```
//!
//! * The reader task is the only place that suspends on I/O.  Discarded
//!   lines never reach the queue.
//! * The consumer processes events strictly in arrival order, one at a time,
//!   so a context change can never leak into a gesture that was read earlier.
//! * Shutdown stops the reader; the consumer drains whatever is already
//!   queued before [`IngestionPipeline::run`] returns.
//! * There is no reconnection here: a lost connection ends the session with
//!   [`GlytchError::ConnectionLost`] and history is left untouched.  Callers
//!   that want to retry open a new connection and call `run` again.

use std::time::Duration;

use glytch_middleware::{Classification, LineFramer, Topic, classify};
use glytch_types::{
    ConnectionState, EmotionSample, Event, EventPayload, GestureEvent, GlytchError,
    IntentResult,
};
use tokio::io::AsyncRead;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, trace, warn};

use crate::dispatcher::{FeedbackSink, OutputDispatcher, log_line};
use crate::engine::Engine;

const SOURCE: &str = "glytch-runtime::pipeline";

/// Default depth of the reader → consumer queue.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub channel_capacity: usize,
    /// Per-read timeout; `None` waits forever.
    pub read_timeout: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            read_timeout: None,
        }
    }
}

pub struct IngestionPipeline {
    engine: Engine,
    dispatcher: OutputDispatcher,
    config: PipelineConfig,
}

impl IngestionPipeline {
    pub fn new(engine: Engine, sink: Box<dyn FeedbackSink>) -> Self {
        Self {
            engine,
            dispatcher: OutputDispatcher::new(sink),
            config: PipelineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Run one ingestion session over `reader` until the connection ends or
    /// `shutdown` flips to `true`.
    ///
    /// # Errors
    ///
    /// Returns [`GlytchError::ConnectionLost`] when the device stream fails,
    /// times out or reaches end-of-stream.  A requested shutdown returns
    /// `Ok(())`.
    pub async fn run<R>(
        &mut self,
        reader: R,
        shutdown: watch::Receiver<bool>,
    ) -> Result<(), GlytchError>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        self.set_connection(ConnectionState::Connected);
        info!("ingestion session started");

        let framer = LineFramer::new(reader).with_read_timeout(self.config.read_timeout);
        let (tx, mut rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let worker = tokio::spawn(read_lines(framer, tx, shutdown));

        while let Some(classified) = rx.recv().await {
            self.process(classified);
        }

        let outcome = match worker.await {
            Ok(outcome) => outcome,
            Err(e) => Err(GlytchError::connection_lost(format!("reader task failed: {e}"))),
        };

        match &outcome {
            Ok(()) => {
                info!("ingestion session stopped");
                self.set_connection(ConnectionState::Disconnected {
                    reason: "shutdown".to_string(),
                });
            }
            Err(e) => {
                warn!(error = %e, "ingestion session ended");
                let reason = match e {
                    GlytchError::ConnectionLost { reason } => reason.clone(),
                    other => other.to_string(),
                };
                self.set_connection(ConnectionState::Disconnected { reason });
            }
        }
        outcome
    }

    /// Classify and process one telemetry line on the calling task.
    pub fn process_line(&mut self, line: &str) -> Option<IntentResult> {
        self.process(classify(line))
    }

    /// Process one classified event.
    ///
    /// Returns the intent resolved for a gesture, or `None` for emotion
    /// samples and discarded lines.
    pub fn process(&mut self, classified: Classification) -> Option<IntentResult> {
        match classified {
            Classification::Gesture(event) => self.on_gesture(event),
            Classification::Emotion(sample) => {
                self.on_emotion(sample);
                None
            }
            Classification::Discard => None,
        }
    }

    fn on_gesture(&mut self, event: GestureEvent) -> Option<IntentResult> {
        debug!(gesture = %event.kind, raw = %event.raw_text, "gesture received");
        self.engine.write_history().record_gesture(&event);
        self.engine.note_gesture(&event);
        self.publish(Topic::Telemetry, EventPayload::Gesture(event.clone()));

        let result = self.engine.resolver().handle_gesture(&event);
        self.dispatcher.dispatch(&result);

        if self.engine.mirror_intent_log()
            && let Some(line) = log_line(&result)
        {
            self.engine.write_history().record_note(&line, event.timestamp);
        }

        if result != IntentResult::None {
            self.publish(Topic::Intents, EventPayload::Intent(result.clone()));
        }
        if result.is_emergency() {
            self.publish(Topic::SystemAlerts, EventPayload::Intent(result.clone()));
        }
        Some(result)
    }

    fn on_emotion(&mut self, sample: EmotionSample) {
        if !self.engine.emotion_detection_enabled() {
            trace!("emotion detection disabled; sample ignored");
            return;
        }
        debug!(label = %sample.label, "emotion sample received");
        self.engine.write_history().record_emotion(sample);
        self.publish(Topic::Telemetry, EventPayload::Emotion(sample));
    }

    fn set_connection(&self, state: ConnectionState) {
        self.engine.set_connection(state.clone());
        self.publish(Topic::SystemAlerts, EventPayload::Connection(state));
    }

    fn publish(&self, topic: Topic, payload: EventPayload) {
        if let Err(e) = self.engine.bus().publish_to(topic, Event::new(SOURCE, payload)) {
            warn!(error = %e, ?topic, "bus publish failed");
        }
    }
}

/// Reader task: frame, classify, and queue until the stream ends or shutdown.
async fn read_lines<R>(
    mut framer: LineFramer<R>,
    tx: mpsc::Sender<Classification>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), GlytchError>
where
    R: AsyncRead + Unpin,
{
    let mut watching = true;
    loop {
        if *shutdown.borrow() {
            return Ok(());
        }
        let line = tokio::select! {
            biased;
            changed = shutdown.changed(), if watching => {
                // A dropped sender can no longer signal; keep reading.
                if changed.is_err() {
                    watching = false;
                }
                continue;
            }
            line = framer.next_line() => line?,
        };

        let classified = classify(&line);
        if classified == Classification::Discard {
            trace!(line = %line, "line discarded");
            continue;
        }
        if tx.send(classified).await.is_err() {
            // Consumer gone.
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::testing::{Call, RecordingSink};
    use crate::engine::EngineSettings;
    use glytch_types::{AppContext, EmotionLabel};
    use std::io::Cursor;
    use tokio::io::AsyncWriteExt;

    fn pipeline(settings: EngineSettings) -> (IngestionPipeline, RecordingSink) {
        let sink = RecordingSink::default();
        let pipeline = IngestionPipeline::new(Engine::new(settings), Box::new(sink.clone()));
        (pipeline, sink)
    }

    #[test]
    fn gesture_is_logged_resolved_and_dispatched() {
        let (mut pipeline, sink) = pipeline(EngineSettings::default());
        let result = pipeline.process_line("GESTURE:YES");

        assert!(matches!(result, Some(IntentResult::AnswerYes { .. })));
        assert_eq!(sink.calls().len(), 3);
        let log = pipeline.engine().event_log();
        assert_eq!(log.len(), 1);
        assert!(log[0].starts_with("YES at "));
        assert!(pipeline.engine().status().text.starts_with("Last gesture: YES at "));
    }

    #[test]
    fn discarded_lines_leave_no_trace() {
        let (mut pipeline, sink) = pipeline(EngineSettings::default());
        assert!(pipeline.process_line("hello world").is_none());
        assert!(pipeline.process_line("STATE:unclear").is_none());
        assert!(sink.calls().is_empty());
        assert!(pipeline.engine().event_log().is_empty());
        assert!(pipeline.engine().emotion_history().is_empty());
    }

    #[test]
    fn unknown_gesture_is_logged_but_not_dispatched() {
        let (mut pipeline, sink) = pipeline(EngineSettings::default());
        assert_eq!(pipeline.process_line("GESTURE:WAVE"), Some(IntentResult::None));
        assert!(sink.calls().is_empty());
        assert!(pipeline.engine().event_log()[0].starts_with("Unknown gesture at "));
    }

    #[test]
    fn fall_escalates_with_fall_detection_switched_off() {
        let (mut pipeline, sink) = pipeline(EngineSettings {
            fall_detection: false,
            ..Default::default()
        });
        assert!(matches!(
            pipeline.process_line("EVENT:FALL"),
            Some(IntentResult::Emergency { ref source, .. }) if source == "FALL"
        ));

        pipeline.engine().set_fall_detection(false);
        pipeline.process_line("GESTURE:FALL");
        assert_eq!(sink.escalations(), vec!["FALL".to_string(), "FALL".to_string()]);
        assert!(pipeline.engine().event_log()[0].starts_with("FALL at "));
        assert!(!pipeline.engine().fall_detection_enabled());
    }

    #[test]
    fn oversized_history_capacity_is_clamped() {
        let (mut pipeline, _sink) = pipeline(EngineSettings {
            history_capacity: 100,
            ..Default::default()
        });
        for _ in 0..35 {
            pipeline.process_line("STATE:CALM");
        }
        assert_eq!(pipeline.engine().emotion_history().len(), 30);
    }

    #[test]
    fn disabled_emotion_detection_ignores_state_lines() {
        let (mut pipeline, _sink) = pipeline(EngineSettings::default());
        pipeline.engine().set_emotion_detection(false);
        pipeline.process_line("STATE:STRESSED");
        assert!(pipeline.engine().emotion_history().is_empty());
        assert!(pipeline.engine().event_log().is_empty());

        pipeline.engine().set_emotion_detection(true);
        pipeline.process_line("STATE:STRESSED");
        assert_eq!(pipeline.engine().emotion_history().len(), 1);
        assert_eq!(
            pipeline.engine().status().current_emotion,
            Some(EmotionLabel::Stressed)
        );
    }

    #[test]
    fn mirrored_log_follows_gesture_line() {
        let (mut pipeline, _sink) = pipeline(EngineSettings {
            mirror_intent_log: true,
            ..Default::default()
        });
        pipeline.engine().set_question("are you in pain?");
        pipeline.process_line("GESTURE:NO");
        pipeline.process_line("GESTURE:FALL");

        let log = pipeline.engine().event_log();
        assert_eq!(log.len(), 4);
        assert!(log[0].starts_with("NO at "));
        assert!(log[1].starts_with("Q: \"are you in pain?\" → NO at "));
        assert!(log[2].starts_with("FALL at "));
        assert!(log[3].starts_with("EMERGENCY from FALL at "));
    }

    #[tokio::test]
    async fn intents_and_alerts_are_published() {
        let (mut pipeline, _sink) = pipeline(EngineSettings::default());
        let bus = pipeline.engine().bus();
        let mut intents = bus.subscribe_to(Topic::Intents);
        let mut alerts = bus.subscribe_to(Topic::SystemAlerts);

        pipeline.process_line("GESTURE:HELP");

        let intent = intents.recv().await.unwrap();
        assert!(matches!(intent.payload, EventPayload::Intent(IntentResult::Emergency { .. })));
        let alert = alerts.recv().await.unwrap();
        assert_eq!(alert.source, SOURCE);
    }

    #[tokio::test]
    async fn run_processes_stream_then_reports_connection_lost() {
        let (mut pipeline, sink) = pipeline(EngineSettings::default());
        let (_stop, shutdown) = watch::channel(false);
        let stream = Cursor::new(b"STATE:CALM\nGESTURE:YES\n".to_vec());

        let outcome = pipeline.run(stream, shutdown).await;

        assert!(matches!(outcome, Err(GlytchError::ConnectionLost { .. })));
        assert_eq!(pipeline.engine().emotion_history().len(), 1);
        assert_eq!(sink.calls()[0], Call::Speak("Yes, I need attention.".to_string()));
        assert!(matches!(
            pipeline.engine().status().connection,
            ConnectionState::Disconnected { .. }
        ));
    }

    #[tokio::test]
    async fn shutdown_ends_session_cleanly_and_keeps_history() {
        let (mut pipeline, _sink) = pipeline(EngineSettings::default());
        let (stop, shutdown) = watch::channel(false);
        let (mut device, phone) = tokio::io::duplex(256);

        device.write_all(b"STATE:STRESSED\n").await.unwrap();
        let engine = pipeline.engine().clone();
        let session = tokio::spawn(async move {
            let outcome = pipeline.run(phone, shutdown).await;
            (pipeline, outcome)
        });

        // Wait until the sample has been consumed.
        for _ in 0..100 {
            if !engine.emotion_history().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        stop.send(true).unwrap();

        let (_pipeline, outcome) = session.await.unwrap();
        assert_eq!(outcome, Ok(()));
        assert_eq!(engine.emotion_history().len(), 1);
        assert_eq!(
            engine.status().connection,
            ConnectionState::Disconnected {
                reason: "shutdown".to_string()
            }
        );
    }

    #[tokio::test]
    async fn context_set_between_sessions_applies_to_next_gesture() {
        let (mut pipeline, sink) = pipeline(EngineSettings::default());
        let (_stop, shutdown) = watch::channel(false);
        pipeline
            .run(Cursor::new(b"GESTURE:NO\n".to_vec()), shutdown.clone())
            .await
            .unwrap_err();

        pipeline.engine().set_medicine("Paracetamol 500mg");
        pipeline
            .run(Cursor::new(b"GESTURE:YES\n".to_vec()), shutdown)
            .await
            .unwrap_err();

        let calls = sink.calls();
        assert_eq!(calls[0], Call::Speak("No.".to_string()));
        assert_eq!(calls[3], Call::Speak("Medicine accepted: Paracetamol 500mg".to_string()));
        assert_eq!(
            pipeline.engine().current_context(),
            AppContext::Medicine {
                name: "Paracetamol 500mg".to_string()
            }
        );
    }
}
