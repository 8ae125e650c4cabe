//! End-to-end scenarios driven through the public engine API.

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use glytch_memory::history::{TREND_CALM, TREND_NO_DATA, TREND_STRESS};
use glytch_runtime::{Engine, EngineSettings, FeedbackSink, IngestionPipeline};
use glytch_types::{AppContext, EmotionLabel, GlytchError, IntentResult};
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Speak(String),
    Display(String),
    Log(String),
    Escalate(String),
}

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<Call>>>);

impl Recorder {
    fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }
}

impl FeedbackSink for Recorder {
    fn speak(&mut self, text: &str) {
        self.0.lock().unwrap().push(Call::Speak(text.to_string()));
    }
    fn display(&mut self, text: &str) {
        self.0.lock().unwrap().push(Call::Display(text.to_string()));
    }
    fn log(&mut self, text: &str) {
        self.0.lock().unwrap().push(Call::Log(text.to_string()));
    }
    fn escalate(&mut self, source: &str) {
        self.0.lock().unwrap().push(Call::Escalate(source.to_string()));
    }
}

fn pipeline() -> (IngestionPipeline, Recorder) {
    let recorder = Recorder::default();
    let pipeline = IngestionPipeline::new(
        Engine::new(EngineSettings::default()),
        Box::new(recorder.clone()),
    );
    (pipeline, recorder)
}

#[test]
fn question_answered_no() {
    let (mut pipeline, _) = pipeline();
    pipeline.engine().set_question("are you in pain?");
    match pipeline.process_line("GESTURE:NO") {
        Some(IntentResult::AnswerNo { log_text, .. }) => {
            assert_eq!(log_text, "Q: \"are you in pain?\" → NO");
        }
        other => panic!("expected AnswerNo, got {other:?}"),
    }
}

#[test]
fn medicine_accepted() {
    let (mut pipeline, _) = pipeline();
    pipeline.engine().set_medicine("Paracetamol 500mg");
    match pipeline.process_line("GESTURE:YES") {
        Some(IntentResult::AnswerYes { log_text, .. }) => assert_eq!(
            log_text,
            "Medicine accepted: Paracetamol 500mg (notify caregiver: give 1 tablet)"
        ),
        other => panic!("expected AnswerYes, got {other:?}"),
    }
    assert_eq!(
        pipeline.engine().current_context(),
        AppContext::Medicine {
            name: "Paracetamol 500mg".to_string()
        }
    );
}

#[tokio::test]
async fn mixed_stream_in_idle_context() {
    let (mut pipeline, recorder) = pipeline();
    let (_stop, shutdown) = watch::channel(false);
    let stream = Cursor::new(b"STATE:CALM\nGESTURE:FALL\nSTATE:garbage\nGESTURE:NO\n".to_vec());

    let outcome = pipeline.run(stream, shutdown).await;
    assert!(matches!(outcome, Err(GlytchError::ConnectionLost { .. })));

    let engine = pipeline.engine();
    let labels: Vec<EmotionLabel> = engine.emotion_history().iter().map(|s| s.label).collect();
    assert_eq!(labels, vec![EmotionLabel::Calm]);
    assert_eq!(engine.current_context(), AppContext::Idle);

    assert_eq!(
        recorder.calls(),
        vec![
            Call::Speak("Emergency. The user needs help.".to_string()),
            Call::Display("SOS SENT".to_string()),
            Call::Log("EMERGENCY from FALL".to_string()),
            Call::Escalate("FALL".to_string()),
            Call::Speak("No.".to_string()),
            Call::Display("NO".to_string()),
            Call::Log("Idle NO".to_string()),
        ]
    );

    let log = engine.event_log();
    assert_eq!(log.len(), 2);
    assert!(log[0].starts_with("FALL at "));
    assert!(log[1].starts_with("NO at "));
}

#[test]
fn trend_follows_counts() {
    let (mut pipeline, _) = pipeline();
    assert_eq!(pipeline.engine().summary().trend_text, TREND_NO_DATA);

    for _ in 0..5 {
        pipeline.process_line("STATE:CALM");
    }
    for _ in 0..3 {
        pipeline.process_line("STATE:STRESSED");
    }
    assert_eq!(pipeline.engine().summary().trend_text, TREND_CALM);

    let (mut pipeline, _) = self::pipeline();
    for _ in 0..2 {
        pipeline.process_line("STATE:calm");
    }
    for _ in 0..5 {
        pipeline.process_line("STATE:stressed");
    }
    let summary = pipeline.engine().summary();
    assert_eq!(summary.trend_text, TREND_STRESS);
    assert_eq!((summary.calm_count, summary.stress_count, summary.total), (2, 5, 7));
}

#[test]
fn thirty_five_samples_keep_the_last_thirty() {
    let (mut pipeline, _) = pipeline();
    let labels: Vec<EmotionLabel> = (0..35)
        .map(|i| if i % 2 == 0 { EmotionLabel::Calm } else { EmotionLabel::Stressed })
        .collect();
    for label in &labels {
        pipeline.process_line(&format!("STATE:{label}"));
    }
    let kept: Vec<EmotionLabel> = pipeline
        .engine()
        .emotion_history()
        .iter()
        .map(|s| s.label)
        .collect();
    assert_eq!(kept, labels[5..].to_vec());
}

#[test]
fn context_changes_from_another_thread_apply_to_later_gestures() {
    let (mut pipeline, _) = pipeline();
    let ui = pipeline.engine().clone();
    std::thread::spawn(move || ui.set_question("water?"))
        .join()
        .unwrap();
    match pipeline.process_line("GESTURE:YES") {
        Some(IntentResult::AnswerYes { spoken_text, .. }) => assert_eq!(spoken_text, "Yes, water?"),
        other => panic!("expected AnswerYes, got {other:?}"),
    }
}

#[test]
fn history_stays_bounded_with_a_larger_configured_capacity() {
    let mut pipeline = IngestionPipeline::new(
        Engine::new(EngineSettings {
            history_capacity: 100,
            ..Default::default()
        }),
        Box::new(Recorder::default()),
    );
    for _ in 0..35 {
        pipeline.process_line("STATE:CALM");
    }
    assert_eq!(pipeline.engine().emotion_history().len(), 30);
}

#[test]
fn fall_escalates_once_even_with_fall_detection_off() {
    let (mut pipeline, recorder) = pipeline();
    pipeline.engine().set_fall_detection(false);

    match pipeline.process_line("GESTURE:FALL") {
        Some(IntentResult::Emergency { source, display_text, .. }) => {
            assert_eq!(source, "FALL");
            assert_eq!(display_text, "SOS SENT");
        }
        other => panic!("expected Emergency, got {other:?}"),
    }
    let escalations: Vec<Call> = recorder
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::Escalate(_)))
        .collect();
    assert_eq!(escalations, vec![Call::Escalate("FALL".to_string())]);
}
