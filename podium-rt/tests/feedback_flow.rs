//! End-to-end engine tests with fake analyzer collaborators
//!
//! Drives session lifecycle, ingestion, fusion, trend and summary
//! through the public FeedbackEngine surface.

use async_trait::async_trait;
use podium_common::metrics::{
    AudioMetrics, Baseline, BodyMetrics, FacialMetrics, HeadPose, Posture, SpeechMetrics,
    ToneMetrics, VisionMetrics,
};
use podium_common::{Error, Result};
use podium_rt::analyzers::{AudioAnalyzer, VisionAnalyzer};
use podium_rt::baseline::{BaselineStore, NoBaselineStore};
use podium_rt::bus::{FeedbackBus, MemoryBus};
use podium_rt::config::Config;
use podium_rt::engine::FeedbackEngine;
use podium_rt::session::SessionType;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Fake collaborators
// ============================================================================

/// Audio analyzer returning a fixed snapshot
struct FixedAudioAnalyzer(AudioMetrics);

#[async_trait]
impl AudioAnalyzer for FixedAudioAnalyzer {
    async fn analyze(&self, _pcm: &[u8], timestamp_ms: i64, _rate: u32) -> Result<AudioMetrics> {
        Ok(AudioMetrics { timestamp_ms, ..self.0.clone() })
    }
}

/// Vision analyzer returning a fixed snapshot
struct FixedVisionAnalyzer(VisionMetrics);

#[async_trait]
impl VisionAnalyzer for FixedVisionAnalyzer {
    async fn analyze(&self, _frame: &[u8], n: u64, timestamp_ms: i64) -> Result<VisionMetrics> {
        Ok(VisionMetrics { timestamp_ms, frame_number: Some(n), ..self.0.clone() })
    }
}

struct FailingVisionAnalyzer;

#[async_trait]
impl VisionAnalyzer for FailingVisionAnalyzer {
    async fn analyze(&self, _frame: &[u8], _n: u64, _ts: i64) -> Result<VisionMetrics> {
        Err(Error::Analyzer("pose model crashed".to_string()))
    }
}

/// Audio analyzer that never returns within a test timeout
struct SlowAudioAnalyzer;

#[async_trait]
impl AudioAnalyzer for SlowAudioAnalyzer {
    async fn analyze(&self, _pcm: &[u8], _ts: i64, _rate: u32) -> Result<AudioMetrics> {
        tokio::time::sleep(Duration::from_millis(200)).await;
        Ok(AudioMetrics::default())
    }
}

struct FailingBaselineStore;

#[async_trait]
impl BaselineStore for FailingBaselineStore {
    async fn fetch(&self, _user_id: &str) -> Result<Option<Baseline>> {
        Err(Error::Analyzer("baseline db unreachable".to_string()))
    }
}

fn speech_only_audio(speaking_rate: f64) -> AudioMetrics {
    AudioMetrics {
        speech: Some(SpeechMetrics {
            transcript: None,
            speaking_rate,
            articulation_score: 70.0,
            filler_words: Vec::new(),
            pause_count: 0,
        }),
        ..Default::default()
    }
}

fn engine_with(
    config: &Config,
    audio: Arc<dyn AudioAnalyzer>,
    vision: Arc<dyn VisionAnalyzer>,
    bus: Arc<dyn FeedbackBus>,
) -> FeedbackEngine {
    FeedbackEngine::new(config, audio, vision, Arc::new(NoBaselineStore), bus)
}

fn default_engine() -> FeedbackEngine {
    engine_with(
        &Config::default(),
        Arc::new(FixedAudioAnalyzer(AudioMetrics::default())),
        Arc::new(FixedVisionAnalyzer(VisionMetrics::default())),
        Arc::new(MemoryBus::default()),
    )
}

// ============================================================================
// Session lifecycle
// ============================================================================

#[tokio::test]
async fn test_start_generates_session_id() {
    let engine = default_engine();
    let session = engine
        .start_session(None, "u1", SessionType::Practice)
        .await
        .unwrap();
    assert!(!session.session_id.is_empty());
    assert_eq!(engine.active_sessions(), 1);
}

#[tokio::test]
async fn test_duplicate_start_rejected() {
    let engine = default_engine();
    engine
        .start_session(Some("s1".into()), "u1", SessionType::Practice)
        .await
        .unwrap();
    let err = engine
        .start_session(Some("s1".into()), "u1", SessionType::Practice)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AlreadyExists(_)));
}

#[tokio::test]
async fn test_stop_unknown_session_is_not_found() {
    let engine = default_engine();
    assert!(matches!(
        engine.stop_session("never-started").await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_stop_removes_session() {
    let engine = default_engine();
    engine
        .start_session(Some("s1".into()), "u1", SessionType::Practice)
        .await
        .unwrap();
    engine.stop_session("s1").await.unwrap();
    assert!(matches!(engine.session("s1"), Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_baseline_failure_does_not_block_start() {
    let engine = FeedbackEngine::new(
        &Config::default(),
        Arc::new(FixedAudioAnalyzer(AudioMetrics::default())),
        Arc::new(FixedVisionAnalyzer(VisionMetrics::default())),
        Arc::new(FailingBaselineStore),
        Arc::new(MemoryBus::default()),
    );
    let session = engine
        .start_session(Some("s1".into()), "u1", SessionType::Practice)
        .await
        .unwrap();
    assert!(session.baseline.is_none());
}

// ============================================================================
// Ingestion
// ============================================================================

#[tokio::test]
async fn test_frame_sampling_one_in_three() {
    let engine = default_engine();
    engine
        .start_session(Some("s1".into()), "u1", SessionType::Practice)
        .await
        .unwrap();

    let mut processed = 0;
    for i in 0..9 {
        if engine
            .process_frame("s1", &[0u8; 16], i * 33, None)
            .await
            .unwrap()
            .is_some()
        {
            processed += 1;
        }
    }
    assert_eq!(processed, 3);
    assert_eq!(engine.session("s1").unwrap().frame_count, 3);
}

#[tokio::test]
async fn test_audio_never_sampled() {
    let engine = default_engine();
    engine
        .start_session(Some("s1".into()), "u1", SessionType::Practice)
        .await
        .unwrap();

    for i in 0..7 {
        engine.process_audio("s1", &[0u8; 32], i * 100, 16000).await.unwrap();
    }
    assert_eq!(engine.session("s1").unwrap().audio_chunk_count, 7);
}

#[tokio::test]
async fn test_ingestion_for_unknown_session() {
    let mut config = Config::default();
    config.frame_sample_rate = 1;
    let engine = engine_with(
        &config,
        Arc::new(FixedAudioAnalyzer(AudioMetrics::default())),
        Arc::new(FixedVisionAnalyzer(VisionMetrics::default())),
        Arc::new(MemoryBus::default()),
    );
    assert!(matches!(
        engine.process_frame("ghost", &[0u8; 4], 0, None).await,
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        engine.process_audio("ghost", &[0u8; 4], 0, 16000).await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_analyzer_failure_leaves_session_consistent() {
    let mut config = Config::default();
    config.frame_sample_rate = 1;
    let engine = engine_with(
        &config,
        Arc::new(FixedAudioAnalyzer(AudioMetrics::default())),
        Arc::new(FailingVisionAnalyzer),
        Arc::new(MemoryBus::default()),
    );
    engine
        .start_session(Some("s1".into()), "u1", SessionType::Practice)
        .await
        .unwrap();

    assert!(matches!(
        engine.process_frame("s1", &[0u8; 4], 0, None).await,
        Err(Error::Analyzer(_))
    ));
    // Failed ingestion must not bump counters or cache metrics
    let session = engine.session("s1").unwrap();
    assert_eq!(session.frame_count, 0);
    assert!(session.latest_vision.is_none());
}

#[tokio::test]
async fn test_analyzer_timeout_is_skipped_cycle() {
    let mut config = Config::default();
    config.analyzer_timeout_ms = Some(10);
    let engine = engine_with(
        &config,
        Arc::new(SlowAudioAnalyzer),
        Arc::new(FixedVisionAnalyzer(VisionMetrics::default())),
        Arc::new(MemoryBus::default()),
    );
    engine
        .start_session(Some("s1".into()), "u1", SessionType::Practice)
        .await
        .unwrap();

    let err = engine.process_audio("s1", &[0u8; 4], 0, 16000).await.unwrap_err();
    assert!(matches!(err, Error::Analyzer(_)));
    assert_eq!(engine.session("s1").unwrap().audio_chunk_count, 0);
}

// ============================================================================
// Feedback cycles
// ============================================================================

#[tokio::test]
async fn test_audio_only_feedback_applies_pace_penalty() {
    let mut config = Config::default();
    let bus = Arc::new(MemoryBus::default());
    config.frame_sample_rate = 1;
    let engine = engine_with(
        &config,
        Arc::new(FixedAudioAnalyzer(speech_only_audio(190.0))),
        Arc::new(FixedVisionAnalyzer(VisionMetrics::default())),
        bus,
    );
    engine
        .start_session(Some("s1".into()), "u1", SessionType::Practice)
        .await
        .unwrap();
    engine.process_audio("s1", &[0u8; 32], 1000, 16000).await.unwrap();

    let feedback = engine.generate_feedback("s1", None, None, Some(1000)).await.unwrap();

    // Speaking 40 wpm over optimum halves the pace component
    assert!(feedback.scores.clarity < 70.0);
    assert_eq!(feedback.scores.confidence, 70.0);
    assert_eq!(feedback.scores.engagement, 70.0);
    assert_eq!(feedback.scores.authenticity, 70.0);
    assert_eq!(feedback.scores.professional_presence, 70.0);
    assert!(feedback.metrics.speech.is_some());
    assert!(feedback.metrics.facial.is_none());
}

fn metrics_for_confidence(eye_contact: f64) -> (AudioMetrics, VisionMetrics) {
    // confidence = 0.4 * (100 - 2 * 6.25) + 0.3 * eye_contact + 0.3 * 90
    let audio = AudioMetrics {
        tone: Some(ToneMetrics {
            pitch_hz: 150.0,
            pitch_variance: 6.25,
            pitch_range: (140.0, 160.0),
            pitch_contour: "flat".to_string(),
            volume_db: -20.0,
        }),
        ..Default::default()
    };
    let vision = VisionMetrics {
        facial: Some(FacialMetrics {
            eye_contact,
            smile_genuineness: 0.7,
            head_pose: HeadPose::default(),
        }),
        body: Some(BodyMetrics {
            posture: Posture::Open,
            energy_level: 50.0,
            gesture_rate: 1.0,
        }),
        ..Default::default()
    };
    (audio, vision)
}

#[tokio::test]
async fn test_trend_reports_rise_after_five_stable_cycles() {
    let engine = default_engine();
    engine
        .start_session(Some("s1".into()), "u1", SessionType::Practice)
        .await
        .unwrap();

    // Five cycles at confidence 80
    let (audio, vision) = metrics_for_confidence(60.0);
    for i in 0..5 {
        let feedback = engine
            .generate_feedback("s1", Some(audio.clone()), Some(vision.clone()), Some(i * 1000))
            .await
            .unwrap();
        assert!((feedback.scores.confidence - 80.0).abs() < 1e-9);
        // Deltas stay zero until the window is full
        if i < 4 {
            assert_eq!(feedback.trends.confidence_delta, 0.0);
        }
    }

    // Sixth cycle at confidence 90
    let (audio, vision) = metrics_for_confidence(280.0 / 3.0);
    let feedback = engine
        .generate_feedback("s1", Some(audio), Some(vision), Some(6000))
        .await
        .unwrap();
    assert_eq!(feedback.trends.confidence_delta, 10.0);
}

#[tokio::test]
async fn test_history_capped_at_fifty() {
    let engine = default_engine();
    engine
        .start_session(Some("s1".into()), "u1", SessionType::Practice)
        .await
        .unwrap();

    for i in 0..60i64 {
        engine
            .generate_feedback("s1", Some(AudioMetrics::default()), None, Some(i))
            .await
            .unwrap();
    }

    let session = engine.session("s1").unwrap();
    assert_eq!(session.score_history.len(), 50);
    assert_eq!(session.score_history.front().unwrap().timestamp_ms, 10);
    assert_eq!(session.score_history.back().unwrap().timestamp_ms, 59);
}

#[tokio::test]
async fn test_feedback_published_on_session_topic() {
    let bus = Arc::new(MemoryBus::default());
    let engine = engine_with(
        &Config::default(),
        Arc::new(FixedAudioAnalyzer(AudioMetrics::default())),
        Arc::new(FixedVisionAnalyzer(VisionMetrics::default())),
        Arc::clone(&bus) as Arc<dyn FeedbackBus>,
    );
    engine
        .start_session(Some("s1".into()), "u1", SessionType::Practice)
        .await
        .unwrap();

    let mut rx = bus.subscribe();
    engine
        .generate_feedback("s1", Some(AudioMetrics::default()), None, Some(1000))
        .await
        .unwrap();

    let event = rx.recv().await.unwrap();
    assert_eq!(event.topic, "feedback_channel:s1");
    assert_eq!(event.payload["session_id"], "s1");
    assert_eq!(event.payload["type"], "realtime");
}

#[tokio::test]
async fn test_stop_summary_counts_and_duration() {
    let mut config = Config::default();
    config.frame_sample_rate = 1;
    let engine = engine_with(
        &config,
        Arc::new(FixedAudioAnalyzer(speech_only_audio(150.0))),
        Arc::new(FixedVisionAnalyzer(VisionMetrics::default())),
        Arc::new(MemoryBus::default()),
    );
    engine
        .start_session(Some("s1".into()), "u1", SessionType::Live)
        .await
        .unwrap();

    for i in 0..4 {
        engine.process_frame("s1", &[0u8; 8], i, None).await.unwrap();
        engine.process_audio("s1", &[0u8; 8], i, 16000).await.unwrap();
        engine.generate_feedback("s1", None, None, Some(i)).await.unwrap();
    }

    let summary = engine.stop_session("s1").await.unwrap();
    assert_eq!(summary.frames_processed, 4);
    assert_eq!(summary.audio_chunks_processed, 4);
    assert!(summary.duration_secs >= 0.0);
    assert!(summary.peak_moment.is_some());
    // All four cycles were identical, so the average equals any cycle
    assert!((summary.average_scores.clarity - 85.0).abs() < 1e-9);
}
