//! Feedback engine
//!
//! Orchestrates the analyzers, session store, score fusion, trend
//! tracking, suggestion generation and the best-effort side-channel.
//! One engine is constructed at process start and shared by every
//! connection and HTTP handler; collaborators are injected so tests can
//! substitute fakes.

use crate::analyzers::{AudioAnalyzer, VisionAnalyzer};
use crate::baseline::BaselineStore;
use crate::bus::{FeedbackBus, FEEDBACK_TOPIC_PREFIX};
use crate::config::Config;
use crate::sampling::SamplingGate;
use crate::session::{Session, SessionStore, SessionSummary, SessionType};
use crate::{scoring, suggestions};
use podium_common::feedback::{
    FeedbackKind, FeedbackMessage, MetricsExcerpt, ScoreRecord,
};
use podium_common::metrics::{AudioMetrics, VisionMetrics};
use podium_common::time::now_ms;
use podium_common::{Error, Result};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Real-time feedback orchestrator
pub struct FeedbackEngine {
    store: SessionStore,
    sampling: SamplingGate,
    audio_analyzer: Arc<dyn AudioAnalyzer>,
    vision_analyzer: Arc<dyn VisionAnalyzer>,
    baselines: Arc<dyn BaselineStore>,
    bus: Arc<dyn FeedbackBus>,
    analyzer_timeout: Option<Duration>,
    metrics_cache_ttl: Duration,
    session_cache_ttl: Duration,
}

impl FeedbackEngine {
    pub fn new(
        config: &Config,
        audio_analyzer: Arc<dyn AudioAnalyzer>,
        vision_analyzer: Arc<dyn VisionAnalyzer>,
        baselines: Arc<dyn BaselineStore>,
        bus: Arc<dyn FeedbackBus>,
    ) -> Self {
        Self {
            store: SessionStore::new(config.score_history_cap),
            sampling: SamplingGate::new(config.frame_sample_rate),
            audio_analyzer,
            vision_analyzer,
            baselines,
            bus,
            analyzer_timeout: config.analyzer_timeout_ms.map(Duration::from_millis),
            metrics_cache_ttl: Duration::from_secs(config.metrics_cache_ttl_secs),
            session_cache_ttl: Duration::from_secs(config.session_cache_ttl_secs),
        }
    }

    /// Create a session, fetching the user baseline once
    ///
    /// A missing `session_id` gets a generated UUID. Baseline fetch
    /// failures degrade to "no baseline" rather than failing the start.
    pub async fn start_session(
        &self,
        session_id: Option<String>,
        user_id: &str,
        session_type: SessionType,
    ) -> Result<Session> {
        let session_id = session_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        if self.store.contains(&session_id) {
            return Err(Error::AlreadyExists(session_id));
        }

        let baseline = match self.baselines.fetch(user_id).await {
            Ok(baseline) => baseline,
            Err(e) => {
                warn!("baseline fetch failed for user {}: {}", user_id, e);
                None
            }
        };

        let session = self.store.start(&session_id, user_id, session_type, baseline)?;
        self.cache_best_effort(
            format!("feedback_session:{}", session_id),
            &session,
            self.session_cache_ttl,
        )
        .await;
        Ok(session)
    }

    /// Stop a session, returning its summary
    pub async fn stop_session(&self, session_id: &str) -> Result<SessionSummary> {
        let summary = self.store.stop(session_id)?;
        if let Err(e) = self
            .bus
            .cache_delete(&format!("feedback_session:{}", session_id))
            .await
        {
            warn!("session cache delete failed for {}: {}", session_id, e);
        }
        Ok(summary)
    }

    /// Look up a session snapshot
    pub fn session(&self, session_id: &str) -> Result<Session> {
        self.store.get(session_id)
    }

    pub fn active_sessions(&self) -> usize {
        self.store.active_count()
    }

    /// Process one video frame
    ///
    /// Returns `Ok(None)` when the sampling gate sheds the frame. The
    /// gate counts the frame before the session lookup, because load
    /// shedding is a service-wide decision.
    pub async fn process_frame(
        &self,
        session_id: &str,
        frame: &[u8],
        timestamp_ms: i64,
        frame_number: Option<u64>,
    ) -> Result<Option<VisionMetrics>> {
        if !self.sampling.admit() {
            debug!("frame at {} shed by sampling gate", timestamp_ms);
            return Ok(None);
        }
        if !self.store.contains(session_id) {
            return Err(Error::NotFound(session_id.to_string()));
        }

        let frame_number = frame_number.unwrap_or_else(|| self.sampling.frames_seen());
        let metrics = self
            .with_timeout(
                "vision",
                self.vision_analyzer.analyze(frame, frame_number, timestamp_ms),
            )
            .await?;

        self.store.with_session(session_id, |s| {
            s.frame_count += 1;
            s.latest_vision = Some(metrics.clone());
        })?;

        self.cache_best_effort(
            format!("feedback_frame:{}:{}", session_id, timestamp_ms),
            &metrics,
            self.metrics_cache_ttl,
        )
        .await;
        Ok(Some(metrics))
    }

    /// Process one audio chunk (never sampled; audio carries denser
    /// signal per chunk than video)
    pub async fn process_audio(
        &self,
        session_id: &str,
        pcm: &[u8],
        timestamp_ms: i64,
        sample_rate: u32,
    ) -> Result<AudioMetrics> {
        if !self.store.contains(session_id) {
            return Err(Error::NotFound(session_id.to_string()));
        }

        let metrics = self
            .with_timeout(
                "audio",
                self.audio_analyzer.analyze(pcm, timestamp_ms, sample_rate),
            )
            .await?;

        self.store.with_session(session_id, |s| {
            s.audio_chunk_count += 1;
            s.latest_audio = Some(metrics.clone());
        })?;

        self.cache_best_effort(
            format!("feedback_audio:{}:{}", session_id, timestamp_ms),
            &metrics,
            self.metrics_cache_ttl,
        )
        .await;
        Ok(metrics)
    }

    /// Run one feedback cycle: fuse scores, generate suggestions,
    /// compute the trend, append to history and publish
    ///
    /// Explicit metric arguments override the session's cached latest
    /// snapshots (non-streaming callers supply their own). The trend is
    /// computed and the record appended under a single store lock, so
    /// the trend always sees the history exactly as it stood before
    /// this cycle.
    pub async fn generate_feedback(
        &self,
        session_id: &str,
        audio_metrics: Option<AudioMetrics>,
        vision_metrics: Option<VisionMetrics>,
        timestamp_ms: Option<i64>,
    ) -> Result<FeedbackMessage> {
        let session = self.store.get(session_id)?;
        let audio = audio_metrics.or(session.latest_audio);
        let vision = vision_metrics.or(session.latest_vision);
        let timestamp_ms = timestamp_ms.unwrap_or_else(now_ms);

        let scores = scoring::fuse(audio.as_ref(), vision.as_ref(), session.baseline.as_ref());
        let suggestions = suggestions::generate(audio.as_ref(), vision.as_ref(), &scores);

        let cap = self.store.history_cap();
        let trends = self.store.with_session(session_id, |s| {
            let trends = scoring::trend(&s.score_history, &scores);
            s.push_score(ScoreRecord { timestamp_ms, scores }, cap);
            trends
        })?;

        let metrics = MetricsExcerpt {
            facial: vision.as_ref().and_then(|v| v.facial.clone()),
            body: vision.as_ref().and_then(|v| v.body.clone()),
            voice: audio.as_ref().and_then(|a| a.tone.clone()),
            speech: audio.as_ref().and_then(|a| a.speech.clone()),
        };

        let feedback = FeedbackMessage {
            timestamp_ms,
            session_id: session_id.to_string(),
            kind: FeedbackKind::Realtime,
            scores,
            metrics,
            suggestions,
            trends,
        };

        self.publish_best_effort(&feedback).await;
        Ok(feedback)
    }

    /// Whether a session has at least one cached metric snapshot
    pub fn has_latest_metrics(&self, session_id: &str) -> Result<bool> {
        let session = self.store.get(session_id)?;
        Ok(session.latest_audio.is_some() || session.latest_vision.is_some())
    }

    /// Wrap an analyzer call in the configured timeout; an elapsed
    /// timeout is an analyzer failure (callers skip the modality)
    async fn with_timeout<T>(
        &self,
        what: &str,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match self.analyzer_timeout {
            Some(timeout) => tokio::time::timeout(timeout, fut)
                .await
                .map_err(|_| Error::Analyzer(format!("{} analyzer timed out", what)))?,
            None => fut.await,
        }
    }

    async fn cache_best_effort<T: Serialize>(&self, key: String, value: &T, ttl: Duration) {
        let payload = match serde_json::to_value(value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("cache serialization failed for {}: {}", key, e);
                return;
            }
        };
        if let Err(e) = self.bus.cache_set(&key, &payload, ttl).await {
            warn!("cache write failed for {}: {}", key, e);
        }
    }

    async fn publish_best_effort(&self, feedback: &FeedbackMessage) {
        let topic = format!("{}{}", FEEDBACK_TOPIC_PREFIX, feedback.session_id);
        let payload = match serde_json::to_value(feedback) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("feedback serialization failed for {}: {}", topic, e);
                return;
            }
        };
        if let Err(e) = self.bus.publish(&topic, &payload).await {
            warn!("feedback publish failed for {}: {}", topic, e);
        }
    }
}
