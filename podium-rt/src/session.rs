//! Session store
//!
//! In-memory registry of active coaching sessions, the single source of
//! truth for per-session counters, latest metric snapshots and score
//! history. Sessions are exclusively owned by the store: collaborators
//! hold a session id and look it up per call. The map lock is only ever
//! held for a single read/modify, never across an await point.

use chrono::{DateTime, Utc};
use podium_common::feedback::{ScoreRecord, ScoreSet};
use podium_common::metrics::{AudioMetrics, Baseline, VisionMetrics};
use podium_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tracing::info;

/// Kind of coaching run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    #[default]
    Practice,
    Live,
    Review,
    Calibration,
}

/// One interactive coaching run
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub session_id: String,
    pub user_id: String,
    pub session_type: SessionType,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub frame_count: u64,
    pub audio_chunk_count: u64,
    /// Fetched once at start, never refreshed
    pub baseline: Option<Baseline>,
    /// Bounded, newest last
    pub score_history: VecDeque<ScoreRecord>,
    #[serde(skip)]
    pub latest_audio: Option<AudioMetrics>,
    #[serde(skip)]
    pub latest_vision: Option<VisionMetrics>,
}

impl Session {
    fn new(
        session_id: String,
        user_id: String,
        session_type: SessionType,
        baseline: Option<Baseline>,
    ) -> Self {
        Self {
            session_id,
            user_id,
            session_type,
            start_time: Utc::now(),
            end_time: None,
            frame_count: 0,
            audio_chunk_count: 0,
            baseline,
            score_history: VecDeque::new(),
            latest_audio: None,
            latest_vision: None,
        }
    }

    /// Append a score record, evicting the oldest entry past `cap`
    pub fn push_score(&mut self, record: ScoreRecord, cap: usize) {
        self.score_history.push_back(record);
        while self.score_history.len() > cap {
            self.score_history.pop_front();
        }
    }
}

/// End-of-session statistics returned by `stop`
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub user_id: String,
    pub duration_secs: f64,
    pub frames_processed: u64,
    pub audio_chunks_processed: u64,
    /// Mean of every recorded score set (all zero when nothing recorded)
    pub average_scores: ScoreSet,
    /// The history entry whose five scores sum highest
    pub peak_moment: Option<ScoreRecord>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Registry of active sessions keyed by session id
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    history_cap: usize,
}

impl SessionStore {
    pub fn new(history_cap: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            history_cap: history_cap.max(1),
        }
    }

    /// Create and register a session
    ///
    /// Duplicate ids are rejected rather than silently replaced, so an
    /// accidental double-start cannot discard accumulated history.
    pub fn start(
        &self,
        session_id: &str,
        user_id: &str,
        session_type: SessionType,
        baseline: Option<Baseline>,
    ) -> Result<Session> {
        let mut sessions = self.lock();
        if sessions.contains_key(session_id) {
            return Err(Error::AlreadyExists(session_id.to_string()));
        }
        let session = Session::new(
            session_id.to_string(),
            user_id.to_string(),
            session_type,
            baseline,
        );
        sessions.insert(session_id.to_string(), session.clone());
        info!("session {} started for user {}", session_id, user_id);
        Ok(session)
    }

    /// Remove a session and compute its summary
    pub fn stop(&self, session_id: &str) -> Result<SessionSummary> {
        let mut session = self
            .lock()
            .remove(session_id)
            .ok_or_else(|| Error::NotFound(session_id.to_string()))?;

        let end_time = Utc::now();
        session.end_time = Some(end_time);
        let duration_secs =
            (end_time - session.start_time).num_milliseconds() as f64 / 1000.0;

        let summary = SessionSummary {
            session_id: session.session_id,
            user_id: session.user_id,
            duration_secs,
            frames_processed: session.frame_count,
            audio_chunks_processed: session.audio_chunk_count,
            average_scores: average_scores(&session.score_history),
            peak_moment: peak_moment(&session.score_history),
            start_time: session.start_time,
            end_time,
        };
        info!(
            "session {} stopped after {:.1}s ({} cycles recorded)",
            summary.session_id,
            duration_secs,
            session.score_history.len()
        );
        Ok(summary)
    }

    /// Look up a session by id (cloned snapshot)
    pub fn get(&self, session_id: &str) -> Result<Session> {
        self.lock()
            .get(session_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(session_id.to_string()))
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.lock().contains_key(session_id)
    }

    pub fn active_count(&self) -> usize {
        self.lock().len()
    }

    pub fn history_cap(&self) -> usize {
        self.history_cap
    }

    /// Run a closure against a session under the store lock
    ///
    /// This is the mechanism for read-modify sequences that must be
    /// atomic, such as computing a trend against the history as it
    /// stood immediately before the append. The closure must not block.
    pub fn with_session<R>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut Session) -> R,
    ) -> Result<R> {
        let mut sessions = self.lock();
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| Error::NotFound(session_id.to_string()))?;
        Ok(f(session))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().expect("session store poisoned")
    }
}

fn average_scores(history: &VecDeque<ScoreRecord>) -> ScoreSet {
    if history.is_empty() {
        return ScoreSet {
            confidence: 0.0,
            engagement: 0.0,
            clarity: 0.0,
            authenticity: 0.0,
            professional_presence: 0.0,
        };
    }
    let n = history.len() as f64;
    ScoreSet {
        confidence: history.iter().map(|r| r.scores.confidence).sum::<f64>() / n,
        engagement: history.iter().map(|r| r.scores.engagement).sum::<f64>() / n,
        clarity: history.iter().map(|r| r.scores.clarity).sum::<f64>() / n,
        authenticity: history.iter().map(|r| r.scores.authenticity).sum::<f64>() / n,
        professional_presence: history
            .iter()
            .map(|r| r.scores.professional_presence)
            .sum::<f64>()
            / n,
    }
}

fn peak_moment(history: &VecDeque<ScoreRecord>) -> Option<ScoreRecord> {
    history
        .iter()
        .max_by(|a, b| {
            a.scores
                .total()
                .partial_cmp(&b.scores.total())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .cloned()
}
