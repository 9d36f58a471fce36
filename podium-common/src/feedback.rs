//! Score, trend, suggestion and feedback message types
//!
//! A `FeedbackMessage` is the unit appended to session history and
//! published on the per-session topic. Field names on the wire follow
//! the client contract (camelCase score names, lowercase enums).

use crate::metrics::{BodyMetrics, FacialMetrics, SpeechMetrics, ToneMetrics};
use serde::{Deserialize, Serialize};

/// Fixed neutral score used when no input modality is available
pub const NEUTRAL_SCORE: f64 = 70.0;

/// The five fused 0-100 performance scores for one feedback cycle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreSet {
    pub confidence: f64,
    pub engagement: f64,
    pub clarity: f64,
    pub authenticity: f64,
    #[serde(rename = "professionalPresence")]
    pub professional_presence: f64,
}

impl ScoreSet {
    /// All five scores at the neutral default
    pub fn neutral() -> Self {
        Self {
            confidence: NEUTRAL_SCORE,
            engagement: NEUTRAL_SCORE,
            clarity: NEUTRAL_SCORE,
            authenticity: NEUTRAL_SCORE,
            professional_presence: NEUTRAL_SCORE,
        }
    }

    /// Clamp every score into [0, 100]
    pub fn clamped(self) -> Self {
        Self {
            confidence: self.confidence.clamp(0.0, 100.0),
            engagement: self.engagement.clamp(0.0, 100.0),
            clarity: self.clarity.clamp(0.0, 100.0),
            authenticity: self.authenticity.clamp(0.0, 100.0),
            professional_presence: self.professional_presence.clamp(0.0, 100.0),
        }
    }

    /// Sum of all five scores (used for peak-moment selection)
    pub fn total(&self) -> f64 {
        self.confidence
            + self.engagement
            + self.clarity
            + self.authenticity
            + self.professional_presence
    }
}

impl Default for ScoreSet {
    fn default() -> Self {
        Self::neutral()
    }
}

/// One recorded feedback cycle in a session's score history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub timestamp_ms: i64,
    pub scores: ScoreSet,
}

/// Current-vs-rolling-average deltas for three of the five scores
///
/// All zero while fewer than 5 prior cycles exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendDelta {
    #[serde(rename = "confidenceDelta")]
    pub confidence_delta: f64,
    #[serde(rename = "engagementDelta")]
    pub engagement_delta: f64,
    #[serde(rename = "clarityDelta")]
    pub clarity_delta: f64,
}

/// What aspect of delivery a suggestion targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionCategory {
    Speech,
    Body,
    Voice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionPriority {
    High,
    Medium,
}

/// One actionable coaching suggestion, generated fresh per cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub category: SuggestionCategory,
    pub priority: SuggestionPriority,
    pub message: String,
    pub improvement: String,
}

/// Classification of a feedback message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackKind {
    Realtime,
    Summary,
    Alert,
}

/// Excerpt of the latest metric snapshots carried on a feedback message
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsExcerpt {
    pub facial: Option<FacialMetrics>,
    pub body: Option<BodyMetrics>,
    pub voice: Option<ToneMetrics>,
    pub speech: Option<SpeechMetrics>,
}

/// One complete feedback cycle result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackMessage {
    pub timestamp_ms: i64,
    pub session_id: String,
    #[serde(rename = "type")]
    pub kind: FeedbackKind,
    pub scores: ScoreSet,
    pub metrics: MetricsExcerpt,
    pub suggestions: Vec<Suggestion>,
    pub trends: TrendDelta,
}
