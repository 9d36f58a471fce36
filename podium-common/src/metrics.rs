//! Metric snapshot types produced by the feature analyzers
//!
//! The audio and vision analyzers are external engines; Podium only
//! consumes their output shape. Sub-objects are optional because an
//! engine may omit a whole analysis family for a given chunk. Snapshots
//! are immutable values once produced.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-user calibration baseline, fetched once at session start
pub type Baseline = HashMap<String, f64>;

/// One analyzer output for one audio chunk
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AudioMetrics {
    pub timestamp_ms: i64,
    #[serde(default)]
    pub tone: Option<ToneMetrics>,
    #[serde(default)]
    pub emotion: Option<EmotionMetrics>,
    #[serde(default)]
    pub speech: Option<SpeechMetrics>,
}

/// Pitch/volume/prosody metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToneMetrics {
    /// Median fundamental frequency in Hz
    pub pitch_hz: f64,
    /// Standard deviation of pitch over the chunk
    pub pitch_variance: f64,
    /// (min, max) pitch over the chunk
    pub pitch_range: (f64, f64),
    /// Overall pitch movement: "rising", "falling", "flat" or "dynamic"
    pub pitch_contour: String,
    pub volume_db: f64,
}

/// Emotion classification metrics from the audio engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionMetrics {
    pub primary_emotion: String,
    /// 0-100 estimated stress
    pub stress_level: f64,
    pub arousal: f64,
    pub valence: f64,
}

/// Speech content metrics (transcription-derived)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechMetrics {
    #[serde(default)]
    pub transcript: Option<String>,
    /// Words per minute
    pub speaking_rate: f64,
    /// 0-100 articulation quality
    pub articulation_score: f64,
    #[serde(default)]
    pub filler_words: Vec<FillerWord>,
    #[serde(default)]
    pub pause_count: u32,
}

/// One detected filler word and how often it occurred
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillerWord {
    pub word: String,
    pub count: u32,
}

impl SpeechMetrics {
    /// Total filler-word occurrences across all detected words
    pub fn total_fillers(&self) -> u32 {
        self.filler_words.iter().map(|fw| fw.count).sum()
    }
}

/// One analyzer output for one video frame
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VisionMetrics {
    pub timestamp_ms: i64,
    #[serde(default)]
    pub frame_number: Option<u64>,
    #[serde(default)]
    pub facial: Option<FacialMetrics>,
    #[serde(default)]
    pub body: Option<BodyMetrics>,
    #[serde(default)]
    pub professional: Option<ProfessionalMetrics>,
}

/// Facial analysis metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacialMetrics {
    /// 0-100 estimated camera eye contact
    pub eye_contact: f64,
    /// 0.0-1.0 genuineness of detected smile
    pub smile_genuineness: f64,
    pub head_pose: HeadPose,
}

/// Head orientation in degrees
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HeadPose {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

/// Body language metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyMetrics {
    pub posture: Posture,
    /// 0-100 movement energy
    pub energy_level: f64,
    pub gesture_rate: f64,
}

/// Coarse posture classification from the vision engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Posture {
    Open,
    Neutral,
    Closed,
}

/// Professional presence metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfessionalMetrics {
    /// 0-100 overall polish estimate
    pub overall_polish: f64,
}
