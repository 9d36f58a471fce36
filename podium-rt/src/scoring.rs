//! Score fusion and trend computation
//!
//! Both functions are pure: identical inputs always produce identical
//! output. Each of the five scores is a weighted sum of the component
//! signals that are present; a score with no available signal keeps the
//! neutral default of 70.

use podium_common::feedback::{ScoreRecord, ScoreSet, TrendDelta};
use podium_common::metrics::{AudioMetrics, Baseline, Posture, VisionMetrics};
use std::collections::VecDeque;

/// Number of history entries the trend average looks back over
pub const TREND_WINDOW: usize = 5;

/// Fuse the latest metric snapshots into the five performance scores
///
/// The baseline parameter is accepted but not yet weighted in; scores
/// are absolute until calibration baselines define per-user offsets.
pub fn fuse(
    audio: Option<&AudioMetrics>,
    vision: Option<&VisionMetrics>,
    _baseline: Option<&Baseline>,
) -> ScoreSet {
    let mut scores = ScoreSet::neutral();

    let tone = audio.and_then(|a| a.tone.as_ref());
    let speech = audio.and_then(|a| a.speech.as_ref());
    let facial = vision.and_then(|v| v.facial.as_ref());
    let body = vision.and_then(|v| v.body.as_ref());
    let professional = vision.and_then(|v| v.professional.as_ref());

    // Confidence: vocal steadiness 40%, eye contact 30%, posture 30%
    let mut confidence = Vec::new();
    if let Some(tone) = tone {
        let vocal_steadiness = (100.0 - tone.pitch_variance * 2.0).max(0.0);
        confidence.push(vocal_steadiness * 0.4);
    }
    if let Some(facial) = facial {
        confidence.push(facial.eye_contact * 0.3);
    }
    if let Some(body) = body {
        let posture_score = match body.posture {
            Posture::Open => 90.0,
            Posture::Neutral => 70.0,
            Posture::Closed => 50.0,
        };
        confidence.push(posture_score * 0.3);
    }
    if !confidence.is_empty() {
        scores.confidence = confidence.iter().sum();
    }

    // Engagement: body energy 50%, vocal variety 50%
    let mut engagement = Vec::new();
    if let Some(body) = body {
        engagement.push(body.energy_level * 0.5);
    }
    if let Some(tone) = tone {
        let (pitch_min, pitch_max) = tone.pitch_range;
        let vocal_variety = ((pitch_max - pitch_min) / 3.0).min(100.0);
        engagement.push(vocal_variety * 0.5);
    }
    if !engagement.is_empty() {
        scores.engagement = engagement.iter().sum();
    }

    // Clarity: articulation 50%, pace 50% (optimal pace 150 wpm)
    if let Some(speech) = speech {
        let pace_score = (100.0 - (speech.speaking_rate - 150.0).abs() * 2.0).max(0.0);
        scores.clarity = speech.articulation_score * 0.5 + pace_score * 0.5;
    }

    // Authenticity: smile genuineness scaled to 0-100
    if let Some(facial) = facial {
        scores.authenticity = facial.smile_genuineness * 100.0;
    }

    // Professional presence: taken directly from the vision engine
    if let Some(professional) = professional {
        scores.professional_presence = professional.overall_polish;
    }

    scores.clamped()
}

/// Compare current scores against the mean of the last `TREND_WINDOW`
/// recorded cycles
///
/// Must be called with the history as it stood before the current
/// cycle's record is appended. All deltas are zero until enough history
/// exists; results are rounded to one decimal place.
pub fn trend(history: &VecDeque<ScoreRecord>, current: &ScoreSet) -> TrendDelta {
    if history.len() < TREND_WINDOW {
        return TrendDelta::default();
    }

    let recent: Vec<&ScoreRecord> = history.iter().rev().take(TREND_WINDOW).collect();
    let n = recent.len() as f64;
    let avg_confidence = recent.iter().map(|r| r.scores.confidence).sum::<f64>() / n;
    let avg_engagement = recent.iter().map(|r| r.scores.engagement).sum::<f64>() / n;
    let avg_clarity = recent.iter().map(|r| r.scores.clarity).sum::<f64>() / n;

    TrendDelta {
        confidence_delta: round1(current.confidence - avg_confidence),
        engagement_delta: round1(current.engagement - avg_engagement),
        clarity_delta: round1(current.clarity - avg_clarity),
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
