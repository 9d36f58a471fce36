//! Rule-based suggestion engine
//!
//! Generates actionable coaching suggestions from the latest metrics
//! and the fused scores. Rules are evaluated in a fixed order and every
//! matching rule fires; output order follows the rule table, not
//! priority. Suggestions never persist across cycles.

use podium_common::feedback::{ScoreSet, Suggestion, SuggestionCategory, SuggestionPriority};
use podium_common::metrics::{AudioMetrics, VisionMetrics};

/// Evaluate the rule table against one feedback cycle's inputs
pub fn generate(
    audio: Option<&AudioMetrics>,
    vision: Option<&VisionMetrics>,
    scores: &ScoreSet,
) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();

    let speech = audio.and_then(|a| a.speech.as_ref());
    let emotion = audio.and_then(|a| a.emotion.as_ref());
    let body = vision.and_then(|v| v.body.as_ref());

    // Rule 1: low confidence with heavy filler-word use
    if scores.confidence < 60.0 {
        if let Some(speech) = speech {
            let total_fillers = speech.total_fillers();
            if total_fillers > 5 {
                suggestions.push(Suggestion {
                    category: SuggestionCategory::Speech,
                    priority: SuggestionPriority::High,
                    message: format!("You used {} filler words", total_fillers),
                    improvement: "Try pausing instead of using filler words".to_string(),
                });
            }
        }
    }

    // Rule 2: low engagement with low body energy
    if scores.engagement < 60.0 {
        if let Some(body) = body {
            if body.energy_level < 50.0 {
                suggestions.push(Suggestion {
                    category: SuggestionCategory::Body,
                    priority: SuggestionPriority::Medium,
                    message: "Energy level appears low".to_string(),
                    improvement: "Try standing up or using more gestures".to_string(),
                });
            }
        }
    }

    // Rule 3: low clarity while speaking too fast
    if scores.clarity < 60.0 {
        if let Some(speech) = speech {
            if speech.speaking_rate > 180.0 {
                suggestions.push(Suggestion {
                    category: SuggestionCategory::Speech,
                    priority: SuggestionPriority::High,
                    message: format!("Speaking too fast at {} WPM", speech.speaking_rate as i64),
                    improvement: "Slow down to 140-160 WPM for clarity".to_string(),
                });
            }
        }
    }

    // Rule 4: vocal stress, independent of the scores above
    if let Some(emotion) = emotion {
        if emotion.stress_level > 70.0 {
            suggestions.push(Suggestion {
                category: SuggestionCategory::Voice,
                priority: SuggestionPriority::High,
                message: "High stress detected in your voice".to_string(),
                improvement: "Take a deep breath and pause".to_string(),
            });
        }
    }

    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;
    use podium_common::metrics::{BodyMetrics, EmotionMetrics, FillerWord, Posture, SpeechMetrics};

    fn audio_with_fillers(count: u32) -> AudioMetrics {
        AudioMetrics {
            speech: Some(SpeechMetrics {
                transcript: None,
                speaking_rate: 150.0,
                articulation_score: 70.0,
                filler_words: vec![FillerWord { word: "um".into(), count }],
                pause_count: 0,
            }),
            ..Default::default()
        }
    }

    fn scores_with(confidence: f64, engagement: f64, clarity: f64) -> ScoreSet {
        ScoreSet {
            confidence,
            engagement,
            clarity,
            ..ScoreSet::neutral()
        }
    }

    #[test]
    fn test_filler_rule_fires_on_low_confidence() {
        let audio = audio_with_fillers(6);
        let scores = scores_with(50.0, 70.0, 70.0);
        let suggestions = generate(Some(&audio), None, &scores);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].category, SuggestionCategory::Speech);
        assert_eq!(suggestions[0].priority, SuggestionPriority::High);
        assert!(suggestions[0].message.contains("6 filler words"));
    }

    #[test]
    fn test_filler_rule_silent_on_high_confidence() {
        let audio = audio_with_fillers(6);
        let scores = scores_with(80.0, 70.0, 70.0);
        assert!(generate(Some(&audio), None, &scores).is_empty());
    }

    #[test]
    fn test_filler_rule_needs_more_than_five() {
        let audio = audio_with_fillers(5);
        let scores = scores_with(50.0, 70.0, 70.0);
        assert!(generate(Some(&audio), None, &scores).is_empty());
    }

    #[test]
    fn test_low_energy_rule() {
        let vision = VisionMetrics {
            body: Some(BodyMetrics {
                posture: Posture::Neutral,
                energy_level: 30.0,
                gesture_rate: 0.0,
            }),
            ..Default::default()
        };
        let scores = scores_with(70.0, 45.0, 70.0);
        let suggestions = generate(None, Some(&vision), &scores);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].category, SuggestionCategory::Body);
        assert_eq!(suggestions[0].priority, SuggestionPriority::Medium);
    }

    #[test]
    fn test_fast_speech_rule_reports_rate() {
        let mut audio = audio_with_fillers(0);
        audio.speech.as_mut().unwrap().speaking_rate = 195.0;
        let scores = scores_with(70.0, 70.0, 40.0);
        let suggestions = generate(Some(&audio), None, &scores);
        assert_eq!(suggestions.len(), 1);
        assert!(suggestions[0].message.contains("195 WPM"));
        assert!(suggestions[0].improvement.contains("140-160"));
    }

    #[test]
    fn test_stress_rule_independent_of_scores() {
        let audio = AudioMetrics {
            emotion: Some(EmotionMetrics {
                primary_emotion: "anxious".into(),
                stress_level: 85.0,
                arousal: 0.9,
                valence: 0.2,
            }),
            ..Default::default()
        };
        // All scores healthy; the stress rule still fires
        let suggestions = generate(Some(&audio), None, &ScoreSet::neutral());
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].category, SuggestionCategory::Voice);
    }

    #[test]
    fn test_all_matching_rules_fire_in_table_order() {
        let mut audio = audio_with_fillers(8);
        audio.speech.as_mut().unwrap().speaking_rate = 200.0;
        audio.emotion = Some(EmotionMetrics {
            primary_emotion: "anxious".into(),
            stress_level: 90.0,
            arousal: 1.0,
            valence: 0.1,
        });
        let vision = VisionMetrics {
            body: Some(BodyMetrics {
                posture: Posture::Closed,
                energy_level: 20.0,
                gesture_rate: 0.0,
            }),
            ..Default::default()
        };
        let scores = scores_with(40.0, 40.0, 40.0);
        let suggestions = generate(Some(&audio), Some(&vision), &scores);
        let categories: Vec<SuggestionCategory> =
            suggestions.iter().map(|s| s.category).collect();
        assert_eq!(
            categories,
            vec![
                SuggestionCategory::Speech,
                SuggestionCategory::Body,
                SuggestionCategory::Speech,
                SuggestionCategory::Voice,
            ]
        );
    }

    #[test]
    fn test_no_metrics_no_suggestions() {
        let scores = scores_with(10.0, 10.0, 10.0);
        assert!(generate(None, None, &scores).is_empty());
    }
}
