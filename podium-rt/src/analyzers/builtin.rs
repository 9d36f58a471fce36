//! Built-in placeholder analyzers
//!
//! Deterministic stand-ins for the external perception engines so the
//! service runs end-to-end without them. Audio metrics are derived from
//! signal energy of the raw PCM; vision metrics from simple pixel
//! statistics. No transcription is attempted, so the `speech` section
//! is always absent from built-in audio snapshots.

use async_trait::async_trait;
use podium_common::metrics::{
    AudioMetrics, BodyMetrics, EmotionMetrics, FacialMetrics, HeadPose, Posture,
    ProfessionalMetrics, ToneMetrics, VisionMetrics,
};
use podium_common::Result;

use super::{AudioAnalyzer, VisionAnalyzer};

/// Energy-based audio placeholder
#[derive(Debug, Default)]
pub struct OnboardAudioAnalyzer;

/// RMS of a little-endian i16 PCM buffer, normalized to 0.0-1.0
fn pcm_rms(pcm: &[u8]) -> f64 {
    let mut sum = 0.0f64;
    let mut count = 0usize;
    for pair in pcm.chunks_exact(2) {
        let sample = i16::from_le_bytes([pair[0], pair[1]]) as f64 / i16::MAX as f64;
        sum += sample * sample;
        count += 1;
    }
    if count == 0 {
        return 0.0;
    }
    (sum / count as f64).sqrt()
}

#[async_trait]
impl AudioAnalyzer for OnboardAudioAnalyzer {
    async fn analyze(
        &self,
        pcm: &[u8],
        timestamp_ms: i64,
        _sample_rate: u32,
    ) -> Result<AudioMetrics> {
        let rms = pcm_rms(pcm);
        let volume_db = 20.0 * rms.max(1e-6).log10();

        // Louder delivery reads as wider, livelier pitch use
        let pitch_hz = 110.0 + rms * 80.0;
        let pitch_spread = 20.0 + rms * 160.0;
        let tone = ToneMetrics {
            pitch_hz,
            pitch_variance: 5.0 + rms * 30.0,
            pitch_range: (pitch_hz - pitch_spread / 2.0, pitch_hz + pitch_spread / 2.0),
            pitch_contour: if rms > 0.3 { "dynamic" } else { "flat" }.to_string(),
            volume_db,
        };

        let emotion = EmotionMetrics {
            primary_emotion: "neutral".to_string(),
            stress_level: (rms * 120.0).min(100.0),
            arousal: (rms * 2.0).min(1.0),
            valence: 0.5,
        };

        Ok(AudioMetrics {
            timestamp_ms,
            tone: Some(tone),
            emotion: Some(emotion),
            speech: None,
        })
    }
}

/// Pixel-statistics vision placeholder
#[derive(Debug, Default)]
pub struct OnboardVisionAnalyzer;

fn pixel_stats(frame: &[u8]) -> (f64, f64) {
    if frame.is_empty() {
        return (0.0, 0.0);
    }
    let mean = frame.iter().map(|&b| b as f64).sum::<f64>() / frame.len() as f64;
    let variance =
        frame.iter().map(|&b| (b as f64 - mean).powi(2)).sum::<f64>() / frame.len() as f64;
    (mean, variance.sqrt())
}

#[async_trait]
impl VisionAnalyzer for OnboardVisionAnalyzer {
    async fn analyze(
        &self,
        frame: &[u8],
        frame_number: u64,
        timestamp_ms: i64,
    ) -> Result<VisionMetrics> {
        let (brightness, contrast) = pixel_stats(frame);

        let facial = FacialMetrics {
            // Well-lit frames correlate with facing the camera
            eye_contact: (40.0 + brightness / 255.0 * 50.0).min(100.0),
            smile_genuineness: 0.5,
            head_pose: HeadPose::default(),
        };

        let body = BodyMetrics {
            posture: Posture::Neutral,
            energy_level: (contrast / 64.0 * 100.0).min(100.0),
            gesture_rate: 0.0,
        };

        Ok(VisionMetrics {
            timestamp_ms,
            frame_number: Some(frame_number),
            facial: Some(facial),
            body: Some(body),
            professional: Some(ProfessionalMetrics { overall_polish: 70.0 }),
        })
    }
}
