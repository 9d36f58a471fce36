//! Feature analyzer collaborator seams
//!
//! Audio and vision analysis are performed by external perception
//! engines; the orchestrator only consumes their output shape. These
//! traits are the injection points: the binary wires in the built-in
//! placeholder implementations, tests wire in fixed fakes, and a real
//! deployment plugs its engines in behind the same traits.

use async_trait::async_trait;
use podium_common::metrics::{AudioMetrics, VisionMetrics};
use podium_common::Result;

pub mod builtin;

pub use builtin::{OnboardAudioAnalyzer, OnboardVisionAnalyzer};

/// Analyzes one raw PCM audio chunk into a metrics snapshot
#[async_trait]
pub trait AudioAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        pcm: &[u8],
        timestamp_ms: i64,
        sample_rate: u32,
    ) -> Result<AudioMetrics>;
}

/// Analyzes one decoded video frame into a metrics snapshot
#[async_trait]
pub trait VisionAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        frame: &[u8],
        frame_number: u64,
        timestamp_ms: i64,
    ) -> Result<VisionMetrics>;
}
