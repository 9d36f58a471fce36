//! Video frame sampling gate
//!
//! Load-shedding for bandwidth-heavy, visually redundant video frames:
//! only every Nth frame is admitted for analysis. The counter is
//! process-wide, shared by all connections, because shedding is a
//! decision for the whole service rather than per client. Audio chunks
//! are never sampled.

use std::sync::atomic::{AtomicU64, Ordering};

/// Admits one in every `sample_rate` frames
pub struct SamplingGate {
    sample_rate: u64,
    counter: AtomicU64,
}

impl SamplingGate {
    /// Create a gate admitting every `sample_rate`-th frame (min 1)
    pub fn new(sample_rate: u64) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            counter: AtomicU64::new(0),
        }
    }

    /// Count one inbound frame and decide whether it is processed
    ///
    /// Lock-free; safe to call from any task.
    pub fn admit(&self) -> bool {
        let seen = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        seen % self.sample_rate == 0
    }

    /// Total frames seen by the gate since startup
    pub fn frames_seen(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_in_three_admitted() {
        let gate = SamplingGate::new(3);
        let admitted: Vec<bool> = (0..9).map(|_| gate.admit()).collect();
        // Frames 3, 6 and 9 (1-indexed) pass the gate
        assert_eq!(
            admitted,
            vec![false, false, true, false, false, true, false, false, true]
        );
        assert_eq!(gate.frames_seen(), 9);
    }

    #[test]
    fn test_rate_one_admits_everything() {
        let gate = SamplingGate::new(1);
        assert!((0..5).all(|_| gate.admit()));
    }

    #[test]
    fn test_zero_rate_clamped_to_one() {
        let gate = SamplingGate::new(0);
        assert!(gate.admit());
    }

    #[test]
    fn test_counter_shared_across_threads() {
        use std::sync::Arc;

        let gate = Arc::new(SamplingGate::new(3));
        let mut handles = Vec::new();
        for _ in 0..4 {
            let gate = Arc::clone(&gate);
            handles.push(std::thread::spawn(move || {
                (0..75).filter(|_| gate.admit()).count()
            }));
        }
        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        // 300 frames through one global counter admit exactly 100
        assert_eq!(admitted, 100);
        assert_eq!(gate.frames_seen(), 300);
    }
}
