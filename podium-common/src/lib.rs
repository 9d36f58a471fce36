//! # Podium Common Library
//!
//! Shared code for the Podium real-time coaching services including:
//! - Error taxonomy
//! - Metric snapshot types (analyzer output shapes)
//! - Score, trend, suggestion and feedback message types
//! - Streaming wire protocol messages
//! - Timestamp utilities

pub mod error;
pub mod feedback;
pub mod metrics;
pub mod protocol;
pub mod time;

pub use error::{Error, Result};
pub use feedback::{FeedbackMessage, ScoreSet, Suggestion, TrendDelta};
