//! podium-rt — real-time coaching feedback service
//!
//! Session-scoped orchestration between external perception engines and
//! connected clients: ingestion with load-shedding, score fusion, trend
//! tracking, suggestion generation and the bidirectional streaming
//! protocol that ties them together.

pub mod analyzers;
pub mod api;
pub mod baseline;
pub mod bus;
pub mod config;
pub mod engine;
pub mod sampling;
pub mod scoring;
pub mod session;
pub mod suggestions;

pub use config::Config;
pub use engine::FeedbackEngine;
