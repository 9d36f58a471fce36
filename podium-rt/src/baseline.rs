//! User baseline collaborator
//!
//! Historical calibration baselines live in external storage. The store
//! is consulted exactly once per session, at start; the result is cached
//! on the session for its whole life and never refreshed.

use async_trait::async_trait;
use podium_common::metrics::Baseline;
use podium_common::Result;

/// Fetches the calibration baseline for a user, if one exists
#[async_trait]
pub trait BaselineStore: Send + Sync {
    async fn fetch(&self, user_id: &str) -> Result<Option<Baseline>>;
}

/// Store used until the historical-database integration lands; every
/// user is treated as uncalibrated
#[derive(Debug, Default)]
pub struct NoBaselineStore;

#[async_trait]
impl BaselineStore for NoBaselineStore {
    async fn fetch(&self, _user_id: &str) -> Result<Option<Baseline>> {
        Ok(None)
    }
}
