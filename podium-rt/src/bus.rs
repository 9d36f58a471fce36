//! Pub/sub and short-TTL cache side-channel
//!
//! Every feedback cycle is published on a per-session topic and
//! per-chunk metrics are cached under TTL'd keys for out-of-band
//! observers. The orchestrator's correctness never depends on reading
//! these back, so every operation here is best-effort: callers log
//! failures at warn and move on. A networked substrate would implement
//! the same trait; the in-process bus below is the documented fallback.

use async_trait::async_trait;
use podium_common::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::debug;

/// Topic prefix for per-session feedback publication
pub const FEEDBACK_TOPIC_PREFIX: &str = "feedback_channel:";

/// Best-effort publish/cache interface
#[async_trait]
pub trait FeedbackBus: Send + Sync {
    /// Broadcast a payload to all subscribers of `topic`
    async fn publish(&self, topic: &str, payload: &Value) -> Result<()>;

    /// Store a payload under `key`, expiring after `ttl`
    async fn cache_set(&self, key: &str, payload: &Value, ttl: Duration) -> Result<()>;

    /// Drop a cached payload
    async fn cache_delete(&self, key: &str) -> Result<()>;
}

/// One published bus message
#[derive(Debug, Clone)]
pub struct BusEvent {
    pub topic: String,
    pub payload: Value,
}

/// In-process bus backed by a broadcast channel and an expiring map
pub struct MemoryBus {
    tx: broadcast::Sender<BusEvent>,
    cache: Mutex<HashMap<String, (Value, Instant)>>,
}

impl MemoryBus {
    /// Create a bus buffering up to `capacity` undelivered events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Subscribe to every published event (all topics)
    pub fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.tx.subscribe()
    }

    /// Read back a cached payload if it has not expired
    pub fn cache_get(&self, key: &str) -> Option<Value> {
        let mut cache = self.cache.lock().expect("bus cache poisoned");
        match cache.get(key) {
            Some((_, expires)) if *expires <= Instant::now() => {
                cache.remove(key);
                None
            }
            Some((value, _)) => Some(value.clone()),
            None => None,
        }
    }
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new(100)
    }
}

#[async_trait]
impl FeedbackBus for MemoryBus {
    async fn publish(&self, topic: &str, payload: &Value) -> Result<()> {
        // No subscribers is not a failure
        let receivers = self
            .tx
            .send(BusEvent { topic: topic.to_string(), payload: payload.clone() })
            .unwrap_or(0);
        debug!("published to {} ({} subscribers)", topic, receivers);
        Ok(())
    }

    async fn cache_set(&self, key: &str, payload: &Value, ttl: Duration) -> Result<()> {
        let mut cache = self.cache.lock().expect("bus cache poisoned");
        let now = Instant::now();
        // Opportunistic expiry sweep keeps the map bounded
        cache.retain(|_, (_, expires)| *expires > now);
        cache.insert(key.to_string(), (payload.clone(), now + ttl));
        Ok(())
    }

    async fn cache_delete(&self, key: &str) -> Result<()> {
        self.cache.lock().expect("bus cache poisoned").remove(key);
        Ok(())
    }
}

/// Disabled side-channel; every operation is a no-op
#[derive(Debug, Default)]
pub struct NullBus;

#[async_trait]
impl FeedbackBus for NullBus {
    async fn publish(&self, _topic: &str, _payload: &Value) -> Result<()> {
        Ok(())
    }

    async fn cache_set(&self, _key: &str, _payload: &Value, _ttl: Duration) -> Result<()> {
        Ok(())
    }

    async fn cache_delete(&self, _key: &str) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let bus = MemoryBus::new(8);
        let mut rx = bus.subscribe();

        bus.publish("feedback_channel:s1", &json!({"scores": {}}))
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.topic, "feedback_channel:s1");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let bus = MemoryBus::new(8);
        assert!(bus.publish("feedback_channel:s1", &json!(1)).await.is_ok());
    }

    #[tokio::test]
    async fn test_cache_expiry() {
        let bus = MemoryBus::new(8);
        bus.cache_set("k", &json!(42), Duration::from_millis(20)).await.unwrap();
        assert_eq!(bus.cache_get("k"), Some(json!(42)));

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(bus.cache_get("k"), None);
    }

    #[tokio::test]
    async fn test_cache_delete() {
        let bus = MemoryBus::new(8);
        bus.cache_set("k", &json!(1), Duration::from_secs(60)).await.unwrap();
        bus.cache_delete("k").await.unwrap();
        assert_eq!(bus.cache_get("k"), None);
    }
}
