use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

use crate::models::{ScanRequest, ScanResult};

/// Replays completed results for redelivered webhook deliveries. The provider
/// retries with the same delivery id; inside the TTL we return the original
/// result byte-for-byte instead of scanning again.
pub struct DeliveryCache {
    entries: DashMap<String, CachedDelivery>,
    ttl: Duration,
}

struct CachedDelivery {
    request: ScanRequest,
    result: ScanResult,
    completed_at: Instant,
}

impl DeliveryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Look up a previous completion for this delivery. Only an exact match
    /// of the whole request replays; a reused delivery id with different
    /// coordinates is treated as a new scan.
    pub fn get(&self, request: &ScanRequest) -> Option<ScanResult> {
        let entry = self.entries.get(&request.delivery_id)?;
        if entry.completed_at.elapsed() > self.ttl || entry.request != *request {
            return None;
        }
        debug!(delivery_id = %request.delivery_id, "Replaying cached delivery result");
        Some(entry.result.clone())
    }

    pub fn insert(&self, request: &ScanRequest, result: &ScanResult) {
        self.purge_expired();
        self.entries.insert(
            request.delivery_id.clone(),
            CachedDelivery {
                request: request.clone(),
                result: result.clone(),
                completed_at: Instant::now(),
            },
        );
    }

    fn purge_expired(&self) {
        self.entries
            .retain(|_, entry| entry.completed_at.elapsed() <= self.ttl);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
