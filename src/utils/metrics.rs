use lazy_static::lazy_static;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Process-wide counter registry, exposed on `GET /metrics`.
#[derive(Clone, Default)]
pub struct MetricsRegistry {
    counters: Arc<Mutex<HashMap<&'static str, u64>>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self, name: &'static str) {
        let mut counters = self.counters.lock();
        *counters.entry(name).or_insert(0) += 1;
    }

    pub fn get(&self, name: &'static str) -> u64 {
        self.counters.lock().get(name).copied().unwrap_or(0)
    }

    pub fn snapshot(&self) -> HashMap<&'static str, u64> {
        self.counters.lock().clone()
    }
}

lazy_static! {
    pub static ref METRICS: MetricsRegistry = MetricsRegistry::new();
}

/// Counter names used across the node.
pub mod counters {
    pub const VOTES_ACCEPTED: &str = "votes_accepted";
    pub const PRE_PREPARES_RECEIVED: &str = "pre_prepares_received";
    pub const PREPARES_RECEIVED: &str = "prepares_received";
    pub const COMMITS_RECEIVED: &str = "commits_received";
    pub const BLOCKS_COMMITTED: &str = "blocks_committed";
    pub const STALE_ENDORSEMENTS: &str = "stale_endorsements";
    pub const BROADCAST_FAILURES: &str = "broadcast_failures";
}
