//! Robots.txt caching implementation
//!
//! Rules are kept per domain for the lifetime of a crawl run and expire after
//! 24 hours.

use crate::robots::RobotsRules;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;

/// Cached robots rules for a domain
#[derive(Debug, Clone)]
pub struct CachedRobots {
    pub rules: RobotsRules,

    /// When the robots.txt was fetched
    pub fetched_at: DateTime<Utc>,
}

impl CachedRobots {
    pub fn new(rules: RobotsRules) -> Self {
        Self {
            rules,
            fetched_at: Utc::now(),
        }
    }

    /// Checks if the cached rules are older than 24 hours
    pub fn is_stale(&self) -> bool {
        self.age() > Duration::hours(24)
    }

    pub fn age(&self) -> Duration {
        Utc::now() - self.fetched_at
    }

    pub fn is_allowed(&self, url: &str) -> bool {
        self.rules.is_allowed(url)
    }
}

type RobotsSlot = Arc<OnceCell<CachedRobots>>;

/// Per-domain robots cache shared by the workers of one run
///
/// Each domain has its own once-cell: workers racing for the same domain
/// wait for a single fetch, while other domains are never blocked by it.
#[derive(Debug, Default)]
pub struct RobotsCache {
    slots: Mutex<HashMap<String, RobotsSlot>>,
}

impl RobotsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached rules for a domain, loading them with `load` if
    /// missing or stale
    pub async fn get_or_load<F, Fut>(&self, domain: &str, load: F) -> RobotsRules
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RobotsRules>,
    {
        let slot = self.slot(domain);
        let cached = slot
            .get_or_init(|| async move { CachedRobots::new(load().await) })
            .await;
        cached.rules.clone()
    }

    /// The domain's cell, replaced by an empty one once its rules are stale
    fn slot(&self, domain: &str) -> RobotsSlot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = slots.entry(domain.to_string()).or_default();
        if slot.get().is_some_and(CachedRobots::is_stale) {
            tracing::debug!("Cached robots.txt for {} is stale", domain);
            *slot = RobotsSlot::default();
        }
        Arc::clone(slot)
    }

    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
