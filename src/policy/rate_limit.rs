//! Per-domain request pacing
//!
//! Each domain has a minimum spacing of `1 / rate` seconds between dispatches,
//! plus a random jitter of up to half that spacing so that concurrent workers
//! aimed at one domain do not fire in lockstep. Slots are reserved under a
//! lock: a worker that reserves the next slot learns how long to wait, and the
//! following worker is pushed one spacing further.

use crate::config::DEFAULT_RATE_LIMIT;
use rand::Rng;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Longest spacing between two dispatches to one domain
pub const MAX_SPACING: Duration = Duration::from_secs(3600);

/// Tracks the pacing state of a domain during crawling
#[derive(Debug, Clone, Default)]
pub struct DomainState {
    /// Number of dispatches reserved for this domain
    pub request_count: u32,

    /// Dispatch time of the most recent reservation
    pub last_request_time: Option<Instant>,

    /// Earliest time the next request may be dispatched
    pub next_eligible: Option<Instant>,
}

impl DomainState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves the next dispatch slot and returns the wait before it
    ///
    /// The slot is the later of `now` and the current eligibility time; the
    /// following slot becomes eligible `spacing` after it.
    pub fn reserve(&mut self, now: Instant, spacing: Duration) -> Duration {
        let slot = match self.next_eligible {
            Some(next) if next > now => next,
            _ => now,
        };

        self.request_count += 1;
        self.last_request_time = Some(slot);
        self.next_eligible = Some(slot.checked_add(spacing).unwrap_or(slot));

        slot - now
    }
}

/// Minimum spacing between two dispatches at the given rate, capped at
/// [`MAX_SPACING`]
pub fn spacing_for(rate: f64) -> Duration {
    if !rate.is_finite() || rate <= 0.0 {
        return spacing_for(DEFAULT_RATE_LIMIT);
    }
    Duration::try_from_secs_f64(1.0 / rate)
        .map_or(MAX_SPACING, |spacing| spacing.min(MAX_SPACING))
}

/// Random jitter in `[0, spacing / 2)`
pub fn jitter_for(spacing: Duration) -> Duration {
    let fraction: f64 = rand::rng().random_range(0.0..0.5);
    spacing.mul_f64(fraction)
}

/// Shared per-domain rate limiter for one crawl run
#[derive(Debug)]
pub struct RateLimiter {
    default_rate: RwLock<f64>,
    domain_rates: HashMap<String, f64>,
    jitter: bool,
    domains: Mutex<HashMap<String, DomainState>>,
}

impl RateLimiter {
    /// Creates a limiter with a default rate and per-domain overrides
    pub fn new(default_rate: f64, domain_rates: HashMap<String, f64>) -> Self {
        Self {
            default_rate: RwLock::new(default_rate),
            domain_rates: domain_rates
                .into_iter()
                .map(|(domain, rate)| (domain.to_lowercase(), rate))
                .collect(),
            jitter: true,
            domains: Mutex::new(HashMap::new()),
        }
    }

    /// Disables the random jitter (exact spacing)
    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// Changes the default rate for domains without an override
    ///
    /// Non-finite or non-positive rates fall back to the default rate.
    pub fn set_rate_limit(&self, requests_per_second: f64) {
        let requests_per_second = if requests_per_second.is_finite() && requests_per_second > 0.0 {
            requests_per_second
        } else {
            tracing::debug!(
                "Rate limit {} coerced to {}",
                requests_per_second,
                DEFAULT_RATE_LIMIT
            );
            DEFAULT_RATE_LIMIT
        };

        let mut rate = self
            .default_rate
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *rate = requests_per_second;
    }

    /// Requests per second applied to a domain
    pub fn rate_for(&self, domain: &str) -> f64 {
        self.domain_rates.get(domain).copied().unwrap_or_else(|| {
            *self
                .default_rate
                .read()
                .unwrap_or_else(PoisonError::into_inner)
        })
    }

    /// Reserves the next slot for a domain and returns how long to wait for it
    pub fn reserve(&self, domain: &str, now: Instant) -> Duration {
        let base = spacing_for(self.rate_for(domain));
        let spacing = if self.jitter {
            base + jitter_for(base)
        } else {
            base
        };

        let mut domains = self.domains.lock().unwrap_or_else(PoisonError::into_inner);
        domains
            .entry(domain.to_string())
            .or_insert_with(DomainState::new)
            .reserve(now, spacing)
    }

    /// Waits for this worker's slot on a domain
    ///
    /// Only the calling worker suspends. Returns false if the token was
    /// cancelled before the slot arrived.
    pub async fn acquire(&self, domain: &str, cancel: &CancellationToken) -> bool {
        let wait = self.reserve(domain, Instant::now());
        if wait.is_zero() {
            return !cancel.is_cancelled();
        }

        tracing::trace!("Waiting {:?} before next request to {}", wait, domain);
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(wait) => true,
        }
    }

    /// Number of dispatches reserved for a domain so far
    pub fn request_count(&self, domain: &str) -> u32 {
        let domains = self.domains.lock().unwrap_or_else(PoisonError::into_inner);
        domains.get(domain).map_or(0, |state| state.request_count)
    }
}
