//! Observability collaborator
//!
//! The crawl engine and pipeline report named metrics, spans and log entries
//! through the [`Observer`] trait. Calls must never block the caller for
//! longer than a short lock.

use std::sync::{Mutex, PoisonError};
use std::time::Instant;

/// Metric names emitted by the crate
pub mod metrics {
    pub const PAGES_FETCHED: &str = "crawl.pages_fetched";
    pub const FETCH_ERRORS: &str = "crawl.fetch_errors";
    pub const RETRIES: &str = "crawl.retries";
    pub const FETCH_DURATION_MS: &str = "crawl.fetch_duration_ms";
    pub const EXTRACTED: &str = "pipeline.extracted";
    pub const EXTRACTION_FAILURES: &str = "pipeline.extraction_failures";
    pub const WORDS: &str = "pipeline.words";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Sink for metrics, spans and log entries
pub trait Observer: Send + Sync {
    fn record_metric(&self, name: &str, value: f64, labels: &[(&str, &str)]);

    /// Starts a span that ends when the returned guard is dropped
    fn start_span(&self, name: &str) -> SpanGuard;

    fn log(&self, level: LogLevel, message: &str);
}

/// Open span; logs its duration when dropped
///
/// The guard does not enter the span, so it can be held across `.await`.
#[derive(Debug)]
pub struct SpanGuard {
    span: tracing::Span,
    name: String,
    started: Instant,
}

impl SpanGuard {
    pub fn new(span: tracing::Span, name: impl Into<String>) -> Self {
        Self {
            span,
            name: name.into(),
            started: Instant::now(),
        }
    }

    /// A guard that records nothing
    pub fn disabled() -> Self {
        Self::new(tracing::Span::none(), "")
    }

    pub fn span(&self) -> &tracing::Span {
        &self.span
    }
}

impl Drop for SpanGuard {
    fn drop(&mut self) {
        if self.span.is_none() {
            return;
        }
        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        self.span.in_scope(|| {
            tracing::debug!(elapsed_ms, "{} finished", self.name);
        });
    }
}

/// Default observer: everything becomes `tracing` events and spans
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn record_metric(&self, name: &str, value: f64, labels: &[(&str, &str)]) {
        tracing::debug!(metric = name, value, labels = ?labels, "metric");
    }

    fn start_span(&self, name: &str) -> SpanGuard {
        SpanGuard::new(tracing::info_span!("stage", name = %name), name)
    }

    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Trace => tracing::trace!("{}", message),
            LogLevel::Debug => tracing::debug!("{}", message),
            LogLevel::Info => tracing::info!("{}", message),
            LogLevel::Warn => tracing::warn!("{}", message),
            LogLevel::Error => tracing::error!("{}", message),
        }
    }
}

/// Observer that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl Observer for NoopObserver {
    fn record_metric(&self, _name: &str, _value: f64, _labels: &[(&str, &str)]) {}

    fn start_span(&self, _name: &str) -> SpanGuard {
        SpanGuard::disabled()
    }

    fn log(&self, _level: LogLevel, _message: &str) {}
}

/// A recorded metric sample
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub name: String,
    pub value: f64,
    pub labels: Vec<(String, String)>,
}

/// Observer that keeps every metric sample in memory
///
/// Log entries and spans are forwarded to `tracing`.
#[derive(Debug, Default)]
pub struct CollectingObserver {
    samples: Mutex<Vec<MetricSample>>,
}

impl CollectingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn samples(&self) -> Vec<MetricSample> {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Sum of all values recorded under `name`
    pub fn total(&self, name: &str) -> f64 {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|s| s.name == name)
            .map(|s| s.value)
            .sum()
    }

    /// Number of samples recorded under `name`
    pub fn count(&self, name: &str) -> usize {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|s| s.name == name)
            .count()
    }
}

impl Observer for CollectingObserver {
    fn record_metric(&self, name: &str, value: f64, labels: &[(&str, &str)]) {
        let sample = MetricSample {
            name: name.to_string(),
            value,
            labels: labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        };
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sample);
    }

    fn start_span(&self, name: &str) -> SpanGuard {
        TracingObserver.start_span(name)
    }

    fn log(&self, level: LogLevel, message: &str) {
        TracingObserver.log(level, message);
    }
}
