//! Pipeline glue between the crawl engine and content extraction
//!
//! Every fetched page is handed to the extractor, and every result, whether
//! content, an extraction failure or a fetch failure, is forwarded to the
//! downstream [`Normalizer`]. The pipeline drains both engine channels until
//! they close, so the downstream sees a complete accounting of the run.

mod runner;

pub use runner::run_scrapers;

use crate::crawler::{CrawlStreams, FetchError};
use crate::extractor::{ExtractError, ExtractedContent, Extractor};
use crate::observe::{metrics, LogLevel, Observer};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

/// What happened to one page or target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionOutcome {
    Extracted(ExtractedContent),
    ExtractionFailed { url: String, error: ExtractError },
    FetchFailed(FetchError),
}

impl ExtractionOutcome {
    pub fn url(&self) -> &str {
        match self {
            Self::Extracted(content) => &content.url,
            Self::ExtractionFailed { url, .. } => url,
            Self::FetchFailed(error) => &error.url,
        }
    }
}

/// Downstream consumer of extraction outcomes
pub trait Normalizer: Send + Sync {
    fn accept(&self, outcome: ExtractionOutcome);
}

/// Counters for one pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    pub scraper: String,
    /// Pages received from the engine
    pub pages: usize,
    pub extracted: usize,
    pub extraction_failures: usize,
    pub fetch_failures: usize,
    /// Words across all extracted bodies
    pub words: usize,
    /// Fetch failures keyed by kind label
    pub failures_by_kind: BTreeMap<String, usize>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub cancelled: bool,
}

impl PipelineReport {
    pub fn new(scraper: impl Into<String>) -> Self {
        Self {
            scraper: scraper.into(),
            pages: 0,
            extracted: 0,
            extraction_failures: 0,
            fetch_failures: 0,
            words: 0,
            failures_by_kind: BTreeMap::new(),
            started_at: Utc::now(),
            finished_at: None,
            cancelled: false,
        }
    }

    /// Records handed downstream
    pub fn total_records(&self) -> usize {
        self.pages + self.fetch_failures
    }

    pub fn duration(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|end| end - self.started_at)
    }
}

/// Connects engine output to an extractor and a downstream normalizer
#[derive(Clone)]
pub struct Pipeline {
    extractor: Arc<dyn Extractor>,
    normalizer: Arc<dyn Normalizer>,
    observer: Arc<dyn Observer>,
}

impl Pipeline {
    pub fn new(
        extractor: Arc<dyn Extractor>,
        normalizer: Arc<dyn Normalizer>,
        observer: Arc<dyn Observer>,
    ) -> Self {
        Self {
            extractor,
            normalizer,
            observer,
        }
    }

    /// Consumes a crawl run to completion
    pub async fn run(&self, scraper: &str, streams: CrawlStreams) -> PipelineReport {
        let CrawlStreams {
            mut pages,
            mut errors,
            dispatcher,
        } = streams;

        let _span = self.observer.start_span("pipeline");
        let mut report = PipelineReport::new(scraper);
        let mut pages_open = true;
        let mut errors_open = true;

        loop {
            tokio::select! {
                page = pages.recv(), if pages_open => match page {
                    Some(page) => {
                        report.pages += 1;
                        let outcome = match self.extractor.extract(&page) {
                            Ok(content) => {
                                report.extracted += 1;
                                report.words += content.word_count;
                                self.observer.record_metric(metrics::EXTRACTED, 1.0, &[("scraper", scraper)]);
                                self.observer.record_metric(
                                    metrics::WORDS,
                                    content.word_count as f64,
                                    &[("scraper", scraper)],
                                );
                                ExtractionOutcome::Extracted(content)
                            }
                            Err(error) => {
                                report.extraction_failures += 1;
                                self.observer
                                    .log(LogLevel::Warn, &format!("Extraction failed: {}", error));
                                self.observer.record_metric(
                                    metrics::EXTRACTION_FAILURES,
                                    1.0,
                                    &[("scraper", scraper)],
                                );
                                ExtractionOutcome::ExtractionFailed {
                                    url: page.url.clone(),
                                    error,
                                }
                            }
                        };
                        self.normalizer.accept(outcome);
                    }
                    None => pages_open = false,
                },
                error = errors.recv(), if errors_open => match error {
                    Some(error) => {
                        report.fetch_failures += 1;
                        *report
                            .failures_by_kind
                            .entry(error.kind.label().to_string())
                            .or_insert(0) += 1;
                        self.normalizer.accept(ExtractionOutcome::FetchFailed(error));
                    }
                    None => errors_open = false,
                },
                else => break,
            }
        }

        if let Err(e) = dispatcher.await {
            tracing::error!("Crawl dispatcher for '{}' failed: {}", scraper, e);
        }

        report.finished_at = Some(Utc::now());
        tracing::info!(
            "Pipeline '{}' done: {} page(s), {} extracted, {} extraction failure(s), {} fetch failure(s)",
            scraper,
            report.pages,
            report.extracted,
            report.extraction_failures,
            report.fetch_failures
        );
        report
    }
}
