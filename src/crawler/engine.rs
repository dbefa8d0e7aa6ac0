//! Streaming crawl engine
//!
//! A dispatcher task owns the frontier and spawns one worker per target into
//! a `JoinSet`. Workers pass through robots exclusion, the per-domain
//! concurrency slot and the rate limiter before every request, and report
//! fetched pages and terminal failures on two unbounded channels. Both
//! channels close once the dispatcher and every worker have finished, or
//! promptly after cancellation.

use crate::config::{coerce_defaults, ScraperConfig};
use crate::crawler::fetcher::{fetch_page, ClientPool, FetchOutcome};
use crate::crawler::parser::extract_links;
use crate::crawler::{CrawlTarget, FetchError, FetchErrorKind, RawPage};
use crate::extractor::is_markup_content_type;
use crate::observe::{metrics, Observer};
use crate::policy::{RateLimiter, RetryPolicy, RetryState, TRANSPORT_FAILURE};
use crate::robots::{fetch_robots, is_path_disallowed, RobotsCache};
use crate::url::{dedupe_key, extract_domain, parse_target, robots_txt_url, UrlFilter};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Output of one crawl run
///
/// Both receivers yield `None` once the run is over.
#[derive(Debug)]
pub struct CrawlStreams {
    pub pages: mpsc::UnboundedReceiver<RawPage>,
    pub errors: mpsc::UnboundedReceiver<FetchError>,
    /// The dispatcher task; completes after every worker has stopped
    pub dispatcher: JoinHandle<()>,
}

/// Crawl engine for one scraper configuration
///
/// Cloning is cheap; clones share the rate limiter, proxy counter and robots
/// cache.
#[derive(Clone)]
pub struct CrawlEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    config: ScraperConfig,
    clients: ClientPool,
    limiter: RateLimiter,
    retry: RetryPolicy,
    robots: RobotsCache,
    filter: UrlFilter,
    observer: Arc<dyn Observer>,
    domain_slots: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl std::fmt::Debug for CrawlEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrawlEngine")
            .field("scraper", &self.inner.config.name)
            .finish_non_exhaustive()
    }
}

impl CrawlEngine {
    /// Builds an engine from a scraper configuration
    ///
    /// Invalid rate, concurrency and user agent values are coerced to their
    /// defaults. Invalid URL patterns and proxy URLs are errors.
    pub fn new(config: &ScraperConfig, observer: Arc<dyn Observer>) -> crate::Result<Self> {
        let mut config = config.clone();
        coerce_defaults(&mut config);

        let filter = UrlFilter::from_config(&config)?;
        let clients = ClientPool::from_config(&config)?;
        let limiter = RateLimiter::new(config.rate_limit, config.rate_limit_rules.clone());
        let retry = RetryPolicy::new(config.retry_count, Duration::from_millis(config.retry_delay_ms));

        Ok(Self {
            inner: Arc::new(EngineInner {
                config,
                clients,
                limiter,
                retry,
                robots: RobotsCache::new(),
                filter,
                observer,
                domain_slots: Mutex::new(HashMap::new()),
            }),
        })
    }

    /// The effective (coerced) configuration
    pub fn config(&self) -> &ScraperConfig {
        &self.inner.config
    }

    /// Changes the default requests per second for subsequent dispatches
    pub fn set_rate_limit(&self, requests_per_second: f64) {
        self.inner.limiter.set_rate_limit(requests_per_second);
    }

    /// Crawls the scraper's own seed URLs
    pub fn crawl(&self, cancel: CancellationToken) -> CrawlStreams {
        self.scrape(self.inner.config.seed_urls(), cancel)
    }

    /// Starts crawling `urls` and returns the result channels
    ///
    /// Every seed is dispatched even if it repeats another seed. Followed
    /// links are de-duplicated against everything seen in this run.
    pub fn scrape(&self, urls: Vec<String>, cancel: CancellationToken) -> CrawlStreams {
        let (page_tx, pages) = mpsc::unbounded_channel();
        let (error_tx, errors) = mpsc::unbounded_channel();

        let inner = Arc::clone(&self.inner);
        let dispatcher = tokio::spawn(async move {
            inner.dispatch(urls, cancel, page_tx, error_tx).await;
        });

        CrawlStreams {
            pages,
            errors,
            dispatcher,
        }
    }
}

impl EngineInner {
    async fn dispatch(
        self: Arc<Self>,
        urls: Vec<String>,
        cancel: CancellationToken,
        page_tx: mpsc::UnboundedSender<RawPage>,
        error_tx: mpsc::UnboundedSender<FetchError>,
    ) {
        tracing::info!(
            "Starting crawl '{}' with {} seed(s), max depth {}",
            self.config.name,
            urls.len(),
            self.config.max_depth
        );

        let mut seen = HashSet::new();
        let mut frontier = VecDeque::new();

        for raw in &urls {
            if let Some(target) = self.admit_seed(raw, &cancel, &error_tx) {
                seen.insert(dedupe_key(&target.url));
                frontier.push_back(target);
            }
        }

        let mut tasks = JoinSet::new();
        let mut dispatched = 0usize;

        loop {
            while let Some(target) = frontier.pop_front() {
                if cancel.is_cancelled() {
                    break;
                }
                dispatched += 1;
                tasks.spawn(Arc::clone(&self).run_target(
                    target,
                    cancel.clone(),
                    page_tx.clone(),
                    error_tx.clone(),
                ));
            }

            if cancel.is_cancelled() {
                break;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                joined = tasks.join_next() => match joined {
                    None => break,
                    Some(Ok(links)) => {
                        for link in links {
                            if self.admit_link(&link, &mut seen) {
                                frontier.push_back(link);
                            }
                        }
                    }
                    Some(Err(e)) => {
                        if e.is_panic() {
                            tracing::error!("Crawl worker panicked: {}", e);
                        }
                    }
                },
            }
        }

        if cancel.is_cancelled() {
            tracing::info!(
                "Crawl '{}' cancelled; abandoning {} in-flight target(s)",
                self.config.name,
                tasks.len()
            );
        }
        tasks.shutdown().await;

        tracing::info!(
            "Crawl '{}' finished after dispatching {} target(s)",
            self.config.name,
            dispatched
        );
    }

    /// Parses and filters a seed URL
    ///
    /// Invalid URLs and seeds outside the allowed domains produce a fetch
    /// error; allow/deny pattern misses are dropped silently.
    fn admit_seed(
        &self,
        raw: &str,
        cancel: &CancellationToken,
        error_tx: &mpsc::UnboundedSender<FetchError>,
    ) -> Option<CrawlTarget> {
        let url = match parse_target(raw) {
            Ok(url) => url,
            Err(e) => {
                self.emit_error(
                    cancel,
                    error_tx,
                    FetchError::rejected(raw, FetchErrorKind::InvalidUrl(e.to_string())),
                );
                return None;
            }
        };

        if !self.filter.admits(url.as_str()) {
            tracing::debug!("Skipping {} (URL pattern filter)", url);
            return None;
        }

        let domain = extract_domain(&url).unwrap_or_default();
        if !self.filter.domain_allowed(&domain) {
            self.emit_error(
                cancel,
                error_tx,
                FetchError::rejected(url.as_str(), FetchErrorKind::DomainNotAllowed { domain }),
            );
            return None;
        }

        Some(CrawlTarget::seed(url))
    }

    /// Decides whether a discovered link joins the frontier
    fn admit_link(&self, target: &CrawlTarget, seen: &mut HashSet<String>) -> bool {
        if target.depth > self.config.max_depth {
            return false;
        }

        if !self.filter.admits(target.url.as_str()) {
            tracing::debug!("Skipping {} (URL pattern filter)", target.url);
            return false;
        }

        match extract_domain(&target.url) {
            Some(domain) if self.filter.domain_allowed(&domain) => {}
            _ => return false,
        }

        seen.insert(dedupe_key(&target.url))
    }

    /// Fetches one target and returns the links it contributes to the frontier
    async fn run_target(
        self: Arc<Self>,
        target: CrawlTarget,
        cancel: CancellationToken,
        page_tx: mpsc::UnboundedSender<RawPage>,
        error_tx: mpsc::UnboundedSender<FetchError>,
    ) -> Vec<CrawlTarget> {
        let url = target.url.to_string();
        let _span = self.observer.start_span("fetch");

        let Some(domain) = extract_domain(&target.url) else {
            self.emit_error(
                &cancel,
                &error_tx,
                FetchError::rejected(url, FetchErrorKind::InvalidUrl("missing host".to_string())),
            );
            return Vec::new();
        };

        if self.config.respect_robots_txt {
            let allowed = tokio::select! {
                _ = cancel.cancelled() => return Vec::new(),
                allowed = self.robots_allow(&target.url, &domain) => allowed,
            };
            if !allowed {
                tracing::debug!("Robots.txt disallows {}", url);
                self.emit_error(
                    &cancel,
                    &error_tx,
                    FetchError::rejected(url, FetchErrorKind::RobotsDisallowed),
                );
                return Vec::new();
            }
        }

        let slot = self.domain_slot(&domain);
        let _permit = tokio::select! {
            _ = cancel.cancelled() => return Vec::new(),
            permit = slot.acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => return Vec::new(),
            },
        };

        let mut state = RetryState::new(domain.as_str());

        loop {
            if !self.limiter.acquire(&domain, &cancel).await || cancel.is_cancelled() {
                return Vec::new();
            }

            state.record_attempt();
            let client = self.clients.next_client();
            let started = Instant::now();

            tracing::debug!("Fetching {} (attempt {})", url, state.attempts);
            let outcome = tokio::select! {
                _ = cancel.cancelled() => return Vec::new(),
                outcome = fetch_page(client, &target.url) => outcome,
            };

            self.observer.record_metric(
                metrics::FETCH_DURATION_MS,
                started.elapsed().as_secs_f64() * 1000.0,
                &[("domain", domain.as_str())],
            );

            match outcome {
                FetchOutcome::Fetched(page) => {
                    let links = if target.depth < self.config.max_depth
                        && is_markup_content_type(&page.content_type)
                    {
                        extract_links(&page.body, &target.url)
                    } else {
                        Vec::new()
                    };

                    if cancel.is_cancelled() {
                        return Vec::new();
                    }

                    tracing::debug!(
                        "Fetched {} (HTTP {}, {} bytes, {} link(s))",
                        url,
                        page.status,
                        page.body.len(),
                        links.len()
                    );
                    self.observer.record_metric(
                        metrics::PAGES_FETCHED,
                        1.0,
                        &[("domain", domain.as_str())],
                    );
                    let _ = page_tx.send(page);

                    return links
                        .into_iter()
                        .map(|link| CrawlTarget::child(link, target.depth))
                        .collect();
                }
                FetchOutcome::Retryable { status, reason } => {
                    if self.retry.should_retry(&state, status) {
                        let delay = state.schedule_retry(&self.retry, Instant::now());
                        tracing::warn!(
                            "Retrying {} in {:?} after {} (attempt {} of {})",
                            url,
                            delay,
                            reason,
                            state.attempts,
                            self.retry.max_retries + 1
                        );
                        self.observer.record_metric(
                            metrics::RETRIES,
                            1.0,
                            &[("domain", domain.as_str())],
                        );

                        tokio::select! {
                            _ = cancel.cancelled() => return Vec::new(),
                            _ = tokio::time::sleep(delay) => {}
                        }
                        continue;
                    }

                    let kind = if status == TRANSPORT_FAILURE {
                        FetchErrorKind::Transport(reason)
                    } else {
                        FetchErrorKind::HttpStatus(status)
                    };
                    self.emit_error(&cancel, &error_tx, FetchError::new(url, kind, state.attempts));
                    return Vec::new();
                }
                FetchOutcome::Rejected { status } => {
                    self.emit_error(
                        &cancel,
                        &error_tx,
                        FetchError::new(url, FetchErrorKind::HttpStatus(status), state.attempts),
                    );
                    return Vec::new();
                }
            }
        }
    }

    /// Robots exclusion for one target
    ///
    /// Configured `disallowed-paths` are checked first and reject without any
    /// network I/O; robots.txt is consulted only for targets they allow.
    async fn robots_allow(&self, url: &Url, domain: &str) -> bool {
        if is_path_disallowed(&self.config.disallowed_paths, url.path()) {
            return false;
        }

        if !self.config.fetch_robots_txt {
            return true;
        }

        let Some(robots_url) = robots_txt_url(url) else {
            return true;
        };

        let client = self.clients.next_client();
        let user_agent = self.config.user_agent.as_str();

        self.robots
            .get_or_load(domain, move || async move {
                fetch_robots(client, &robots_url, user_agent).await
            })
            .await
            .is_allowed(url.as_str())
    }

    fn domain_slot(&self, domain: &str) -> Arc<Semaphore> {
        let mut slots = self
            .domain_slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let permits = usize::try_from(self.config.concurrency.max(1)).unwrap_or(1);
        Arc::clone(
            slots
                .entry(domain.to_string())
                .or_insert_with(|| Arc::new(Semaphore::new(permits))),
        )
    }

    fn emit_error(
        &self,
        cancel: &CancellationToken,
        error_tx: &mpsc::UnboundedSender<FetchError>,
        error: FetchError,
    ) {
        if cancel.is_cancelled() {
            return;
        }

        if error.kind.is_policy_rejection() {
            tracing::debug!("{}", error);
        } else {
            tracing::warn!("{}", error);
        }
        self.observer
            .record_metric(metrics::FETCH_ERRORS, 1.0, &[("kind", error.kind.label())]);
        let _ = error_tx.send(error);
    }
}
