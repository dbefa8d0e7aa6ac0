//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with the scraper's user agent, timeout and proxy
//! - Round-robin client selection across configured proxies
//! - Classifying responses into pages, retryable failures and rejections

use crate::config::ScraperConfig;
use crate::crawler::RawPage;
use crate::policy::{ProxyRotator, RetryPolicy, TRANSPORT_FAILURE};
use chrono::Utc;
use reqwest::{Client, Proxy};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Result of a single HTTP attempt
#[derive(Debug)]
pub enum FetchOutcome {
    /// 2xx response with a readable body
    Fetched(RawPage),

    /// Transport failure (status 0), server error or 429
    Retryable {
        /// HTTP status code, or 0 when no response arrived
        status: u16,
        /// Error description
        reason: String,
    },

    /// Any other non-success status
    Rejected { status: u16 },
}

/// Builds an HTTP client for one scraper, optionally routed through a proxy
///
/// # Example
///
/// ```no_run
/// use scrape_pipeline::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client("Scrape-Pipeline/1.0", Duration::from_secs(30), None).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &str,
    timeout: Duration,
    proxy: Option<&str>,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = proxy {
        builder = builder.proxy(Proxy::all(proxy)?);
    }

    builder.build()
}

/// HTTP clients for one crawl run
///
/// With no proxies every request uses the direct client. Otherwise each
/// request takes the next proxied client in round-robin order.
#[derive(Debug)]
pub struct ClientPool {
    direct: Client,
    proxied: Vec<Client>,
    rotator: ProxyRotator,
}

impl ClientPool {
    pub fn from_config(config: &ScraperConfig) -> Result<Self, reqwest::Error> {
        let timeout = Duration::from_secs(config.timeout_secs.max(1));
        let direct = build_http_client(&config.user_agent, timeout, None)?;
        let proxied = config
            .proxy_urls
            .iter()
            .map(|proxy| build_http_client(&config.user_agent, timeout, Some(proxy)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            direct,
            proxied,
            rotator: ProxyRotator::new(config.proxy_urls.clone()),
        })
    }

    /// Client for the next outbound request
    pub fn next_client(&self) -> &Client {
        match self.rotator.next_index() {
            Some(i) => &self.proxied[i],
            None => &self.direct,
        }
    }

    pub fn proxy_count(&self) -> usize {
        self.proxied.len()
    }
}

/// Performs one GET request and classifies the result
pub async fn fetch_page(client: &Client, url: &Url) -> FetchOutcome {
    let response = match client.get(url.clone()).send().await {
        Ok(response) => response,
        Err(e) => {
            let reason = if e.is_timeout() {
                "request timeout".to_string()
            } else if e.is_connect() {
                format!("connection failed: {}", e)
            } else {
                e.to_string()
            };
            return FetchOutcome::Retryable {
                status: TRANSPORT_FAILURE,
                reason,
            };
        }
    };

    let status = response.status().as_u16();

    if !response.status().is_success() {
        if RetryPolicy::is_retryable_status(status) {
            return FetchOutcome::Retryable {
                status,
                reason: format!("HTTP {}", status),
            };
        }
        return FetchOutcome::Rejected { status };
    }

    let headers: HashMap<String, String> = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    let content_type = headers.get("content-type").cloned().unwrap_or_default();

    match response.text().await {
        Ok(body) => FetchOutcome::Fetched(RawPage {
            url: url.to_string(),
            body,
            status,
            content_type,
            headers,
            fetched_at: Utc::now(),
        }),
        Err(e) => FetchOutcome::Retryable {
            status: TRANSPORT_FAILURE,
            reason: format!("failed to read body: {}", e),
        },
    }
}
