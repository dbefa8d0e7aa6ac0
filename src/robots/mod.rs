//! Robots.txt handling module
//!
//! This module fetches and caches robots.txt per domain and matches targets
//! against it. Statically configured prefixes are checked separately, before
//! anything is fetched.

mod cache;
mod parser;

pub use cache::{CachedRobots, RobotsCache};
pub use parser::{agent_token, is_path_disallowed, RobotsRules};

use reqwest::Client;
use url::Url;

/// Fetches and parses robots.txt from `robots_url`
///
/// Any failure (transport error, non-success status, unreadable body) yields
/// allow-all rules; robots.txt problems never fail a crawl.
pub async fn fetch_robots(client: &Client, robots_url: &Url, user_agent: &str) -> RobotsRules {
    let response = match client.get(robots_url.clone()).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!("Failed to fetch {}: {}", robots_url, e);
            return RobotsRules::allow_all();
        }
    };

    if !response.status().is_success() {
        tracing::debug!(
            "No robots.txt at {} (HTTP {})",
            robots_url,
            response.status().as_u16()
        );
        return RobotsRules::allow_all();
    }

    match response.text().await {
        Ok(body) => {
            let rules = RobotsRules::from_content(&body, user_agent);
            tracing::debug!("Loaded robots.txt from {} ({} bytes)", robots_url, body.len());
            rules
        }
        Err(e) => {
            tracing::debug!("Failed to read {}: {}", robots_url, e);
            RobotsRules::allow_all()
        }
    }
}
