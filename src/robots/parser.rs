//! Robots.txt parser implementation
//!
//! Fetched robots.txt bodies are matched with the robotstxt crate. Statically
//! configured `disallowed-paths` are a separate plain prefix check that never
//! needs the network.

use robotstxt::DefaultMatcher;

/// Robots.txt rules fetched for one domain
///
/// The raw body is kept and matched on demand; an empty body allows
/// everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RobotsRules {
    /// Raw robots.txt content
    content: String,
    /// Product token of our user agent, e.g. "Scrape-Pipeline"
    agent: String,
}

impl RobotsRules {
    /// Rules that allow every path
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Keeps robots.txt content for matching as `user_agent`
    pub fn from_content(content: &str, user_agent: &str) -> Self {
        Self {
            content: content.to_string(),
            agent: agent_token(user_agent).to_string(),
        }
    }

    /// Checks a URL or path against the robots.txt groups for our agent
    ///
    /// A group naming our agent wins over `*`, and the longest matching
    /// `Allow`/`Disallow` rule decides.
    pub fn is_allowed(&self, url: &str) -> bool {
        if self.content.trim().is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, &self.agent, url)
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// The part of a user agent robots.txt groups are matched against
///
/// Robots.txt names crawlers by product token only, so "Scrape-Pipeline/1.0"
/// matches a `User-agent: scrape-pipeline` group.
///
/// # Examples
///
/// ```
/// use scrape_pipeline::robots::agent_token;
///
/// assert_eq!(agent_token("Scrape-Pipeline/1.0 (+https://example.com)"), "Scrape-Pipeline");
/// ```
pub fn agent_token(user_agent: &str) -> &str {
    let trimmed = user_agent.trim();
    let end = trimmed
        .find(|c: char| !(c.is_ascii_alphabetic() || c == '-' || c == '_'))
        .unwrap_or(trimmed.len());
    &trimmed[..end]
}

/// Checks a path against statically configured disallowed prefixes
pub fn is_path_disallowed(prefixes: &[String], path: &str) -> bool {
    prefixes
        .iter()
        .any(|prefix| !prefix.is_empty() && path.starts_with(prefix.as_str()))
}
