use url::Url;

/// Extracts the domain from a URL
///
/// The lowercase host is the key for rate limiting, concurrency slots and
/// robots rules. Ports are not part of the domain.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use scrape_pipeline::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM:8080/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns the robots.txt location for the origin of a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use scrape_pipeline::url::robots_txt_url;
///
/// let url = Url::parse("http://127.0.0.1:4000/docs/page?x=1").unwrap();
/// assert_eq!(robots_txt_url(&url).unwrap().as_str(), "http://127.0.0.1:4000/robots.txt");
/// ```
pub fn robots_txt_url(url: &Url) -> Option<Url> {
    let mut robots = url.clone();
    robots.set_query(None);
    robots.set_fragment(None);
    robots.set_path("/robots.txt");
    robots.host_str()?;
    Some(robots)
}
