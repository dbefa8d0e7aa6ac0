use crate::{UrlError, UrlResult};
use url::Url;

/// Query parameters that never change page content
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid", "ref", "source"];

/// Parses a crawl target URL
///
/// Only absolute HTTP(S) URLs with a host are crawlable.
///
/// # Examples
///
/// ```
/// use scrape_pipeline::url::parse_target;
///
/// assert!(parse_target("https://example.com/page").is_ok());
/// assert!(parse_target("mailto:someone@example.com").is_err());
/// ```
pub fn parse_target(url_str: &str) -> UrlResult<Url> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    Ok(url)
}

/// Builds the key under which a URL is de-duplicated during link following
///
/// The key lowercases the host, drops the fragment and tracking parameters,
/// sorts the remaining query, collapses dot segments and repeated slashes, and
/// removes a trailing slash (except on the root). The key is never fetched.
///
/// # Examples
///
/// ```
/// use scrape_pipeline::url::dedupe_key;
/// use url::Url;
///
/// let a = Url::parse("https://Example.com/docs/?b=2&a=1#intro").unwrap();
/// let b = Url::parse("https://example.com/docs?a=1&b=2&utm_source=x").unwrap();
/// assert_eq!(dedupe_key(&a), dedupe_key(&b));
/// ```
pub fn dedupe_key(url: &Url) -> String {
    let mut key = url.clone();
    key.set_fragment(None);
    key.set_path(&normalize_path(url.path()));

    if url.query().is_some() {
        let params = filter_and_sort_query_params(url);
        if params.is_empty() {
            key.set_query(None);
        } else {
            let query = params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("&");
            key.set_query(Some(&query));
        }
    }

    key.to_string()
}

/// Removes dot segments, empty segments and the trailing slash
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort();
    params
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}
