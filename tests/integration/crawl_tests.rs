use crate::common::{collect, create_test_config, html};
use scrape_pipeline::observe::{metrics, CollectingObserver, NoopObserver};
use scrape_pipeline::{CrawlEngine, FetchErrorKind};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_crawl_fetches_every_seed() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    for page in ["/one", "/two"] {
        Mock::given(method("GET"))
            .and(path(page))
            .respond_with(html(format!("<title>{}</title>", page)))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let engine = CrawlEngine::new(&create_test_config(&base_url), Arc::new(NoopObserver)).unwrap();
    let streams = engine.scrape(
        vec![format!("{}/one", base_url), format!("{}/two", base_url)],
        CancellationToken::new(),
    );
    let (pages, errors) = collect(streams).await;

    assert_eq!(pages.len(), 2);
    assert!(errors.is_empty());

    let mut urls: Vec<_> = pages.iter().map(|p| p.url.clone()).collect();
    urls.sort();
    assert_eq!(urls, vec![format!("{}/one", base_url), format!("{}/two", base_url)]);

    let page = &pages[0];
    assert_eq!(page.status, 200);
    assert_eq!(page.content_type, "text/html");
    assert_eq!(page.headers.get("content-type").map(String::as_str), Some("text/html"));
}

#[tokio::test]
async fn test_link_following_respects_max_depth_and_dedupes() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(format!(
            r##"<html><body>
                <a href="/a">A</a>
                <a href="/a/">A again</a>
                <a href="/a#section">A fragment</a>
                <a href="{}/b?utm_source=home">B</a>
                <a href="mailto:someone@example.com">Mail</a>
            </body></html>"##,
            base_url
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html(r#"<a href="/deep">Deeper</a>"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(html("<p>B</p>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/deep"))
        .respond_with(html("<p>too deep</p>"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&base_url);
    config.max_depth = 1;

    let engine = CrawlEngine::new(&config, Arc::new(NoopObserver)).unwrap();
    let (pages, errors) = collect(engine.crawl(CancellationToken::new())).await;

    assert_eq!(pages.len(), 3);
    assert!(errors.is_empty());
}

#[tokio::test]
async fn test_followed_links_filtered_by_patterns_and_domains() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<a href="/keep">keep</a><a href="/admin/panel">admin</a><a href="https://elsewhere.invalid/x">away</a>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/keep"))
        .respond_with(html("<p>kept</p>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/admin/panel"))
        .respond_with(html("<p>admin</p>"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&base_url);
    config.max_depth = 1;
    config.deny_url_patterns = vec!["/admin/".to_string()];
    config.allowed_domains = vec!["127.0.0.1".to_string()];

    let engine = CrawlEngine::new(&config, Arc::new(NoopObserver)).unwrap();
    let (pages, errors) = collect(engine.crawl(CancellationToken::new())).await;

    assert_eq!(pages.len(), 2);
    assert!(errors.is_empty());
}

#[tokio::test]
async fn test_robots_disallowed_target_is_never_requested() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/private/page"))
        .respond_with(html("<p>secret</p>"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&base_url);
    config.respect_robots_txt = true;
    config.disallowed_paths = vec!["/private/".to_string()];
    assert!(config.fetch_robots_txt);

    let engine = CrawlEngine::new(&config, Arc::new(NoopObserver)).unwrap();
    let streams = engine.scrape(
        vec![format!("{}/private/page", base_url)],
        CancellationToken::new(),
    );
    let (pages, errors) = collect(streams).await;

    assert!(pages.is_empty());
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, FetchErrorKind::RobotsDisallowed);
    assert_eq!(errors[0].attempts, 0);

    // Not even robots.txt is requested
    let requests = mock_server.received_requests().await.unwrap();
    assert!(requests.is_empty());
}

#[tokio::test]
async fn test_robots_txt_allow_rule_overrides_disallow() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "User-agent: *\nDisallow: /docs\nAllow: /docs/public\n",
            "text/plain",
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/docs/public/intro"))
        .respond_with(html("<p>intro</p>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/docs/internal"))
        .respond_with(html("<p>internal</p>"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&base_url);
    config.respect_robots_txt = true;

    let engine = CrawlEngine::new(&config, Arc::new(NoopObserver)).unwrap();
    let (pages, errors) = collect(engine.scrape(
        vec![
            format!("{}/docs/public/intro", base_url),
            format!("{}/docs/internal", base_url),
        ],
        CancellationToken::new(),
    ))
    .await;

    assert_eq!(pages.len(), 1);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].url, format!("{}/docs/internal", base_url));
}

#[tokio::test]
async fn test_fetched_robots_txt_is_honored_and_cached() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("User-agent: *\nDisallow: /secret\n", "text/plain"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/open"))
        .respond_with(html("<p>open</p>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/secret"))
        .respond_with(html("<p>secret</p>"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&base_url);
    config.respect_robots_txt = true;

    let engine = CrawlEngine::new(&config, Arc::new(NoopObserver)).unwrap();
    let streams = engine.scrape(
        vec![format!("{}/open", base_url), format!("{}/secret", base_url)],
        CancellationToken::new(),
    );
    let (pages, errors) = collect(streams).await;

    assert_eq!(pages.len(), 1);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].url, format!("{}/secret", base_url));
    assert_eq!(errors[0].kind, FetchErrorKind::RobotsDisallowed);
}

#[tokio::test]
async fn test_missing_robots_txt_allows_everything() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(html("<p>page</p>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&base_url);
    config.respect_robots_txt = true;

    let engine = CrawlEngine::new(&config, Arc::new(NoopObserver)).unwrap();
    let (pages, errors) = collect(engine.scrape(
        vec![format!("{}/page", base_url)],
        CancellationToken::new(),
    ))
    .await;

    assert_eq!(pages.len(), 1);
    assert!(errors.is_empty());
}

#[tokio::test]
async fn test_invalid_and_out_of_domain_seeds_report_errors() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    let mut config = create_test_config(&base_url);
    config.allowed_domains = vec!["example.org".to_string()];

    let engine = CrawlEngine::new(&config, Arc::new(NoopObserver)).unwrap();
    let (pages, mut errors) = collect(engine.scrape(
        vec!["not a url".to_string(), format!("{}/page", base_url)],
        CancellationToken::new(),
    ))
    .await;

    assert!(pages.is_empty());
    assert_eq!(errors.len(), 2);
    errors.sort_by_key(|e| e.kind.label());
    assert_eq!(
        errors[0].kind,
        FetchErrorKind::DomainNotAllowed {
            domain: "127.0.0.1".to_string()
        }
    );
    assert!(matches!(errors[1].kind, FetchErrorKind::InvalidUrl(_)));
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_denied_seed_is_dropped_silently() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/skip-me"))
        .respond_with(html("<p>skipped</p>"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&base_url);
    config.deny_url_patterns = vec!["skip-me".to_string()];

    let engine = CrawlEngine::new(&config, Arc::new(NoopObserver)).unwrap();
    let (pages, errors) = collect(engine.scrape(
        vec![format!("{}/skip-me", base_url)],
        CancellationToken::new(),
    ))
    .await;

    assert!(pages.is_empty());
    assert!(errors.is_empty());
}

#[tokio::test]
async fn test_cancellation_closes_channels() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(html("<p>slow</p>").set_delay(Duration::from_secs(10)))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&base_url);
    config.concurrency = 3;

    let engine = CrawlEngine::new(&config, Arc::new(NoopObserver)).unwrap();
    let urls = (0..10).map(|i| format!("{}/slow?n={}", base_url, i)).collect();

    let cancel = CancellationToken::new();
    let streams = engine.scrape(urls, cancel.clone());

    tokio::time::sleep(Duration::from_millis(300)).await;
    let cancelled_at = Instant::now();
    cancel.cancel();

    let (pages, errors) = collect(streams).await;

    assert!(cancelled_at.elapsed() < Duration::from_secs(5));
    assert!(pages.is_empty());
    assert!(errors.is_empty());

    let requests = mock_server.received_requests().await.unwrap();
    assert!(requests.len() <= 3);
}

#[tokio::test]
async fn test_set_rate_limit_applies_to_later_dispatches() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .respond_with(html("<p>ok</p>"))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&base_url);
    config.rate_limit = 0.1;

    let observer = Arc::new(CollectingObserver::new());
    let engine = CrawlEngine::new(&config, observer.clone()).unwrap();
    engine.set_rate_limit(50.0);

    let started = Instant::now();
    let (pages, _) = collect(engine.scrape(
        vec![format!("{}/a", base_url), format!("{}/b", base_url)],
        CancellationToken::new(),
    ))
    .await;

    assert_eq!(pages.len(), 2);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(observer.total(metrics::PAGES_FETCHED), 2.0);
}
