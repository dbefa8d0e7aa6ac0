use crate::common::{collect, create_test_config, html};
use scrape_pipeline::observe::{metrics, CollectingObserver, NoopObserver};
use scrape_pipeline::{CrawlEngine, FetchErrorKind};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_server_error_retried_until_exhausted() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&base_url);
    config.retry_count = 2;

    let observer = Arc::new(CollectingObserver::new());
    let engine = CrawlEngine::new(&config, observer.clone()).unwrap();
    let (pages, errors) = collect(engine.scrape(
        vec![format!("{}/flaky", base_url)],
        CancellationToken::new(),
    ))
    .await;

    assert!(pages.is_empty());
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, FetchErrorKind::HttpStatus(500));
    assert_eq!(errors[0].attempts, 3);
    assert_eq!(observer.total(metrics::RETRIES), 2.0);
    assert_eq!(observer.count(metrics::FETCH_ERRORS), 1);
}

#[tokio::test]
async fn test_too_many_requests_then_success() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(html("<p>finally</p>"))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&base_url);
    config.retry_count = 3;

    let observer = Arc::new(CollectingObserver::new());
    let engine = CrawlEngine::new(&config, observer.clone()).unwrap();
    let (pages, errors) = collect(engine.scrape(
        vec![format!("{}/busy", base_url)],
        CancellationToken::new(),
    ))
    .await;

    assert_eq!(pages.len(), 1);
    assert!(errors.is_empty());
    assert_eq!(pages[0].body, "<p>finally</p>");
    assert_eq!(observer.total(metrics::RETRIES), 1.0);
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&base_url);
    config.retry_count = 3;

    let engine = CrawlEngine::new(&config, Arc::new(NoopObserver)).unwrap();
    let (pages, errors) = collect(engine.scrape(
        vec![format!("{}/missing", base_url)],
        CancellationToken::new(),
    ))
    .await;

    assert!(pages.is_empty());
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, FetchErrorKind::HttpStatus(404));
    assert_eq!(errors[0].attempts, 1);
}

#[tokio::test]
async fn test_transport_failure_is_retried() {
    let mut config = create_test_config("http://127.0.0.1:1");
    config.retry_count = 1;
    config.timeout_secs = 2;

    let engine = CrawlEngine::new(&config, Arc::new(NoopObserver)).unwrap();
    let (pages, errors) = collect(engine.crawl(CancellationToken::new())).await;

    assert!(pages.is_empty());
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0].kind, FetchErrorKind::Transport(_)));
    assert_eq!(errors[0].attempts, 2);
}

#[tokio::test]
async fn test_requests_to_one_domain_are_spaced() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .respond_with(html("<p>ok</p>"))
        .expect(3)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&base_url);
    config.rate_limit = 5.0;
    config.concurrency = 3;

    let engine = CrawlEngine::new(&config, Arc::new(NoopObserver)).unwrap();
    let started = Instant::now();
    let (pages, _) = collect(engine.scrape(
        (0..3).map(|i| format!("{}/p{}", base_url, i)).collect(),
        CancellationToken::new(),
    ))
    .await;

    assert_eq!(pages.len(), 3);
    assert!(started.elapsed() >= Duration::from_millis(400));
}

#[tokio::test]
async fn test_domain_rate_rule_overrides_default() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .respond_with(html("<p>ok</p>"))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&base_url);
    config.rate_limit = 100.0;
    config
        .rate_limit_rules
        .insert("127.0.0.1".to_string(), 4.0);

    let engine = CrawlEngine::new(&config, Arc::new(NoopObserver)).unwrap();
    let started = Instant::now();
    let (pages, _) = collect(engine.scrape(
        vec![format!("{}/x", base_url), format!("{}/y", base_url)],
        CancellationToken::new(),
    ))
    .await;

    assert_eq!(pages.len(), 2);
    assert!(started.elapsed() >= Duration::from_millis(250));
}
