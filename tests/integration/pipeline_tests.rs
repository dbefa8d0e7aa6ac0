use crate::common::{collect, create_test_config, html, TEST_ARTICLE};
use scrape_pipeline::config::load_config;
use scrape_pipeline::observe::{CollectingObserver, NoopObserver};
use scrape_pipeline::output::{article_slug, MarkdownNormalizer};
use scrape_pipeline::pipeline::run_scrapers;
use scrape_pipeline::{
    Config, ConfigError, CrawlEngine, DomExtractor, ExtractionOutcome, Extractor, FetchErrorKind,
    Normalizer, Pipeline, PipelineError,
};
use std::io::Write;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct MemoryNormalizer {
    outcomes: Mutex<Vec<ExtractionOutcome>>,
}

impl MemoryNormalizer {
    fn outcomes(&self) -> Vec<ExtractionOutcome> {
        self.outcomes.lock().unwrap().clone()
    }
}

impl Normalizer for MemoryNormalizer {
    fn accept(&self, outcome: ExtractionOutcome) {
        self.outcomes.lock().unwrap().push(outcome);
    }
}

#[tokio::test]
async fn test_pipeline_accounts_for_every_record() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(html(TEST_ARTICLE))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/logo.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0x89, b'P', b'N', b'G'], "image/png"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&mock_server)
        .await;

    let engine = CrawlEngine::new(&create_test_config(&base_url), Arc::new(NoopObserver)).unwrap();
    let streams = engine.scrape(
        vec![
            format!("{}/article", base_url),
            format!("{}/logo.png", base_url),
            format!("{}/gone", base_url),
        ],
        CancellationToken::new(),
    );

    let normalizer = Arc::new(MemoryNormalizer::default());
    let extractor: Arc<dyn Extractor> = Arc::new(DomExtractor::default());
    let pipeline = Pipeline::new(extractor, normalizer.clone(), Arc::new(CollectingObserver::new()));

    let report = pipeline.run("test", streams).await;

    assert_eq!(report.pages, 2);
    assert_eq!(report.extracted, 1);
    assert_eq!(report.extraction_failures, 1);
    assert_eq!(report.fetch_failures, 1);
    assert_eq!(report.total_records(), 3);
    assert_eq!(report.failures_by_kind.get("http_status"), Some(&1));
    assert!(report.finished_at.is_some());

    let outcomes = normalizer.outcomes();
    assert_eq!(outcomes.len(), 3);

    let article = outcomes
        .iter()
        .find_map(|o| match o {
            ExtractionOutcome::Extracted(content) => Some(content.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(article.title, "Test Article");
    assert!(article.body.contains("This is the first paragraph."));
    assert!(!article.body.contains("Site Navigation"));
    assert!(!article.body.contains("Site Footer"));
    assert_eq!(article.metadata.get("title").map(String::as_str), Some("Y"));
    assert_eq!(article.metadata.get("og:title").map(String::as_str), Some("X"));
    assert_eq!(article.images.len(), 1);

    assert!(outcomes.iter().any(|o| matches!(
        o,
        ExtractionOutcome::FetchFailed(e) if e.kind == FetchErrorKind::HttpStatus(410)
    )));
    assert!(outcomes
        .iter()
        .any(|o| matches!(o, ExtractionOutcome::ExtractionFailed { .. })));
}

#[tokio::test]
async fn test_collect_sees_same_records_as_pipeline() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(TEST_ARTICLE))
        .mount(&mock_server)
        .await;

    let engine = CrawlEngine::new(&create_test_config(&base_url), Arc::new(NoopObserver)).unwrap();
    let (pages, errors) = collect(engine.crawl(CancellationToken::new())).await;

    assert_eq!(pages.len(), 1);
    assert!(errors.is_empty());

    let content = DomExtractor::default().extract(&pages[0]).unwrap();
    assert_eq!(content.url, format!("{}/", base_url));
    assert_eq!(content.title, "Test Article");
}

#[tokio::test]
async fn test_run_scrapers_writes_articles_from_yaml_config() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(r#"<html><body><a href="/post">Post</a></body></html>"#))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/post"))
        .respond_with(html(TEST_ARTICLE))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let articles_dir = dir.path().join("articles");

    let yaml = format!(
        r#"
scrapers:
  - name: "blog"
    url: "{base}/"
    rate-limit: 100
    concurrency: 2
    max-depth: 1
    retry-delay-ms: 10
    timeout-secs: 5
extraction:
  preserve-headings: true
  extract-images: false
output:
  articles-dir: "{articles}"
"#,
        base = base_url,
        articles = articles_dir.display()
    );

    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    let config = load_config(file.path()).unwrap();

    let normalizer = Arc::new(MarkdownNormalizer::new(&config.output.articles_dir).unwrap());
    let reports = run_scrapers(
        &config,
        normalizer.clone(),
        Arc::new(NoopObserver),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert_eq!(report.scraper, "blog");
    assert_eq!(report.pages, 2);
    assert_eq!(report.extracted, 2);
    assert_eq!(report.fetch_failures, 0);
    assert!(!report.cancelled);

    assert_eq!(normalizer.written(), 2);
    let slug = article_slug(&format!("{}/post", base_url));
    assert!(slug.starts_with("127-0-0-1-"));
    let article = std::fs::read_to_string(articles_dir.join(format!("{}.md", slug))).unwrap();
    assert!(article.starts_with("---\n"));
    assert!(article.contains("# Test Article"));
    assert!(article.contains("This is the second paragraph."));
    assert!(!article.contains("## Images"));
}

#[tokio::test]
async fn test_bad_pattern_rejected_at_load_time() {
    let yaml = r#"
scrapers:
  - name: "bad"
    url: "https://example.com/"
    deny-url-patterns: ["("]
"#;

    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();

    let result = load_config(file.path());
    assert!(matches!(result, Err(ConfigError::InvalidPattern(_))));
}

#[tokio::test]
async fn test_run_scrapers_fails_before_crawling_on_bad_pattern() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    let mut bad = create_test_config(&base_url);
    bad.name = "bad".to_string();
    bad.deny_url_patterns = vec!["(".to_string()];

    let config = Config {
        scrapers: vec![create_test_config(&base_url), bad],
        ..Config::default()
    };

    let result = run_scrapers(
        &config,
        Arc::new(MemoryNormalizer::default()),
        Arc::new(NoopObserver),
        CancellationToken::new(),
    )
    .await;

    assert!(matches!(result, Err(PipelineError::Config(_))));
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}
