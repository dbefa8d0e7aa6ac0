use crate::config::Config;
use crate::crawler::CrawlEngine;
use crate::extractor::{DomExtractor, Extractor};
use crate::observe::Observer;
use crate::pipeline::{Normalizer, Pipeline, PipelineReport};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Runs every configured scraper concurrently until done or cancelled
///
/// All engines are built before any crawl starts, so a bad scraper
/// configuration fails the whole run up front. Reports come back in
/// configuration order.
pub async fn run_scrapers(
    config: &Config,
    normalizer: Arc<dyn Normalizer>,
    observer: Arc<dyn Observer>,
    cancel: CancellationToken,
) -> crate::Result<Vec<PipelineReport>> {
    let engines = config
        .scrapers
        .iter()
        .map(|scraper| CrawlEngine::new(scraper, Arc::clone(&observer)))
        .collect::<Result<Vec<_>, _>>()?;

    let extractor: Arc<dyn Extractor> = Arc::new(DomExtractor::new(config.extraction));
    let pipeline = Pipeline::new(extractor, normalizer, observer);

    let mut tasks = JoinSet::new();
    for (index, engine) in engines.into_iter().enumerate() {
        let pipeline = pipeline.clone();
        let cancel = cancel.clone();
        tasks.spawn(async move {
            let name = engine.config().name.clone();
            let streams = engine.crawl(cancel.clone());
            let mut report = pipeline.run(&name, streams).await;
            report.cancelled = cancel.is_cancelled();
            (index, report)
        });
    }

    let mut reports: Vec<Option<PipelineReport>> = vec![None; config.scrapers.len()];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, report)) => reports[index] = Some(report),
            Err(e) => tracing::error!("Scraper task failed: {}", e),
        }
    }

    Ok(reports.into_iter().flatten().collect())
}
