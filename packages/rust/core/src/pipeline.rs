//! End-to-end `scrape` pipeline: index walk → band building → CSV → graph.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, instrument};

use bandgraph_crawler::{IndexWalker, PageCache, PageFetcher, WorkerPool};
use bandgraph_shared::{AppConfig, Band, BandGraphError, CrawlConfig, Result};

use crate::export::write_bands;
use crate::graph::BandGraph;

/// Configuration for the `scrape` pipeline.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub crawl: CrawlConfig,
    /// Delimited output file.
    pub csv_path: PathBuf,
    pub record_delimiter: char,
    /// Graph JSON, written only when set.
    pub graph_path: Option<PathBuf>,
}

impl TryFrom<&AppConfig> for ScrapeConfig {
    type Error = BandGraphError;

    fn try_from(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            crawl: CrawlConfig::try_from(config)?,
            csv_path: PathBuf::from(&config.output.csv_path),
            record_delimiter: config.output.record_delimiter,
            graph_path: config.output.graph_path.as_ref().map(PathBuf::from),
        })
    }
}

/// Result of the `scrape` pipeline.
#[derive(Debug)]
pub struct ScrapeResult {
    pub index_pages: usize,
    pub bands: usize,
    pub members: usize,
    pub csv_path: PathBuf,
    pub graph_path: Option<PathBuf>,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each index page and its bands are done.
    fn index_page(&self, url: &str, page: usize, bands: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &ScrapeResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn index_page(&self, _url: &str, _page: usize, _bands: usize) {}
    fn done(&self, _result: &ScrapeResult) {}
}

/// Run the full scrape.
///
/// The pool is shut down once the walk ends, whether or not it succeeded.
/// Nothing is written when the walk fails.
#[instrument(skip_all, fields(origin = %config.crawl.origin, start = %config.crawl.start_path))]
pub async fn scrape(config: &ScrapeConfig, progress: &dyn ProgressReporter) -> Result<ScrapeResult> {
    let start = Instant::now();
    info!(workers = config.crawl.workers, "starting scrape");

    progress.phase("Opening page cache");
    let cache = PageCache::open(&config.crawl.cache_dir)?;
    let fetcher = Arc::new(PageFetcher::new(&config.crawl, cache)?);
    let walker = IndexWalker::new(fetcher, config.crawl.filters.clone())
        .with_max_pages(config.crawl.max_index_pages);
    let pool = WorkerPool::new(config.crawl.workers);

    progress.phase("Walking category index");
    let walked = walk_all(&walker, &config.crawl.start_path, &pool, progress).await;
    pool.shutdown();
    let (index_pages, bands) = walked?;

    progress.phase("Writing output");
    write_bands(&config.csv_path, &bands, config.record_delimiter)?;
    if let Some(graph_path) = &config.graph_path {
        BandGraph::from_bands(&bands).write(graph_path)?;
    }

    let result = ScrapeResult {
        index_pages,
        bands: bands.len(),
        members: bands.iter().map(|b| b.members.len()).sum(),
        csv_path: config.csv_path.clone(),
        graph_path: config.graph_path.clone(),
        elapsed: start.elapsed(),
    };
    info!(
        index_pages = result.index_pages,
        bands = result.bands,
        members = result.members,
        elapsed_ms = result.elapsed.as_millis() as u64,
        "scrape complete"
    );
    progress.done(&result);
    Ok(result)
}

async fn walk_all(
    walker: &IndexWalker,
    start_path: &str,
    pool: &WorkerPool,
    progress: &dyn ProgressReporter,
) -> Result<(usize, Vec<Band>)> {
    let mut walk = walker.start(start_path, pool);
    let mut url = start_path.to_string();
    let mut bands = Vec::new();

    while let Some(page) = walk.next_page().await? {
        progress.index_page(&url, walk.pages_walked(), page.bands.len());
        bands.extend(page.bands);
        match page.next_url {
            Some(next) => url = next,
            None => break,
        }
    }

    Ok((walk.pages_walked(), bands))
}
