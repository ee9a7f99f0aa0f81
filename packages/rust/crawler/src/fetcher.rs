//! Page fetching with a transparent disk cache.

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::Client;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, instrument, warn};

use bandgraph_shared::{BandGraphError, CrawlConfig, Result};

use crate::cache::PageCache;

type InFlight = Arc<Mutex<HashMap<String, Arc<OnceCell<String>>>>>;

/// Fetches pages relative to a fixed origin, serving repeats from the cache.
///
/// Concurrent fetches of the same URL share one request.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    origin: String,
    client: Client,
    cache: PageCache,
    in_flight: InFlight,
}

impl PageFetcher {
    /// Create a fetcher for `config.origin` backed by `cache`.
    pub fn new(config: &CrawlConfig, cache: PageCache) -> Result<Self> {
        let mut builder = Client::builder().user_agent(config.user_agent.as_str());
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            BandGraphError::Network(format!("failed to build HTTP client: {e}"))
        })?;

        Ok(Self {
            origin: config.origin.trim_end_matches('/').to_string(),
            client,
            cache,
            in_flight: InFlight::default(),
        })
    }

    /// The cache this fetcher reads from and writes to.
    pub fn cache(&self) -> &PageCache {
        &self.cache
    }

    /// Absolute URL for a page path. Absolute URLs are returned unchanged.
    ///
    /// Resolution is plain concatenation so that the cache key of a path is
    /// stable across runs.
    pub fn resolve(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{path}", self.origin)
        }
    }

    /// Return the body of the page at `path`, fetching it only on a cache miss.
    ///
    /// Error statuses still return their body; only transport failures are
    /// errors.
    #[instrument(skip(self))]
    pub async fn fetch(&self, path: &str) -> Result<String> {
        let url = self.resolve(path);

        if let Some(body) = self.cache.get(&url).await? {
            debug!(%url, "cache hit");
            return Ok(body);
        }

        let cell = self
            .in_flight
            .lock()
            .await
            .entry(url.clone())
            .or_default()
            .clone();

        let body = cell
            .get_or_try_init(|| async {
                // A request that finished since the first lookup has stored its body.
                match self.cache.get(&url).await? {
                    Some(body) => Ok(body),
                    None => self.download(&url).await,
                }
            })
            .await
            .cloned();

        let mut in_flight = self.in_flight.lock().await;
        if in_flight.get(&url).is_some_and(|c| Arc::ptr_eq(c, &cell)) {
            in_flight.remove(&url);
        }

        body
    }

    async fn download(&self, url: &str) -> Result<String> {
        info!(%url, "fetching page");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BandGraphError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BandGraphError::Network(format!("{url}: body read failed: {e}")))?;

        if status.is_success() {
            self.cache.put(url, &body).await?;
        } else {
            warn!(%url, %status, "error status, body used but not cached");
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bandgraph_shared::AppConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher_for(origin: &str, cache_dir: &std::path::Path) -> PageFetcher {
        let mut app = AppConfig::default();
        app.source.origin = origin.to_string();
        let config = CrawlConfig::try_from(&app).unwrap();
        PageFetcher::new(&config, PageCache::open(cache_dir).unwrap()).unwrap()
    }

    #[test]
    fn test_resolve() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher_for("https://en.wikipedia.org/", dir.path());

        assert_eq!(
            fetcher.resolve("/wiki/Category:Musicians_by_band"),
            "https://en.wikipedia.org/wiki/Category:Musicians_by_band"
        );
        assert_eq!(
            fetcher.resolve("https://example.org/page"),
            "https://example.org/page"
        );
    }

    #[tokio::test]
    async fn test_second_fetch_served_from_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wiki/Freddie_Mercury"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<h1>Freddie</h1>"))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher_for(&server.uri(), dir.path());

        let first = fetcher.fetch("/wiki/Freddie_Mercury").await.unwrap();
        let second = fetcher.fetch("/wiki/Freddie_Mercury").await.unwrap();
        assert_eq!(first, "<h1>Freddie</h1>");
        assert_eq!(first, second);

        // A fresh fetcher over the same directory (a later run) also hits the cache.
        let later_run = fetcher_for(&server.uri(), dir.path());
        assert_eq!(later_run.fetch("/wiki/Freddie_Mercury").await.unwrap(), first);

        let url = fetcher.resolve("/wiki/Freddie_Mercury");
        assert!(fetcher.cache().path_for(&url).exists());
    }

    #[tokio::test]
    async fn test_error_status_returns_body_uncached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wiki/Deleted"))
            .respond_with(
                ResponseTemplate::new(404).set_body_string(r#"<h1 id="firstHeading">Deleted</h1>"#),
            )
            .expect(2)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher_for(&server.uri(), dir.path());

        let body = fetcher.fetch("/wiki/Deleted").await.unwrap();
        assert!(body.contains("firstHeading"));

        // Not cached, so the next fetch goes back to the network.
        assert_eq!(fetcher.fetch("/wiki/Deleted").await.unwrap(), body);
        assert_eq!(fetcher.cache().entry_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        // Nothing listens on port 1.
        let fetcher = fetcher_for("http://127.0.0.1:1", dir.path());

        let err = fetcher.fetch("/wiki/Anything").await.unwrap_err();
        assert!(matches!(err, BandGraphError::Network(_)));
    }

    #[tokio::test]
    async fn test_concurrent_fetches_share_one_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wiki/Eric_Clapton"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<h1>Clapton</h1>")
                    .set_delay(std::time::Duration::from_millis(200)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(fetcher_for(&server.uri(), dir.path()));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let fetcher = fetcher.clone();
                tokio::spawn(async move { fetcher.fetch("/wiki/Eric_Clapton").await })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "<h1>Clapton</h1>");
        }

        assert!(fetcher.in_flight.lock().await.is_empty());
    }
}
