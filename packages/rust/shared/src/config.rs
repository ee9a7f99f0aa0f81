//! Application configuration for bandgraph.
//!
//! The config file lives at `./bandgraph.toml` (next to the `pages/` cache).
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{BandGraphError, Result};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "bandgraph.toml";

// ---------------------------------------------------------------------------
// Config structs (matching bandgraph.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where the walk starts.
    #[serde(default)]
    pub source: SourceConfig,

    /// Fetching and concurrency settings.
    #[serde(default)]
    pub crawl: CrawlSettings,

    /// Member filtering rules.
    #[serde(default)]
    pub filters: FilterConfig,

    /// Output files.
    #[serde(default)]
    pub output: OutputConfig,
}

/// `[source]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Origin every relative page path is resolved against.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path of the first category index page.
    #[serde(default = "default_start_path")]
    pub start_path: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            start_path: default_start_path(),
        }
    }
}

fn default_origin() -> String {
    "https://en.wikipedia.org".into()
}
fn default_start_path() -> String {
    "/wiki/Category:Musicians_by_band".into()
}

/// `[crawl]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlSettings {
    /// Number of bands built concurrently.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Directory holding one file per fetched URL.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,

    /// User-Agent header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout. No timeout when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Stop after this many index pages. Unbounded when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_index_pages: Option<usize>,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            cache_dir: default_cache_dir(),
            user_agent: default_user_agent(),
            timeout_secs: None,
            max_index_pages: None,
        }
    }
}

fn default_workers() -> usize {
    6
}
fn default_cache_dir() -> String {
    "pages".into()
}
fn default_user_agent() -> String {
    concat!("bandgraph/", env!("CARGO_PKG_VERSION")).into()
}

/// `[filters]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Member anchors whose text starts with one of these are dropped.
    #[serde(default = "default_excluded_prefixes")]
    pub excluded_prefixes: Vec<String>,

    /// Member anchors whose text equals one of these are dropped.
    #[serde(default = "default_excluded_titles")]
    pub excluded_titles: Vec<String>,

    /// Which lettered groups of a members page are read.
    #[serde(default)]
    pub group_headings: GroupHeadingPolicy,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            excluded_prefixes: default_excluded_prefixes(),
            excluded_titles: default_excluded_titles(),
            group_headings: GroupHeadingPolicy::default(),
        }
    }
}

impl FilterConfig {
    /// Whether a member anchor with this text should be skipped.
    pub fn excludes(&self, anchor_text: &str) -> bool {
        self.excluded_prefixes
            .iter()
            .any(|prefix| anchor_text.starts_with(prefix.as_str()))
            || self.excluded_titles.iter().any(|title| anchor_text == title)
    }
}

fn default_excluded_prefixes() -> Vec<String> {
    vec!["List of".into()]
}
fn default_excluded_titles() -> Vec<String> {
    // Known bad entry in one of the members categories.
    vec!["Cuban Link discography".into()]
}

/// Policy for the lettered groups (`<h3>A</h3>`, `<h3>B</h3>`, ...) of a
/// members category page.
///
/// The default only reads groups headed by a single ASCII letter, which means
/// members filed under symbol or digit headings (`0-9`, `*`, `Δ`) are dropped.
/// That loss is long-standing behavior and stays the default until someone
/// decides otherwise; `All` reads every group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupHeadingPolicy {
    #[default]
    AsciiLettersOnly,
    All,
}

impl GroupHeadingPolicy {
    /// Whether a group with this heading text contributes members.
    pub fn accepts(self, heading: &str) -> bool {
        match self {
            Self::All => true,
            Self::AsciiLettersOnly => {
                let mut chars = heading.trim().chars();
                matches!((chars.next(), chars.next()), (Some(c), None) if c.is_ascii_alphabetic())
            }
        }
    }
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Delimited band/member file.
    #[serde(default = "default_csv_path")]
    pub csv_path: String,

    /// Separator between the `page_name,name` cells of a row.
    #[serde(default = "default_record_delimiter")]
    pub record_delimiter: char,

    /// Optional band graph JSON written after the scrape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_path: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_path: default_csv_path(),
            record_delimiter: default_record_delimiter(),
            graph_path: None,
        }
    }
}

fn default_csv_path() -> String {
    "bands.csv".into()
}
fn default_record_delimiter() -> char {
    ';'
}

// ---------------------------------------------------------------------------
// Crawl config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime crawl configuration, validated from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Origin without a trailing slash, e.g. `https://en.wikipedia.org`.
    pub origin: String,
    /// Path of the first index page.
    pub start_path: String,
    /// Cache directory.
    pub cache_dir: PathBuf,
    /// Pool size for concurrent band building.
    pub workers: usize,
    /// User-Agent header.
    pub user_agent: String,
    /// Optional per-request timeout.
    pub timeout: Option<Duration>,
    /// Optional bound on the number of index pages walked.
    pub max_index_pages: Option<usize>,
    /// Member filtering rules.
    pub filters: FilterConfig,
}

impl TryFrom<&AppConfig> for CrawlConfig {
    type Error = BandGraphError;

    fn try_from(config: &AppConfig) -> Result<Self> {
        let origin = Url::parse(&config.source.origin).map_err(|e| {
            BandGraphError::config(format!("invalid origin '{}': {e}", config.source.origin))
        })?;
        if origin.scheme() != "http" && origin.scheme() != "https" {
            return Err(BandGraphError::config(format!(
                "origin must be an http(s) URL, got '{origin}'"
            )));
        }

        if config.crawl.workers == 0 {
            return Err(BandGraphError::config("crawl.workers must be at least 1"));
        }

        Ok(Self {
            origin: config.source.origin.trim_end_matches('/').to_string(),
            start_path: config.source.start_path.clone(),
            cache_dir: PathBuf::from(&config.crawl.cache_dir),
            workers: config.crawl.workers,
            user_agent: config.crawl.user_agent.clone(),
            timeout: config.crawl.timeout_secs.map(Duration::from_secs),
            max_index_pages: config.crawl.max_index_pages,
            filters: config.filters.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load `./bandgraph.toml`. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = PathBuf::from(CONFIG_FILE_NAME);

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| BandGraphError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| BandGraphError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Write a default config file at `path`. Refuses to replace an existing file.
pub fn init_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(BandGraphError::config(format!(
            "{} already exists",
            path.display()
        )));
    }

    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| BandGraphError::config(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| BandGraphError::io(path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(())
}
