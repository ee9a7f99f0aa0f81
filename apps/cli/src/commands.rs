//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use bandgraph_core::{BandGraph, ProgressReporter, ScrapeConfig, ScrapeResult, read_bands};
use bandgraph_crawler::{PageCache, PageFetcher};
use bandgraph_shared::{
    AppConfig, CONFIG_FILE_NAME, CrawlConfig, init_config, load_config, load_config_from,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// bandgraph: who played in which band, scraped from a wiki category tree.
#[derive(Parser)]
#[command(
    name = "bandgraph",
    version,
    about = "Scrape band membership from a wiki category index into CSV and a member graph.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ./bandgraph.toml when present).
    #[arg(long, global = true, env = "BANDGRAPH_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Walk the category index and write the band file.
    Scrape(ScrapeArgs),

    /// Build the member graph from an existing band file.
    Graph {
        /// Band file written by `scrape`.
        #[arg(long)]
        input: PathBuf,

        /// Graph JSON destination.
        #[arg(long, default_value = "graph.json")]
        out: PathBuf,
    },

    /// Page cache inspection.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Overrides applied on top of the loaded config.
#[derive(Args, Debug, Default)]
pub(crate) struct ScrapeArgs {
    /// Path of the first index page.
    #[arg(long)]
    pub start: Option<String>,

    /// Site origin, e.g. https://en.wikipedia.org.
    #[arg(long)]
    pub origin: Option<String>,

    /// Band file destination.
    #[arg(short, long)]
    pub out: Option<String>,

    /// Page cache directory.
    #[arg(long)]
    pub cache_dir: Option<String>,

    /// Concurrent band workers.
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Also write the member graph JSON here.
    #[arg(long)]
    pub graph: Option<String>,

    /// Stop after this many index pages.
    #[arg(long)]
    pub max_pages: Option<usize>,
}

impl ScrapeArgs {
    fn apply(self, config: &mut AppConfig) {
        if let Some(start) = self.start {
            config.source.start_path = start;
        }
        if let Some(origin) = self.origin {
            config.source.origin = origin;
        }
        if let Some(out) = self.out {
            config.output.csv_path = out;
        }
        if let Some(cache_dir) = self.cache_dir {
            config.crawl.cache_dir = cache_dir;
        }
        if let Some(workers) = self.workers {
            config.crawl.workers = workers;
        }
        if let Some(graph) = self.graph {
            config.output.graph_path = Some(graph);
        }
        if let Some(max_pages) = self.max_pages {
            config.crawl.max_index_pages = Some(max_pages);
        }
    }
}

#[derive(Subcommand)]
pub(crate) enum CacheAction {
    /// Print the cache file for a page URL or origin-relative path.
    Path { url: String },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Write a default config file.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "bandgraph=info",
        1 => "bandgraph=debug",
        _ => "bandgraph=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config;
    match cli.command {
        Command::Scrape(args) => cmd_scrape(config_path.as_deref(), args).await,
        Command::Graph { input, out } => cmd_graph(config_path.as_deref(), &input, &out),
        Command::Cache { action } => match action {
            CacheAction::Path { url } => cmd_cache_path(config_path.as_deref(), &url),
        },
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(config_path.as_deref()),
            ConfigAction::Show => cmd_config_show(config_path.as_deref()),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    Ok(match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    })
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_scrape(config_path: Option<&Path>, args: ScrapeArgs) -> Result<()> {
    let mut config = resolve_config(config_path)?;
    args.apply(&mut config);
    let scrape_config = ScrapeConfig::try_from(&config)?;

    info!(
        origin = %scrape_config.crawl.origin,
        start = %scrape_config.crawl.start_path,
        workers = scrape_config.crawl.workers,
        "scraping band index"
    );

    let reporter = CliProgress::new();
    let result = match bandgraph_core::scrape(&scrape_config, &reporter).await {
        Ok(result) => result,
        Err(e) => {
            reporter.spinner.abandon_with_message("Scrape failed");
            return Err(e.into());
        }
    };

    println!();
    println!("  Scrape complete!");
    println!("  Index pages: {}", result.index_pages);
    println!("  Bands:       {}", result.bands);
    println!("  Members:     {}", result.members);
    println!("  Output:      {}", result.csv_path.display());
    if let Some(graph_path) = &result.graph_path {
        println!("  Graph:       {}", graph_path.display());
    }
    println!("  Time:        {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

fn cmd_graph(config_path: Option<&Path>, input: &Path, out: &Path) -> Result<()> {
    let config = resolve_config(config_path)?;
    let records = read_bands(input, config.output.record_delimiter)?;
    let graph = BandGraph::from_records(&records);
    graph.write(out)?;

    println!(
        "Graph with {} nodes and {} edges written to {}",
        graph.nodes.len(),
        graph.edges.len(),
        out.display()
    );
    Ok(())
}

fn cmd_cache_path(config_path: Option<&Path>, url: &str) -> Result<()> {
    let config = resolve_config(config_path)?;
    let crawl = CrawlConfig::try_from(&config)?;
    let fetcher = PageFetcher::new(&crawl, PageCache::open(&crawl.cache_dir)?)?;

    let resolved = fetcher.resolve(url);
    let path = fetcher.cache().path_for(&resolved);
    let state = if path.exists() { "cached" } else { "not cached" };

    println!("{resolved}");
    println!("{} ({state})", path.display());
    Ok(())
}

fn cmd_config_init(config_path: Option<&Path>) -> Result<()> {
    let path = config_path.unwrap_or(Path::new(CONFIG_FILE_NAME));
    init_config(path)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn index_page(&self, url: &str, page: usize, bands: usize) {
        self.spinner
            .set_message(format!("Index page {page} ({bands} bands) {url}"));
    }

    fn done(&self, _result: &ScrapeResult) {
        self.spinner.finish_and_clear();
    }
}
