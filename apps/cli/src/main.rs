//! bandgraph CLI: scrape band membership from a wiki category tree.
//!
//! Walks the "Musicians by band" index, writes one delimited row per band,
//! and optionally builds the member graph.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
