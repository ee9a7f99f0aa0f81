//! Shared types, error model, and configuration for bandgraph.
//!
//! This crate is the foundation depended on by all other bandgraph crates.
//! It provides:
//! - [`BandGraphError`]: the unified error type
//! - Domain types ([`Band`], [`BandMember`], [`PageResult`], [`MissingElement`])
//! - Configuration ([`AppConfig`], [`CrawlConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CONFIG_FILE_NAME, CrawlConfig, CrawlSettings, FilterConfig, GroupHeadingPolicy,
    OutputConfig, SourceConfig, init_config, load_config, load_config_from,
};
pub use error::{BandGraphError, Result};
pub use types::{Band, BandMember, MissingElement, PageResult};
