//! Scrape orchestration and output for bandgraph.
//!
//! This crate ties the crawler to the delimited band file and the member
//! graph, exposing the end-to-end [`pipeline::scrape`] workflow.

pub mod export;
pub mod graph;
pub mod pipeline;

pub use export::{BandRecord, band_row, read_bands, write_bands};
pub use graph::{BandGraph, GraphBuilder, GraphEdge, GraphNode};
pub use pipeline::{ProgressReporter, ScrapeConfig, ScrapeResult, SilentProgress, scrape};
