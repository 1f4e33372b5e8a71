//! # citegraph
//!
//! Builds citation graphs by crawling an academic search engine's result
//! pages, with a second scraper for the CiteULike reference-management site.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Article records and query URL construction
//! - [`sources`]: Page transport trait and the HTML parsers for both sites
//! - [`crawl`]: Cache-first fetching, human verification and result matching
//! - [`graph`]: Citation graph storage, expansion and export
//! - [`utils`]: HTTP client, page cache and request throttle
//! - [`config`]: Configuration management

pub mod config;
pub mod crawl;
pub mod graph;
pub mod models;
pub mod sources;
pub mod utils;

// Re-export commonly used types
pub use crawl::{Crawler, MatchStrategy};
pub use graph::{CitationGraph, CitationGraphBuilder, NodeIdentity};
pub use models::{ArticleBuilder, ArticleRecord};
pub use sources::{PageParser, PageSource, SourceError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
