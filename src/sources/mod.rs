//! Page sources and page parsers.
//!
//! A crawl is assembled from two seams:
//!
//! - [`PageSource`] returns the raw text of a page for a URL. The production
//!   implementation is [`crate::utils::HttpClient`]; tests use [`MockTransport`].
//! - [`PageParser`] turns one HTML document into zero or more
//!   [`ArticleRecord`]s. There is one parser per site layout:
//!   [`ScholarParser`] for the academic search engine and [`CiteULikeParser`]
//!   for the citation-management site.
//!
//! Parsers are pure: they never touch the network or the cache, and a missing
//! field falls back to its sentinel instead of failing the record.

mod citeulike;
pub mod mock;
mod scholar;

pub use citeulike::CiteULikeParser;
pub use mock::MockTransport;
pub use scholar::{Byline, ScholarParser, CITATION_MARKER};

use crate::models::ArticleRecord;
use async_trait::async_trait;

/// Fetches raw page text for a URL.
#[async_trait]
pub trait PageSource: Send + Sync + std::fmt::Debug {
    /// Fetch the page at `url` and return its body as text.
    ///
    /// Connection failures and non-success statuses are errors; there is no
    /// retry at this level.
    async fn fetch(&self, url: &str) -> Result<String, SourceError>;
}

/// Turns one result page into article records.
pub trait PageParser: Send + Sync + std::fmt::Debug {
    /// Short identifier used in logs
    fn id(&self) -> &str;

    /// Parse every result on the page. `search_terms` become the records' tags.
    fn parse(&self, html: &str, search_terms: &[String]) -> Vec<ArticleRecord>;
}

/// Errors that can occur when fetching or interpreting pages
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(String),

    /// The site answered with an unexpected status
    #[error("API error: {0}")]
    Api(String),

    /// A full result page produced no parsable records
    #[error("No articles found with URL: {url}")]
    NoResults { url: String },

    /// Parsing error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Article not found
    #[error("Article not found: {0}")]
    NotFound(String),

    /// A verification interstitial was served and could not be resolved
    #[error("Human verification required for {0}")]
    VerificationRequired(String),

    /// IO error (file system)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("Error: {0}")]
    Other(String),
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}
