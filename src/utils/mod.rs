//! Utility modules supporting the crawl.
//!
//! - [`HttpClient`]: reqwest-backed [`crate::sources::PageSource`]
//! - [`ResponseCache`]: disk-backed page store keyed by [`CacheKey`]
//! - [`Throttle`]: randomized pause between live requests
//!
//! # Page cache
//!
//! ```rust,no_run
//! use citegraph::utils::{CacheKey, CacheResult, ResponseCache};
//!
//! # fn main() -> std::io::Result<()> {
//! let cache = ResponseCache::at("/tmp/citegraph");
//! let key = CacheKey::from_url(
//!     "https://scholar.google.com/scholar?cites=42",
//!     "https://scholar.google.com",
//! );
//! cache.put(&key, "<html>...</html>")?;
//! assert!(matches!(cache.get(&key), CacheResult::Hit(_)));
//! # Ok(())
//! # }
//! ```

mod cache;
mod http;
mod throttle;

pub use cache::{CacheKey, CacheResult, CacheStats, ResponseCache};
pub use http::HttpClient;
pub use throttle::Throttle;
