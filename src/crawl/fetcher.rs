//! Cache-first page fetching with request pacing and interstitial detection.

use std::sync::Arc;

use crate::config::{Config, ScholarConfig};
use crate::sources::{PageParser, PageSource, SourceError};
use crate::utils::{CacheKey, CacheResult, ResponseCache, Throttle};

/// A page ready for parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub html: String,
    /// Served from the cache without touching the network
    pub from_cache: bool,
}

/// A live fetch that returned a human-verification interstitial
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingVerification {
    /// Full URL to open for the human
    pub url: String,
    /// Key the verified page will be cached under
    pub key: CacheKey,
}

/// What a fetch produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Page(FetchedPage),
    /// Someone has to pass the site's robot check before this page can be read
    NeedsVerification(PendingVerification),
}

/// Fetches one page per call, consulting the cache first.
///
/// On a cache miss the page is fetched live and checked for a verification
/// interstitial. A real page is parsed to decide whether it may be cached
/// (at least one record), then the throttle pause is awaited before returning.
/// Interstitials are never cached; they come back as
/// [`FetchOutcome::NeedsVerification`] for the caller to resolve.
#[derive(Debug, Clone)]
pub struct RateLimitedFetcher {
    transport: Arc<dyn PageSource>,
    parser: Arc<dyn PageParser>,
    cache: ResponseCache,
    throttle: Throttle,
    key_prefix: String,
    robot_markers: Vec<String>,
}

impl RateLimitedFetcher {
    pub fn new(
        transport: Arc<dyn PageSource>,
        parser: Arc<dyn PageParser>,
        cache: ResponseCache,
    ) -> Self {
        let defaults = ScholarConfig::default();
        Self {
            transport,
            parser,
            cache,
            throttle: Throttle::from_config(&Config::default().throttle),
            key_prefix: defaults.base_url,
            robot_markers: defaults.robot_markers,
        }
    }

    pub fn with_throttle(mut self, throttle: Throttle) -> Self {
        self.throttle = throttle;
        self
    }

    /// Prefix stripped from URLs to form cache keys
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn with_robot_markers(mut self, markers: Vec<String>) -> Self {
        self.robot_markers = markers;
        self
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn key_for(&self, url: &str) -> CacheKey {
        CacheKey::from_url(url, &self.key_prefix)
    }

    /// Whether `html` is a robot-check page rather than results
    pub fn is_interstitial(&self, html: &str) -> bool {
        self.robot_markers.iter().any(|m| html.contains(m.as_str()))
    }

    /// Fetch `url`, from the cache when possible
    pub async fn fetch(&self, url: &str) -> Result<FetchOutcome, SourceError> {
        let key = self.key_for(url);

        if let CacheResult::Hit(html) = self.cache.get(&key) {
            return Ok(FetchOutcome::Page(FetchedPage {
                html,
                from_cache: true,
            }));
        }

        let html = self.transport.fetch(url).await?;

        if self.is_interstitial(&html) {
            tracing::warn!(url, "Verification interstitial served");
            return Ok(FetchOutcome::NeedsVerification(PendingVerification {
                url: url.to_string(),
                key,
            }));
        }

        let records = self.parser.parse(&html, &[]);
        if records.is_empty() {
            tracing::warn!(url, parser = self.parser.id(), "Page parsed to zero records, not caching");
        } else {
            self.store(&key, &html);
        }

        self.throttle.pause().await;

        Ok(FetchOutcome::Page(FetchedPage {
            html,
            from_cache: false,
        }))
    }

    /// Accept the page source obtained after a human passed the check.
    ///
    /// The page is cached as-is; confirmation is assumed to have worked.
    pub fn complete_verification(&self, pending: &PendingVerification, html: String) -> FetchedPage {
        tracing::info!(url = %pending.url, "Verification completed");
        self.store(&pending.key, &html);
        FetchedPage {
            html,
            from_cache: false,
        }
    }

    fn store(&self, key: &CacheKey, html: &str) {
        if let Err(e) = self.cache.put(key, html) {
            tracing::warn!(key = %key, "Failed to cache page: {}", e);
        }
    }
}
