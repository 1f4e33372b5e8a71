//! Page-at-a-time crawling of both sites.
//!
//! [`Crawler`] owns everything one request needs: the transport, the cache,
//! a [`RateLimitedFetcher`] per site, the parsers and the [`HumanVerifier`].
//! Every call performs at most one network request (plus the verification
//! retry) and awaits the throttle pause before returning, so callers can
//! drive it in a plain sequential loop.

mod fetcher;
mod matcher;
mod verify;

pub use fetcher::{FetchOutcome, FetchedPage, PendingVerification, RateLimitedFetcher};
pub use matcher::{author_similarity, match_article, MatchStrategy};
pub use verify::{HumanVerifier, RefusingVerifier, TerminalVerifier};

use std::sync::Arc;

use crate::config::Config;
use crate::models::{citing_page_url, title_lookup_url, title_terms, ArticleRecord, CiteULikeQuery, ScholarQuery};
use crate::sources::{CiteULikeParser, PageParser, PageSource, ScholarParser, SourceError};
use crate::utils::{ResponseCache, Throttle};

/// Records parsed from one page
#[derive(Debug, Clone)]
pub struct CrawledPage {
    pub records: Vec<ArticleRecord>,
    pub from_cache: bool,
}

/// Fetch, verify and parse driver for both sites
#[derive(Debug, Clone)]
pub struct Crawler {
    scholar_base: String,
    citeulike_base: String,
    scholar: RateLimitedFetcher,
    citeulike: RateLimitedFetcher,
    scholar_parser: Arc<ScholarParser>,
    citeulike_parser: Arc<CiteULikeParser>,
    verifier: Arc<dyn HumanVerifier>,
}

impl Crawler {
    pub fn new(
        config: &Config,
        transport: Arc<dyn PageSource>,
        cache: ResponseCache,
        verifier: Arc<dyn HumanVerifier>,
    ) -> Result<Self, SourceError> {
        let scholar_base = config.scholar.base_url.trim_end_matches('/').to_string();
        let citeulike_base = config.citeulike.base_url.trim_end_matches('/').to_string();
        let throttle = Throttle::from_config(&config.throttle);

        let scholar_parser = Arc::new(ScholarParser::new()?);
        let citeulike_parser = Arc::new(CiteULikeParser::new(citeulike_base.clone())?);

        let scholar = RateLimitedFetcher::new(
            Arc::clone(&transport),
            Arc::clone(&scholar_parser) as Arc<dyn PageParser>,
            cache.clone(),
        )
        .with_throttle(throttle)
        .with_key_prefix(scholar_base.clone())
        .with_robot_markers(config.scholar.robot_markers.clone());

        let citeulike = RateLimitedFetcher::new(
            transport,
            Arc::clone(&citeulike_parser) as Arc<dyn PageParser>,
            cache,
        )
        .with_throttle(throttle)
        .with_key_prefix(citeulike_base.clone())
        .with_robot_markers(config.scholar.robot_markers.clone());

        Ok(Self {
            scholar_base,
            citeulike_base,
            scholar,
            citeulike,
            scholar_parser,
            citeulike_parser,
            verifier,
        })
    }

    pub fn scholar_base(&self) -> &str {
        &self.scholar_base
    }

    /// Absolute URL of one page of citing results
    pub fn citing_page_url(&self, citing_url: &str, start: usize, per_page: usize) -> String {
        citing_page_url(&self.scholar_base, citing_url, start, per_page)
    }

    /// Fetch and parse one search-engine page. Zero records is an error.
    pub async fn scholar_page(&self, url: &str, terms: &[String]) -> Result<CrawledPage, SourceError> {
        let page = self.resolve(&self.scholar, url).await?;
        let records = self.scholar_parser.parse(&page.html, terms);
        if records.is_empty() {
            return Err(SourceError::NoResults { url: url.to_string() });
        }

        tracing::debug!(url, count = records.len(), from_cache = page.from_cache, "Parsed page");
        Ok(CrawledPage {
            records,
            from_cache: page.from_cache,
        })
    }

    /// Keyword search on the academic search engine
    pub async fn search_scholar(&self, query: &ScholarQuery) -> Result<Vec<ArticleRecord>, SourceError> {
        if query.terms.is_empty() {
            return Err(SourceError::InvalidRequest("no search terms given".to_string()));
        }
        let url = query.url(&self.scholar_base);
        tracing::info!(url = %url, "Searching");
        Ok(self.scholar_page(&url, &query.terms).await?.records)
    }

    /// Walk the citation-management site's result pages and concatenate them.
    ///
    /// An empty first page is an error; an empty later page ends the walk.
    pub async fn search_citeulike(&self, query: &CiteULikeQuery) -> Result<Vec<ArticleRecord>, SourceError> {
        let mut records = Vec::new();

        for page in 1..=query.page_limit {
            let url = query.page_url(&self.citeulike_base, page);
            tracing::info!(page, url = %url, "Searching CiteULike");

            let fetched = self.resolve(&self.citeulike, &url).await?;
            let parsed = self.citeulike_parser.parse(&fetched.html, &query.tags);
            if parsed.is_empty() {
                if page == 1 {
                    return Err(SourceError::NoResults { url });
                }
                tracing::debug!(page, "No more results");
                break;
            }
            records.extend(parsed);
        }

        Ok(records)
    }

    /// Look `target` up by title and pick the matching result.
    ///
    /// Returns the candidate list together with the chosen index. The
    /// candidates are tagged with the target's tags, or with the words of its
    /// title when it has none.
    pub async fn find_article(
        &self,
        target: &ArticleRecord,
        strategy: MatchStrategy,
    ) -> Result<(Vec<ArticleRecord>, usize), SourceError> {
        let url = title_lookup_url(&self.scholar_base, target.title());
        tracing::info!(title = target.title(), "Looking up article");

        let terms = if target.tags().is_empty() {
            title_terms(target.title())
        } else {
            target.tags().to_vec()
        };
        let candidates = self.scholar_page(&url, &terms).await?.records;
        let index = match_article(target, &candidates, strategy)?;
        Ok((candidates, index))
    }

    async fn resolve(&self, fetcher: &RateLimitedFetcher, url: &str) -> Result<FetchedPage, SourceError> {
        match fetcher.fetch(url).await? {
            FetchOutcome::Page(page) => Ok(page),
            FetchOutcome::NeedsVerification(pending) => {
                let html = self.verifier.verify(&pending).await?;
                if fetcher.is_interstitial(&html) {
                    tracing::warn!(url = %pending.url, "Verified page is still the robot check");
                    return Err(SourceError::VerificationRequired(pending.url.clone()));
                }
                Ok(fetcher.complete_verification(&pending, html))
            }
        }
    }
}
