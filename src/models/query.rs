//! Search query models and URL construction for both sites.

use serde::{Deserialize, Serialize};

/// Keyword search against the academic search engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScholarQuery {
    /// Search terms, joined with spaces in the `q` parameter
    pub terms: Vec<String>,

    /// Maximum number of results to request
    pub limit: usize,

    /// Exclude citation-only entries from the results
    pub results_only: bool,
}

impl ScholarQuery {
    /// Create a new query for the given terms
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            terms: terms.into_iter().map(Into::into).collect(),
            limit: 10,
            results_only: false,
        }
    }

    /// Set the result limit
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Drop citation-only entries
    pub fn results_only(mut self, results_only: bool) -> Self {
        self.results_only = results_only;
        self
    }

    /// Full search URL under `base_url`
    pub fn url(&self, base_url: &str) -> String {
        let mut url = format!(
            "{}/scholar?q={}&num={}",
            base_url.trim_end_matches('/'),
            urlencoding::encode(&self.terms.join(" ")),
            self.limit
        );
        if self.results_only {
            url.push_str("&as_vis=1");
        }
        url
    }
}

/// URL that looks an article up by its title
pub fn title_lookup_url(base_url: &str, title: &str) -> String {
    format!(
        "{}/scholar?hl=en&q={}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(title)
    )
}

/// Search terms derived from a title: its lowercased words, punctuation stripped
pub fn title_terms(title: &str) -> Vec<String> {
    title
        .split_whitespace()
        .map(|word| {
            word.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|word| !word.is_empty())
        .collect()
}

/// URL of one page of a citing-articles result set.
///
/// `citing_url` is the link scraped from a result ("/scholar?cites=...") and may
/// be relative or absolute. The paging parameters go in front of the original
/// query string.
pub fn citing_page_url(base_url: &str, citing_url: &str, start: usize, per_page: usize) -> String {
    let base = base_url.trim_end_matches('/');
    let relative = citing_url.strip_prefix(base).unwrap_or(citing_url);
    let (path, query) = relative.split_once('?').unwrap_or((relative, ""));

    let mut url = format!("{}{}?start={}&num={}", base, path, start, per_page);
    if !query.is_empty() {
        url.push('&');
        url.push_str(query);
    }
    url
}

/// Structured search against the citation-management site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CiteULikeQuery {
    pub authors: Vec<String>,
    pub tags: Vec<String>,
    pub title: Option<String>,
    pub year_start: i32,
    pub year_end: i32,
    pub isbn: String,
    /// Number of result pages to walk
    pub page_limit: u32,
}

impl Default for CiteULikeQuery {
    fn default() -> Self {
        Self {
            authors: Vec::new(),
            tags: Vec::new(),
            title: None,
            year_start: 1800,
            year_end: 3000,
            isbn: "none".to_string(),
            page_limit: 2,
        }
    }
}

impl CiteULikeQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.authors.push(author.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn years(mut self, start: i32, end: i32) -> Self {
        self.year_start = start;
        self.year_end = end;
        self
    }

    pub fn isbn(mut self, isbn: impl Into<String>) -> Self {
        self.isbn = isbn.into();
        self
    }

    pub fn page_limit(mut self, pages: u32) -> Self {
        self.page_limit = pages;
        self
    }

    /// URL of result page `page` (1-based)
    pub fn page_url(&self, base_url: &str, page: u32) -> String {
        let mut url = format!(
            "{}/search/all/page/{}?q=",
            base_url.trim_end_matches('/'),
            page
        );

        if let Some(title) = &self.title {
            url.push_str(&format!("title%3A%22{}%22+", urlencoding::encode(title)));
        }
        for tag in &self.tags {
            url.push_str(&format!("tag%3A%22{}%22+", urlencoding::encode(tag)));
        }
        for author in &self.authors {
            url.push_str(&format!("author%3A%22{}%22+", urlencoding::encode(author)));
        }
        url.push_str(&format!(
            "year%3A%5B{}+TO+{}%5D",
            self.year_start, self.year_end
        ));
        url.push_str(&format!("+isbn%3A{}", urlencoding::encode(&self.isbn)));
        url
    }
}
