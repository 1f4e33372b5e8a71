//! Article record representing one bibliographic entry scraped from a result page.

use serde::{Deserialize, Serialize};

/// Year recorded when none could be parsed
pub const UNKNOWN_YEAR: i32 = 9999;

/// Volume/number recorded when the page does not show one
pub const ABSENT: i32 = -1;

/// Placeholder for URLs the page did not offer
pub const UNAVAILABLE: &str = "Unavailable";

/// Placeholder for navigation links that were not found
pub const UNKNOWN_LINK: &str = "UNKNOWN";

/// Abstract used when the result block has none
pub const NO_ABSTRACT: &str = "Abstract unavailable";

/// The site a record was scraped from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleSource {
    GoogleScholar,
    CiteULike,
    /// Built by hand, e.g. the target of a graph crawl given on the command line
    Manual,
}

impl ArticleSource {
    /// Returns the display name of the source
    pub fn name(&self) -> &str {
        match self {
            ArticleSource::GoogleScholar => "Google Scholar",
            ArticleSource::CiteULike => "CiteULike",
            ArticleSource::Manual => "Manual",
        }
    }
}

impl std::fmt::Display for ArticleSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A bibliographic record.
///
/// Records are assembled once through [`ArticleBuilder`] and never mutated
/// afterwards; all fields are read through accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    title: String,
    authors: Vec<String>,
    year: i32,
    journal: String,
    journal_url: String,
    doi: Option<String>,
    volume: i32,
    number: i32,
    tags: Vec<String>,
    r#abstract: String,
    full_text_url: String,
    public_url: String,
    citing_url: String,
    related_url: String,
    citations: u32,
    source: ArticleSource,
    citeulike_id: Option<u64>,
}

impl ArticleRecord {
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Authors in display order
    pub fn authors(&self) -> &[String] {
        &self.authors
    }

    /// Publication year, [`UNKNOWN_YEAR`] if it could not be parsed
    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn has_known_year(&self) -> bool {
        self.year != UNKNOWN_YEAR
    }

    pub fn journal(&self) -> &str {
        &self.journal
    }

    pub fn journal_url(&self) -> &str {
        &self.journal_url
    }

    pub fn doi(&self) -> Option<&str> {
        self.doi.as_deref()
    }

    pub fn volume(&self) -> i32 {
        self.volume
    }

    pub fn number(&self) -> i32 {
        self.number
    }

    /// Search terms that produced this record
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn abstract_text(&self) -> &str {
        &self.r#abstract
    }

    pub fn full_text_url(&self) -> &str {
        &self.full_text_url
    }

    pub fn public_url(&self) -> &str {
        &self.public_url
    }

    /// Link to the page listing articles that cite this one
    pub fn citing_url(&self) -> &str {
        &self.citing_url
    }

    pub fn related_url(&self) -> &str {
        &self.related_url
    }

    pub fn has_citing_url(&self) -> bool {
        self.citing_url != UNKNOWN_LINK && !self.citing_url.is_empty()
    }

    /// Number of times this article is cited
    pub fn citations(&self) -> u32 {
        self.citations
    }

    pub fn source(&self) -> &ArticleSource {
        &self.source
    }

    pub fn citeulike_id(&self) -> Option<u64> {
        self.citeulike_id
    }

    /// All author names concatenated without separators, as compared by the matcher
    pub fn author_string(&self) -> String {
        self.authors.concat()
    }

    /// Fingerprint used to recognise the same article reached via different pages.
    ///
    /// Combines the normalized title, the year and the surname-ish last token of
    /// the first author. Neither site exposes a stable publication id.
    pub fn identity_key(&self) -> String {
        let first_author = self
            .authors
            .first()
            .and_then(|a| a.split_whitespace().last())
            .map(|s| s.to_lowercase())
            .unwrap_or_default();

        format!(
            "{}|{}|{}",
            normalize_title(&self.title),
            self.year,
            first_author
        )
    }
}

impl std::fmt::Display for ArticleRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.title, self.authors.join(", "))?;
        if self.has_known_year() {
            write!(f, ", {}", self.year)?;
        }
        if !self.journal.is_empty() {
            write!(f, ", {}", self.journal)?;
        }
        write!(f, " [cited by {}]", self.citations)
    }
}

/// Normalize a title for comparison
pub fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Builder for constructing [`ArticleRecord`] values
#[derive(Debug, Clone)]
pub struct ArticleBuilder {
    record: ArticleRecord,
}

impl ArticleBuilder {
    /// Create a new builder with the required fields; everything else starts at its sentinel
    pub fn new(title: impl Into<String>, public_url: impl Into<String>, source: ArticleSource) -> Self {
        Self {
            record: ArticleRecord {
                title: title.into(),
                authors: Vec::new(),
                year: UNKNOWN_YEAR,
                journal: String::new(),
                journal_url: UNAVAILABLE.to_string(),
                doi: None,
                volume: ABSENT,
                number: ABSENT,
                tags: Vec::new(),
                r#abstract: NO_ABSTRACT.to_string(),
                full_text_url: UNAVAILABLE.to_string(),
                public_url: public_url.into(),
                citing_url: UNKNOWN_LINK.to_string(),
                related_url: UNKNOWN_LINK.to_string(),
                citations: 0,
                source,
                citeulike_id: None,
            },
        }
    }

    /// Set authors
    pub fn authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.record.authors = authors.into_iter().map(Into::into).collect();
        self
    }

    pub fn year(mut self, year: i32) -> Self {
        self.record.year = year;
        self
    }

    pub fn journal(mut self, journal: impl Into<String>) -> Self {
        self.record.journal = journal.into();
        self
    }

    pub fn journal_url(mut self, url: impl Into<String>) -> Self {
        self.record.journal_url = url.into();
        self
    }

    pub fn doi(mut self, doi: impl Into<String>) -> Self {
        self.record.doi = Some(doi.into());
        self
    }

    pub fn volume(mut self, volume: i32) -> Self {
        self.record.volume = volume;
        self
    }

    pub fn number(mut self, number: i32) -> Self {
        self.record.number = number;
        self
    }

    /// Set the search terms that produced the record
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.record.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Set abstract
    pub fn abstract_text(mut self, abstract_text: impl Into<String>) -> Self {
        self.record.r#abstract = abstract_text.into();
        self
    }

    pub fn full_text_url(mut self, url: impl Into<String>) -> Self {
        self.record.full_text_url = url.into();
        self
    }

    pub fn citing_url(mut self, url: impl Into<String>) -> Self {
        self.record.citing_url = url.into();
        self
    }

    pub fn related_url(mut self, url: impl Into<String>) -> Self {
        self.record.related_url = url.into();
        self
    }

    /// Set citation count
    pub fn citations(mut self, count: u32) -> Self {
        self.record.citations = count;
        self
    }

    pub fn citeulike_id(mut self, id: u64) -> Self {
        self.record.citeulike_id = Some(id);
        self
    }

    /// Build the record
    pub fn build(self) -> ArticleRecord {
        self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let record = ArticleBuilder::new("A title", "https://example.com/a", ArticleSource::GoogleScholar).build();

        assert_eq!(record.year(), UNKNOWN_YEAR);
        assert!(!record.has_known_year());
        assert_eq!(record.journal_url(), UNAVAILABLE);
        assert_eq!(record.full_text_url(), UNAVAILABLE);
        assert_eq!(record.citing_url(), UNKNOWN_LINK);
        assert_eq!(record.related_url(), UNKNOWN_LINK);
        assert_eq!(record.abstract_text(), NO_ABSTRACT);
        assert_eq!(record.volume(), ABSENT);
        assert_eq!(record.number(), ABSENT);
        assert_eq!(record.citations(), 0);
        assert!(record.doi().is_none());
        assert!(!record.has_citing_url());
    }

    #[test]
    fn test_builder_sets_all_fields() {
        let record = ArticleBuilder::new(
            "The Theory of Collectors in Gaseous Discharges",
            "https://example.com/mott",
            ArticleSource::Manual,
        )
        .authors(["H.M. Mott-Smith", "Irving Langmuir"])
        .year(1926)
        .journal("Physical Review")
        .doi("10.1103/physrev.28.727")
        .volume(28)
        .number(4)
        .citations(1500)
        .citing_url("/scholar?cites=42")
        .build();

        assert_eq!(record.authors(), ["H.M. Mott-Smith", "Irving Langmuir"]);
        assert_eq!(record.year(), 1926);
        assert_eq!(record.doi(), Some("10.1103/physrev.28.727"));
        assert_eq!(record.volume(), 28);
        assert_eq!(record.number(), 4);
        assert_eq!(record.citations(), 1500);
        assert!(record.has_citing_url());
        assert_eq!(record.author_string(), "H.M. Mott-SmithIrving Langmuir");
    }

    #[test]
    fn test_identity_key_ignores_case_and_punctuation() {
        let a = ArticleBuilder::new("Probe Theory: A Review", "u1", ArticleSource::GoogleScholar)
            .authors(["I Langmuir", "HM Mott-Smith"])
            .year(1926)
            .build();
        let b = ArticleBuilder::new("probe theory   a review", "u2", ArticleSource::GoogleScholar)
            .authors(["I langmuir"])
            .year(1926)
            .build();
        let c = ArticleBuilder::new("Probe Theory: A Review", "u3", ArticleSource::GoogleScholar)
            .authors(["I Langmuir"])
            .year(1927)
            .build();

        assert_eq!(a.identity_key(), b.identity_key());
        assert_ne!(a.identity_key(), c.identity_key());
    }

    #[test]
    fn test_serde_roundtrip_keeps_abstract_field() {
        let record = ArticleBuilder::new("T", "u", ArticleSource::CiteULike)
            .abstract_text("Some abstract")
            .citeulike_id(2534514)
            .build();

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["abstract"], "Some abstract");
        assert_eq!(json["source"], "citeulike");

        let back: ArticleRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
