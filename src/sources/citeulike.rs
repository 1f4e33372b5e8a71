//! Result-page parser for the citation-management site.
//!
//! Every article is a table row carrying a `data-article_id` attribute. The
//! publication line holding the journal, date, volume, issue and DOI is the
//! element that contains the DOI link.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::models::{ArticleBuilder, ArticleRecord, ArticleSource, NO_ABSTRACT, UNKNOWN_YEAR};
use crate::sources::{PageParser, SourceError};

/// Parser for the citation-management site's search results
#[derive(Debug, Clone)]
pub struct CiteULikeParser {
    base_url: Url,
    row: Selector,
    title: Selector,
    author: Selector,
    tag: Selector,
    doi_link: Selector,
    journal: Selector,
    heading: Selector,
    year: Regex,
    volume: Regex,
    number: Regex,
}

fn selector(css: &str) -> Result<Selector, SourceError> {
    Selector::parse(css)
        .map_err(|e| SourceError::Parse(format!("invalid selector {}: {:?}", css, e)))
}

fn pattern(re: &str) -> Result<Regex, SourceError> {
    Regex::new(re).map_err(|e| SourceError::Parse(format!("invalid pattern {}: {}", re, e)))
}

fn text_of(elem: &ElementRef) -> String {
    elem.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

impl CiteULikeParser {
    pub fn new(base_url: impl Into<String>) -> Result<Self, SourceError> {
        let base_url = base_url.into();
        let base_url = Url::parse(&base_url)
            .map_err(|e| SourceError::InvalidRequest(format!("invalid base URL {}: {}", base_url, e)))?;
        Ok(Self {
            base_url,
            row: selector("tr[data-article_id]")?,
            title: selector("a.title")?,
            author: selector("a.author")?,
            tag: selector("span.taglist a")?,
            doi_link: selector("a[href*='doi.org']")?,
            journal: selector("i")?,
            heading: selector("h3")?,
            // The date may carry a day and month in front of the year
            year: pattern(r"\([0-9A-Za-z\s]*?(\d{4})\)")?,
            volume: pattern(r"Vol\.\s*(\d+)")?,
            number: pattern(r"No\.\s*(\d+)")?,
        })
    }

    fn absolute(&self, href: &str) -> String {
        self.base_url
            .join(href)
            .map(String::from)
            .unwrap_or_else(|_| href.to_string())
    }

    fn capture_int(re: &Regex, text: &str) -> Option<i32> {
        re.captures(text)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }

    /// Rows without a tag list are tagged with the search terms instead
    fn parse_row(&self, row: &ElementRef, search_terms: &[String]) -> Option<ArticleRecord> {
        let id = row
            .value()
            .attr("data-article_id")
            .and_then(|v| v.trim().parse::<u64>().ok());

        let title_link = row.select(&self.title).next()?;
        let title = text_of(&title_link);
        if title.is_empty() {
            return None;
        }
        let url = self.absolute(title_link.value().attr("href").unwrap_or_default());

        let authors: Vec<String> = row
            .select(&self.author)
            .map(|a| text_of(&a))
            .filter(|a| !a.is_empty())
            .collect();

        let mut tags: Vec<String> = row
            .select(&self.tag)
            .map(|t| text_of(&t))
            .filter(|t| !t.is_empty())
            .collect();
        if tags.is_empty() {
            tags = search_terms.to_vec();
        }

        let mut builder = ArticleBuilder::new(title, url, ArticleSource::CiteULike)
            .authors(authors)
            .tags(tags);

        if let Some(id) = id {
            builder = builder.citeulike_id(id);
        }

        if let Some(doi_link) = row.select(&self.doi_link).next() {
            let doi_text = text_of(&doi_link);
            let doi = doi_text
                .strip_prefix("doi:")
                .map(str::to_string)
                .or_else(|| {
                    doi_link
                        .value()
                        .attr("href")
                        .and_then(|h| h.split_once("doi.org/"))
                        .map(|(_, d)| d.to_string())
                });
            if let Some(doi) = doi.filter(|d| !d.is_empty()) {
                builder = builder.doi(doi.trim());
            }

            let line = doi_link.parent().and_then(ElementRef::wrap);
            if let Some(line) = line {
                let text = text_of(&line);
                match line.select(&self.journal).next() {
                    Some(journal) => builder = builder.journal(text_of(&journal)),
                    None => tracing::debug!(line = %text, "No journal title"),
                }
                builder = builder.year(Self::capture_int(&self.year, &text).unwrap_or(UNKNOWN_YEAR));
                if let Some(volume) = Self::capture_int(&self.volume, &text) {
                    builder = builder.volume(volume);
                }
                if let Some(number) = Self::capture_int(&self.number, &text) {
                    builder = builder.number(number);
                }
            }
        }

        let abstract_text = row
            .select(&self.heading)
            .find(|h| text_of(h) == "Abstract")
            .and_then(|h| {
                h.next_siblings()
                    .filter_map(ElementRef::wrap)
                    .find(|e| e.value().name() == "p")
            })
            .map(|p| text_of(&p))
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| NO_ABSTRACT.to_string());

        Some(builder.abstract_text(abstract_text).build())
    }
}

impl PageParser for CiteULikeParser {
    fn id(&self) -> &str {
        "citeulike"
    }

    fn parse(&self, html: &str, search_terms: &[String]) -> Vec<ArticleRecord> {
        let document = Html::parse_document(html);

        document
            .select(&self.row)
            .filter_map(|row| {
                let record = self.parse_row(&row, search_terms);
                if record.is_none() {
                    tracing::warn!("Skipping article row without a title");
                }
                record
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ABSENT;

    const MOTT_SMITH: &str = r#"
<html><body><table class="list">
<tr class="list {article_id:2534514}" data-article_id=2534514>
  <td>
    <h2><a class="title" href="/user/alek/article/2534514"><span class="unread">&nbsp;</span>The Theory of Collectors in Gaseous Discharges</a></h2>
    <div class="vague"><a class="author" href="/author/Mott-Smith">H. M. Mott-Smith</a>, <a class="author" href="/author/Langmuir">Irving Langmuir</a></div>
    <div class="pubinfo"><i>Physical Review</i>, Vol. 28, No. 4. (01 October 1926), pp. 727-763, <a href='http://dx.doi.org/10.1103/physrev.28.727'>doi:10.1103/physrev.28.727</a></div>
    <span class="taglist"><a href="/tag/langmuir">langmuir</a> <a href="/tag/probe">probe</a></span>
    <h3>Abstract</h3>
    <p>A theory of the current collected by probes.</p>
  </td>
</tr>
<tr class="list {article_id:99}" data-article_id=99>
  <td>
    <h2><a class="title" href="http://example.org/tonks">Oscillations in Ionized Gases</a></h2>
    <div class="vague"><a class="author" href="/author/Tonks">Lewi Tonks</a></div>
  </td>
</tr>
</table></body></html>"#;

    fn parser() -> CiteULikeParser {
        CiteULikeParser::new("http://www.citeulike.org").unwrap()
    }

    #[test]
    fn test_parse_full_row() {
        let records = parser().parse(MOTT_SMITH, &[]);
        assert_eq!(records.len(), 2);

        let record = &records[0];
        assert_eq!(record.title(), "The Theory of Collectors in Gaseous Discharges");
        assert_eq!(
            record.public_url(),
            "http://www.citeulike.org/user/alek/article/2534514"
        );
        assert_eq!(record.authors(), ["H. M. Mott-Smith", "Irving Langmuir"]);
        assert_eq!(record.journal(), "Physical Review");
        assert_eq!(record.year(), 1926);
        assert_eq!(record.volume(), 28);
        assert_eq!(record.number(), 4);
        assert_eq!(record.doi(), Some("10.1103/physrev.28.727"));
        assert_eq!(record.tags(), ["langmuir", "probe"]);
        assert_eq!(record.abstract_text(), "A theory of the current collected by probes.");
        assert_eq!(record.citeulike_id(), Some(2534514));
        assert_eq!(record.source(), &ArticleSource::CiteULike);
    }

    #[test]
    fn test_sparse_row_falls_back_to_sentinels() {
        let terms = vec!["plasma".to_string()];
        let records = parser().parse(MOTT_SMITH, &terms);
        let record = &records[1];

        assert_eq!(record.public_url(), "http://example.org/tonks");
        assert_eq!(record.year(), UNKNOWN_YEAR);
        assert_eq!(record.volume(), ABSENT);
        assert_eq!(record.number(), ABSENT);
        assert!(record.doi().is_none());
        assert!(record.journal().is_empty());
        assert_eq!(record.abstract_text(), NO_ABSTRACT);
        assert_eq!(record.tags(), ["plasma"]);
        assert_eq!(record.citeulike_id(), Some(99));
    }

    #[test]
    fn test_page_without_rows() {
        assert!(parser().parse("<html><body>nothing</body></html>", &[]).is_empty());
    }
}
