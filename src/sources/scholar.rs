//! Result-page parser for the academic search engine.
//!
//! Each result sits in a `div.gs_r` block. Two layouts occur:
//!
//! - a **normal** result, whose title container (`h3.gs_rt`) wraps an anchor
//!   holding both the title and the public URL;
//! - a **citation stub**, marked with the literal `[CITATION]` token, which has
//!   no hosted full text. Its title container usually holds bare text next to the
//!   marker spans, so the title is read from the container and the URL from the
//!   first link in the block.
//!
//! Authors, journal and year all live in a single byline (`div.gs_a`) of the
//! form `authors - journal, year - host`; see [`ScholarParser::parse_byline`].

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::models::{
    ArticleBuilder, ArticleRecord, ArticleSource, NO_ABSTRACT, UNAVAILABLE, UNKNOWN_LINK,
    UNKNOWN_YEAR,
};
use crate::sources::{PageParser, SourceError};

/// Literal token that marks a citation-only result
pub const CITATION_MARKER: &str = "[CITATION]";

const STUB_SHORT_MARKER: &str = "[C]";
const BYLINE_DELIMITER: &str = " - ";
const CITED_BY_LABEL: &str = "Cited by";
const RELATED_LABEL: &str = "Related articles";

/// Fields carried by a result's byline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Byline {
    pub authors: Vec<String>,
    pub journal: String,
    pub journal_url: String,
    pub year: i32,
}

/// Parser for the search engine's result pages.
///
/// Selectors and patterns are compiled once per parser instance.
#[derive(Debug, Clone)]
pub struct ScholarParser {
    block: Selector,
    anchor: Selector,
    span: Selector,
    title_container: Selector,
    title_fallback: Selector,
    byline: Selector,
    abstract_block: Selector,
    green_font: Regex,
    html_tag: Regex,
    integer: Regex,
    bare_integer: Regex,
    four_digits: Regex,
}

fn selector(css: &str) -> Result<Selector, SourceError> {
    Selector::parse(css)
        .map_err(|e| SourceError::Parse(format!("invalid selector {}: {:?}", css, e)))
}

fn pattern(re: &str) -> Result<Regex, SourceError> {
    Regex::new(re).map_err(|e| SourceError::Parse(format!("invalid pattern {}: {}", re, e)))
}

/// Collapse runs of whitespace (including non-breaking spaces) into single spaces
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_text(elem: &ElementRef) -> String {
    collapse_whitespace(&elem.text().collect::<String>())
}

impl ScholarParser {
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self {
            block: selector("div.gs_r")?,
            anchor: selector("a")?,
            span: selector("span")?,
            title_container: selector("div.gs_ri h3.gs_rt")?,
            title_fallback: selector("h3.gs_rt")?,
            byline: selector("div.gs_a")?,
            abstract_block: selector("div.gs_rs")?,
            green_font: pattern(r#"(?s)<font color="green">(.*?)</font>"#)?,
            html_tag: pattern(r"<[^>]+>")?,
            integer: pattern(r"\d+")?,
            bare_integer: pattern(r"(?:^|\s)(\d+)\b")?,
            four_digits: pattern(r"\d{4}")?,
        })
    }

    /// Split a byline into authors, journal name, journal URL and year.
    ///
    /// The layout is `authors - journal, year - host`:
    /// - authors: text before the first `" - "`, split on commas and trimmed;
    /// - journal URL: text after the last `" - "`;
    /// - journal: text between the first delimiter and the last comma before the final segment;
    /// - year: the first whitespace-preceded integer, [`UNKNOWN_YEAR`] if none.
    ///
    /// With a single delimiter and a four-digit number in the trailing segment,
    /// that number is the year and the journal URL is [`UNAVAILABLE`].
    pub fn parse_byline(&self, raw: &str) -> Byline {
        let text = raw.replace('\u{a0}', " ");
        let text = text.trim();

        let mut year = self
            .bare_integer
            .captures_iter(text)
            .find_map(|c| c.get(1).and_then(|m| m.as_str().parse::<i32>().ok()))
            .unwrap_or(UNKNOWN_YEAR);

        let (first, last) = match (text.find(BYLINE_DELIMITER), text.rfind(BYLINE_DELIMITER)) {
            (Some(first), Some(last)) => (first, last),
            _ => {
                tracing::debug!(byline = text, "Byline has no delimiter");
                return Byline {
                    authors: split_authors(text),
                    journal: String::new(),
                    journal_url: UNAVAILABLE.to_string(),
                    year,
                };
            }
        };

        let authors = split_authors(&text[..first]);
        let tail = text[last + BYLINE_DELIMITER.len()..].trim();

        let (journal, journal_url) = if first == last {
            match self.four_digits.find(tail) {
                Some(m) => {
                    if let Ok(embedded) = m.as_str().parse::<i32>() {
                        year = embedded;
                    }
                    (self.journal_name(tail), UNAVAILABLE.to_string())
                }
                None => (String::new(), tail.to_string()),
            }
        } else {
            let middle = &text[first + BYLINE_DELIMITER.len()..last];
            (self.journal_name(middle), tail.to_string())
        };

        if year == UNKNOWN_YEAR {
            tracing::debug!(byline = text, "No year in byline");
        }

        Byline {
            authors,
            journal,
            journal_url: if journal_url.is_empty() {
                UNAVAILABLE.to_string()
            } else {
                journal_url
            },
            year,
        }
    }

    /// Journal name: the segment up to its last comma, or the whole segment unless it is just a year
    fn journal_name(&self, segment: &str) -> String {
        let name = match segment.rfind(',') {
            Some(idx) => &segment[..idx],
            None if segment.trim().chars().all(|c| c.is_ascii_digit()) => "",
            None => segment,
        };
        name.trim().trim_start_matches('-').trim().to_string()
    }

    fn parse_block(&self, block: &ElementRef, search_terms: &[String]) -> Option<ArticleRecord> {
        let anchors: Vec<ElementRef> = block.select(&self.anchor).collect();
        if anchors.is_empty() {
            tracing::warn!("Result block has no links");
            return None;
        }

        let title_container = block
            .select(&self.title_container)
            .next()
            .or_else(|| block.select(&self.title_fallback).next());
        let Some(title_container) = title_container else {
            tracing::warn!("Result block has no title container");
            return None;
        };

        let is_stub = block.text().any(|t| t.contains(CITATION_MARKER));
        let (title, public_url) = if is_stub {
            self.stub_title(&title_container, &anchors)?
        } else {
            self.linked_title(&title_container)?
        };

        // A [PDF]/[HTML] side link is the only first anchor carrying spans
        let full_text_url = anchors
            .first()
            .filter(|a| a.select(&self.span).next().is_some())
            .and_then(|a| a.value().attr("href"))
            .unwrap_or(UNAVAILABLE)
            .to_string();

        let mut citations = 0;
        let mut citing_url = UNKNOWN_LINK.to_string();
        let mut related_url = UNKNOWN_LINK.to_string();
        for anchor in &anchors {
            let label = element_text(anchor);
            let href = anchor.value().attr("href").unwrap_or(UNKNOWN_LINK);
            if label.contains(CITED_BY_LABEL) {
                citations = self
                    .integer
                    .find(&label)
                    .and_then(|m| m.as_str().parse().ok())
                    .unwrap_or(0);
                citing_url = href.to_string();
            } else if label.contains(RELATED_LABEL) {
                related_url = href.to_string();
            }
        }

        let byline = self.byline_text(block);
        let Byline {
            authors,
            journal,
            journal_url,
            year,
        } = self.parse_byline(&byline);

        let abstract_text = block
            .select(&self.abstract_block)
            .next()
            .map(|a| element_text(&a))
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| {
                tracing::debug!(title = %title, "No abstract in result block");
                NO_ABSTRACT.to_string()
            });

        Some(
            ArticleBuilder::new(title, public_url, ArticleSource::GoogleScholar)
                .authors(authors)
                .year(year)
                .journal(journal)
                .journal_url(journal_url)
                .tags(search_terms.iter().cloned())
                .abstract_text(abstract_text)
                .full_text_url(full_text_url)
                .citing_url(citing_url)
                .related_url(related_url)
                .citations(citations)
                .build(),
        )
    }

    /// Title and URL from the anchor inside the title container
    fn linked_title(&self, container: &ElementRef) -> Option<(String, String)> {
        let anchor = container.select(&self.anchor).next()?;
        let title = element_text(&anchor);
        let href = anchor.value().attr("href")?;
        if title.is_empty() {
            return None;
        }
        Some((title, href.to_string()))
    }

    /// Title from the container text with the stub markers removed, URL from the first block link
    fn stub_title(&self, container: &ElementRef, anchors: &[ElementRef]) -> Option<(String, String)> {
        if let Some(linked) = self.linked_title(container) {
            return Some(linked);
        }

        let raw = container.text().collect::<String>();
        let title = collapse_whitespace(
            &raw.replace(CITATION_MARKER, "")
                .replace(STUB_SHORT_MARKER, ""),
        );
        if title.is_empty() {
            return None;
        }

        let href = anchors
            .iter()
            .filter_map(|a| a.value().attr("href"))
            .find(|h| !h.is_empty())?;
        Some((title, href.to_string()))
    }

    /// Byline text, falling back to a raw scan of the block's markup
    fn byline_text(&self, block: &ElementRef) -> String {
        if let Some(byline) = block.select(&self.byline).next() {
            let text = byline.text().collect::<String>();
            if !text.trim().is_empty() {
                return text;
            }
        }

        let markup = block.html();
        match self.green_font.captures(&markup).and_then(|c| c.get(1)) {
            Some(m) => {
                tracing::debug!("Byline recovered from raw markup");
                self.html_tag.replace_all(m.as_str(), "").into_owned()
            }
            None => String::new(),
        }
    }
}

impl PageParser for ScholarParser {
    fn id(&self) -> &str {
        "scholar"
    }

    fn parse(&self, html: &str, search_terms: &[String]) -> Vec<ArticleRecord> {
        let document = Html::parse_document(html);
        let mut records = Vec::new();

        for (position, block) in document.select(&self.block).enumerate() {
            match self.parse_block(&block, search_terms) {
                Some(record) => records.push(record),
                None => tracing::warn!(position, "Skipping malformed result block"),
            }
        }

        tracing::debug!(count = records.len(), "Parsed result page");
        records
    }
}

fn split_authors(segment: &str) -> Vec<String> {
    segment
        .split(',')
        .map(|a| a.trim().trim_end_matches('…').trim())
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> ScholarParser {
        ScholarParser::new().unwrap()
    }

    fn terms() -> Vec<String> {
        vec!["networks".to_string(), "dynamics".to_string()]
    }

    fn normal_block(title: &str, byline: &str, cited_by: u32) -> String {
        format!(
            r#"<div class="gs_r gs_or gs_scl">
  <div class="gs_ggs gs_fl"><div class="gs_ggsd"><a href="https://nature.com/{cited_by}.pdf"><span class="gs_ctg2">[PDF]</span> nature.com</a></div></div>
  <div class="gs_ri">
    <h3 class="gs_rt"><a href="https://nature.com/articles/{cited_by}">{title}</a></h3>
    <div class="gs_a">{byline}</div>
    <div class="gs_rs">We study the dynamics of small-world networks.</div>
    <div class="gs_fl">
      <a href="/scholar?cites={cited_by}&amp;as_sdt=2005&amp;hl=en">Cited by {cited_by}</a>
      <a href="/scholar?q=related:{cited_by}:scholar.google.com/&amp;hl=en">Related articles</a>
    </div>
  </div>
</div>"#
        )
    }

    fn stub_block(title: &str, byline: &str) -> String {
        format!(
            r#"<div class="gs_r gs_or gs_scl">
  <div class="gs_ri">
    <h3 class="gs_rt"><span class="gs_ctu"><span class="gs_ct1">[CITATION]</span><span class="gs_ct2">[C]</span></span> {title}</h3>
    <div class="gs_a">{byline}</div>
    <div class="gs_fl">
      <a href="/scholar?cites=7&amp;hl=en">Cited by 7</a>
      <a href="/scholar?q=related:7:scholar.google.com/">Related articles</a>
    </div>
  </div>
</div>"#
        )
    }

    fn page(blocks: &[String]) -> String {
        format!(
            "<html><body><div id=\"gs_res_ccl_mid\">{}</div></body></html>",
            blocks.join("\n")
        )
    }

    #[test]
    fn test_parse_returns_one_record_per_block() {
        let html = page(&[
            normal_block("Collective dynamics", "DJ Watts, SH Strogatz - Nature, 1998 - nature.com", 100),
            normal_block("Emergence of scaling", "AL Barabási, R Albert - Science, 1999 - science.org", 200),
            normal_block("Statistical mechanics", "R Albert, AL Barabási - Reviews of modern physics, 2002 - APS", 300),
        ]);

        let records = parser().parse(&html, &terms());
        assert_eq!(records.len(), 3);
        for record in &records {
            assert!(!record.title().is_empty());
            assert!(!record.public_url().is_empty());
            assert_eq!(record.tags(), terms().as_slice());
        }
        assert_eq!(records[1].title(), "Emergence of scaling");
        assert_eq!(records[2].year(), 2002);
    }

    #[test]
    fn test_normal_block_links_and_counts() {
        let html = page(&[normal_block(
            "Collective dynamics of small-world networks",
            "DJ Watts, SH Strogatz - Nature, 1998 - nature.com",
            42,
        )]);

        let records = parser().parse(&html, &terms());
        let record = &records[0];

        assert_eq!(record.public_url(), "https://nature.com/articles/42");
        assert_eq!(record.full_text_url(), "https://nature.com/42.pdf");
        assert_eq!(record.citations(), 42);
        assert_eq!(record.citing_url(), "/scholar?cites=42&as_sdt=2005&hl=en");
        assert_eq!(
            record.related_url(),
            "/scholar?q=related:42:scholar.google.com/&hl=en"
        );
        assert_eq!(
            record.abstract_text(),
            "We study the dynamics of small-world networks."
        );
        assert_eq!(record.source(), &ArticleSource::GoogleScholar);
    }

    #[test]
    fn test_full_text_unavailable_without_side_link() {
        let html = page(&[r#"<div class="gs_r"><div class="gs_ri">
            <h3 class="gs_rt"><a href="https://example.org/a">Plain result</a></h3>
            <div class="gs_a">A Author - Journal, 2010 - example.org</div>
        </div></div>"#
            .to_string()]);

        let records = parser().parse(&html, &[]);
        assert_eq!(records[0].full_text_url(), UNAVAILABLE);
        assert_eq!(records[0].citing_url(), UNKNOWN_LINK);
        assert_eq!(records[0].related_url(), UNKNOWN_LINK);
        assert_eq!(records[0].citations(), 0);
    }

    #[test]
    fn test_stub_and_normal_layouts_agree() {
        let byline = "JK Smith, AB Jones - Nature, 2001 - nature.com";
        let html = page(&[
            normal_block("On the theory of probes", byline, 7),
            stub_block("On the theory of probes", byline),
        ]);

        let records = parser().parse(&html, &terms());
        assert_eq!(records.len(), 2);

        let (normal, stub) = (&records[0], &records[1]);
        assert_eq!(stub.title(), normal.title());
        assert_eq!(stub.authors(), normal.authors());
        assert_eq!(stub.year(), normal.year());
        assert_eq!(stub.public_url(), "/scholar?cites=7&hl=en");
        assert_eq!(stub.full_text_url(), UNAVAILABLE);
        assert_eq!(stub.citations(), 7);
    }

    #[test]
    fn test_missing_abstract_uses_default() {
        let html = page(&[stub_block("No abstract here", "A Author - Journal, 1990 - host.org")]);

        let records = parser().parse(&html, &[]);
        assert_eq!(records[0].abstract_text(), "Abstract unavailable");
    }

    #[test]
    fn test_malformed_blocks_are_skipped() {
        let no_links = r#"<div class="gs_r"><div class="gs_ri"><h3 class="gs_rt">Orphan</h3></div></div>"#;
        let no_title = r#"<div class="gs_r"><div class="gs_ri"><a href="/x">Cited by 3</a></div></div>"#;
        let html = page(&[
            no_links.to_string(),
            normal_block("Kept result", "A Author - Journal, 2004 - host.org", 1),
            no_title.to_string(),
        ]);

        let records = parser().parse(&html, &[]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title(), "Kept result");
    }

    #[test]
    fn test_empty_page_parses_to_nothing() {
        let records = parser().parse("<html><body><p>Please show you're not a robot</p></body></html>", &[]);
        assert!(records.is_empty());
    }

    #[test]
    fn test_byline_full_layout() {
        let byline = parser().parse_byline("JK Smith, AB Jones - Nature, 2001 - nature.com");

        assert_eq!(byline.authors, vec!["JK Smith", "AB Jones"]);
        assert_eq!(byline.journal, "Nature");
        assert_eq!(byline.year, 2001);
        assert_eq!(byline.journal_url, "nature.com");
    }

    #[test]
    fn test_byline_single_delimiter_with_year() {
        let byline = parser().parse_byline("JK Smith - Physical Review, 1926");

        assert_eq!(byline.authors, vec!["JK Smith"]);
        assert_eq!(byline.year, 1926);
        assert_eq!(byline.journal_url, UNAVAILABLE);
        assert_eq!(byline.journal, "Physical Review");
    }

    #[test]
    fn test_byline_single_delimiter_without_year() {
        let byline = parser().parse_byline("JK Smith - nature.com");

        assert_eq!(byline.year, UNKNOWN_YEAR);
        assert_eq!(byline.journal_url, "nature.com");
        assert_eq!(byline.journal, "");
    }

    #[test]
    fn test_byline_without_delimiter() {
        let byline = parser().parse_byline("JK Smith, AB Jones");

        assert_eq!(byline.authors, vec!["JK Smith", "AB Jones"]);
        assert_eq!(byline.year, UNKNOWN_YEAR);
        assert_eq!(byline.journal_url, UNAVAILABLE);
        assert!(byline.journal.is_empty());
    }

    #[test]
    fn test_byline_non_breaking_spaces_and_ellipsis() {
        let byline = parser().parse_byline("DJ Watts, SH Strogatz…\u{a0}- nature, 1998 -\u{a0}nature.com");

        assert_eq!(byline.authors, vec!["DJ Watts", "SH Strogatz"]);
        assert_eq!(byline.journal, "nature");
        assert_eq!(byline.year, 1998);
        assert_eq!(byline.journal_url, "nature.com");
    }

    #[test]
    fn test_byline_falls_back_to_raw_markup() {
        let html = page(&[r#"<div class="gs_r"><div class="gs_ri">
            <h3 class="gs_rt"><a href="https://example.org/legacy">Legacy layout</a></h3>
            <font color="green">I Langmuir - Physical Review, 1926 - <b>APS</b></font>
        </div></div>"#
            .to_string()]);

        let records = parser().parse(&html, &[]);
        assert_eq!(records[0].authors(), ["I Langmuir"]);
        assert_eq!(records[0].year(), 1926);
        assert_eq!(records[0].journal(), "Physical Review");
        assert_eq!(records[0].journal_url(), "APS");
    }
}
