//! Picking the search result that corresponds to a known article.

use crate::models::ArticleRecord;
use crate::sources::SourceError;

/// How [`match_article`] chooses among same-year candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum MatchStrategy {
    /// Every same-year candidate that raises the best author similarity
    /// becomes the running best similarity; it is selected only if it has
    /// at least one citation.
    #[default]
    Strict,
    /// Highest author similarity wins, citation count breaks ties
    Ranked,
}

/// Similarity of the two author strings in `[0, 1]`
pub fn author_similarity(a: &ArticleRecord, b: &ArticleRecord) -> f64 {
    strsim::normalized_levenshtein(
        &a.author_string().to_lowercase(),
        &b.author_string().to_lowercase(),
    )
}

/// Index of the candidate that best corresponds to `target`.
///
/// Only candidates with the same year are considered. When none qualifies the
/// result is 0, the top search hit.
pub fn match_article(
    target: &ArticleRecord,
    candidates: &[ArticleRecord],
    strategy: MatchStrategy,
) -> Result<usize, SourceError> {
    if candidates.is_empty() {
        return Err(SourceError::NotFound(format!(
            "no search results for '{}'",
            target.title()
        )));
    }

    let same_year = candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| c.year() == target.year())
        .map(|(i, c)| (i, author_similarity(target, c), c.citations()));

    let mut best = 0;
    let mut best_similarity = 0.0;
    let mut best_citations = 0;

    for (index, similarity, citations) in same_year {
        match strategy {
            MatchStrategy::Strict => {
                if similarity > best_similarity {
                    best_similarity = similarity;
                    if citations > 0 {
                        best = index;
                    }
                }
            }
            MatchStrategy::Ranked => {
                if similarity > best_similarity
                    || (similarity == best_similarity && citations > best_citations)
                {
                    best = index;
                    best_similarity = similarity;
                    best_citations = citations;
                }
            }
        }
    }

    tracing::debug!(
        title = target.title(),
        index = best,
        similarity = best_similarity,
        "Matched search result"
    );
    Ok(best)
}
