//! Core data models for article records and search queries.

mod article;
mod query;

pub use article::{
    normalize_title, ArticleBuilder, ArticleRecord, ArticleSource, ABSENT, NO_ABSTRACT,
    UNAVAILABLE, UNKNOWN_LINK, UNKNOWN_YEAR,
};
pub use query::{citing_page_url, title_lookup_url, title_terms, CiteULikeQuery, ScholarQuery};
