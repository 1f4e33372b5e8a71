//! Growing a citation graph one article at a time.

use indicatif::ProgressBar;
use petgraph::graph::NodeIndex;
use serde::Serialize;

use super::{CitationGraph, NodeIdentity};
use crate::config::ScholarConfig;
use crate::crawl::Crawler;
use crate::models::ArticleRecord;
use crate::sources::SourceError;

/// Pagination and merge settings for [`CitationGraphBuilder`]
#[derive(Debug, Clone, Copy)]
pub struct ExpandOptions {
    /// Citing results requested per page
    pub per_page: usize,
    /// Citing results the site will list at most
    pub max_citing: usize,
    pub identity: NodeIdentity,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self::from_config(&ScholarConfig::default())
    }
}

impl ExpandOptions {
    pub fn from_config(config: &ScholarConfig) -> Self {
        Self {
            per_page: config.results_per_page.max(1),
            max_citing: config.max_citing_results,
            identity: NodeIdentity::default(),
        }
    }

    pub fn identity(mut self, identity: NodeIdentity) -> Self {
        self.identity = identity;
        self
    }
}

/// What one or more expansions did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExpandReport {
    pub pages_fetched: usize,
    pub pages_from_cache: usize,
    pub records_fetched: usize,
    pub nodes_added: usize,
    pub nodes_merged: usize,
    pub edges_added: usize,
}

impl ExpandReport {
    fn absorb(&mut self, other: ExpandReport) {
        self.pages_fetched += other.pages_fetched;
        self.pages_from_cache += other.pages_from_cache;
        self.records_fetched += other.records_fetched;
        self.nodes_added += other.nodes_added;
        self.nodes_merged += other.nodes_merged;
        self.edges_added += other.edges_added;
    }
}

/// Fetches the citing articles of a node and links them into the graph
#[derive(Debug)]
pub struct CitationGraphBuilder<'a> {
    crawler: &'a Crawler,
    options: ExpandOptions,
    progress: ProgressBar,
}

impl<'a> CitationGraphBuilder<'a> {
    pub fn new(crawler: &'a Crawler, options: ExpandOptions) -> Self {
        Self {
            crawler,
            options,
            progress: ProgressBar::hidden(),
        }
    }

    /// Report each fetched page on `progress`
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Offsets of the citing pages for an article with `citations` citing results
    pub fn page_offsets(&self, citations: u32) -> Vec<usize> {
        let total = (citations as usize).min(self.options.max_citing);
        (0..total).step_by(self.options.per_page.max(1)).collect()
    }

    /// Fetch every page of articles citing `target` and add them to the graph.
    ///
    /// Records are kept in fetch order and `limit` keeps the first `limit` of
    /// them. Any page failure aborts the expansion before the graph is touched.
    pub async fn expand(
        &self,
        graph: &mut CitationGraph,
        target: NodeIndex,
        limit: Option<usize>,
    ) -> Result<ExpandReport, SourceError> {
        let record = graph
            .record(target)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(format!("node {} is not in the graph", target.index())))?;

        let mut report = ExpandReport::default();
        let offsets = self.page_offsets(record.citations());
        if offsets.is_empty() {
            tracing::debug!(title = record.title(), "No citing articles");
            return Ok(report);
        }
        if !record.has_citing_url() {
            tracing::warn!(title = record.title(), "Cited-by count without a citing link");
            return Ok(report);
        }

        let citing = self.fetch_citing(&record, &offsets, &mut report).await?;
        report.records_fetched = citing.len();

        let kept = match limit {
            Some(limit) => citing.into_iter().take(limit).collect::<Vec<_>>(),
            None => citing,
        };

        for article in kept {
            let (index, added) = graph.add_node(article, self.options.identity);
            if added {
                report.nodes_added += 1;
            } else {
                report.nodes_merged += 1;
            }
            if graph.add_citation(target, index) {
                report.edges_added += 1;
            }
        }

        tracing::info!(
            title = record.title(),
            pages = report.pages_fetched,
            added = report.nodes_added,
            merged = report.nodes_merged,
            "Expanded article"
        );
        Ok(report)
    }

    /// Expand `root`, then every node that expansion added, level by level
    pub async fn expand_depth(
        &self,
        graph: &mut CitationGraph,
        root: NodeIndex,
        limit: Option<usize>,
        depth: usize,
    ) -> Result<ExpandReport, SourceError> {
        let mut report = ExpandReport::default();
        let mut frontier = vec![root];

        for level in 0..depth {
            let mut next = Vec::new();
            for node in frontier {
                let first_new = graph.node_count();
                report.absorb(self.expand(graph, node, limit).await?);
                next.extend((first_new..graph.node_count()).map(NodeIndex::new));
            }
            tracing::debug!(level, next = next.len(), "Finished level");
            if next.is_empty() {
                break;
            }
            frontier = next;
        }

        Ok(report)
    }

    async fn fetch_citing(
        &self,
        record: &ArticleRecord,
        offsets: &[usize],
        report: &mut ExpandReport,
    ) -> Result<Vec<ArticleRecord>, SourceError> {
        self.progress.set_length(offsets.len() as u64);
        self.progress.set_position(0);
        self.progress.set_message(short_title(record.title()));

        let mut citing = Vec::new();
        for &start in offsets {
            let url = self
                .crawler
                .citing_page_url(record.citing_url(), start, self.options.per_page);
            tracing::info!(start, url = %url, "Fetching citing articles");

            let page = self.crawler.scholar_page(&url, record.tags()).await?;
            report.pages_fetched += 1;
            if page.from_cache {
                report.pages_from_cache += 1;
            }
            citing.extend(page.records);
            self.progress.inc(1);
        }
        Ok(citing)
    }
}

fn short_title(title: &str) -> String {
    const MAX: usize = 40;
    if title.chars().count() <= MAX {
        title.to_string()
    } else {
        format!("{}...", title.chars().take(MAX).collect::<String>())
    }
}
