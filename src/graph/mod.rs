//! Citation graph storage.
//!
//! Nodes are [`ArticleRecord`]s indexed in insertion order; an edge `u -> v`
//! means `v` cites `u`. Nodes are never removed, so an index handed out once
//! stays valid for the life of the graph.

mod builder;
mod render;

pub use builder::{CitationGraphBuilder, ExpandOptions, ExpandReport};
pub use render::{to_dot, to_json, write_graph, GraphFormat};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::ArticleRecord;

/// Edge weight: the head article cites the tail article
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cites;

impl std::fmt::Display for Cites {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("cites")
    }
}

/// How incoming records are matched against nodes already in the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeIdentity {
    /// Every record becomes a new node, duplicates included
    None,
    /// Records with the same [`ArticleRecord::identity_key`] share a node
    #[default]
    Fingerprint,
}

#[derive(Debug, Clone, Default)]
pub struct CitationGraph {
    graph: DiGraph<ArticleRecord, Cites>,
    identities: HashMap<String, NodeIndex>,
}

impl CitationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Graph holding a single root article
    pub fn with_root(root: ArticleRecord) -> (Self, NodeIndex) {
        let mut graph = Self::new();
        let (index, _) = graph.add_node(root, NodeIdentity::Fingerprint);
        (graph, index)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn record(&self, index: NodeIndex) -> Option<&ArticleRecord> {
        self.graph.node_weight(index)
    }

    /// Records in index order
    pub fn records(&self) -> impl Iterator<Item = (NodeIndex, &ArticleRecord)> {
        self.graph
            .node_indices()
            .filter_map(move |i| self.graph.node_weight(i).map(|r| (i, r)))
    }

    /// Edges as `(cited, citing)` index pairs, in insertion order
    pub fn edges(&self) -> Vec<(usize, usize)> {
        self.graph
            .edge_references()
            .map(|e| (e.source().index(), e.target().index()))
            .collect()
    }

    /// Node already holding an article with this identity key
    pub fn find(&self, identity_key: &str) -> Option<NodeIndex> {
        self.identities.get(identity_key).copied()
    }

    /// Insert `record`, or reuse the node it duplicates.
    ///
    /// Returns the node index and whether a new node was created.
    pub fn add_node(&mut self, record: ArticleRecord, identity: NodeIdentity) -> (NodeIndex, bool) {
        let key = record.identity_key();

        if identity == NodeIdentity::Fingerprint {
            if let Some(existing) = self.identities.get(&key) {
                tracing::debug!(key = %key, index = existing.index(), "Merged duplicate article");
                return (*existing, false);
            }
        }

        let index = self.graph.add_node(record);
        self.identities.entry(key).or_insert(index);
        (index, true)
    }

    /// Record that `citing` cites `cited`.
    ///
    /// Self-loops, duplicate edges and unknown indices are refused.
    pub fn add_citation(&mut self, cited: NodeIndex, citing: NodeIndex) -> bool {
        if cited == citing
            || self.graph.node_weight(cited).is_none()
            || self.graph.node_weight(citing).is_none()
            || self.graph.contains_edge(cited, citing)
        {
            return false;
        }
        self.graph.add_edge(cited, citing, Cites);
        true
    }

    /// Articles citing `index`
    pub fn citing(&self, index: NodeIndex) -> Vec<NodeIndex> {
        let mut citing: Vec<_> = self.graph.neighbors(index).collect();
        citing.sort();
        citing
    }

    pub fn inner(&self) -> &DiGraph<ArticleRecord, Cites> {
        &self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArticleBuilder, ArticleSource};

    fn article(title: &str, author: &str, year: i32) -> ArticleRecord {
        ArticleBuilder::new(title, format!("http://example.org/{}", title), ArticleSource::GoogleScholar)
            .authors([author])
            .year(year)
            .build()
    }

    #[test]
    fn test_indices_follow_insertion_order() {
        let (mut graph, root) = CitationGraph::with_root(article("Root", "A Smith", 2000));
        let (a, _) = graph.add_node(article("First", "B Jones", 2001), NodeIdentity::Fingerprint);
        let (b, _) = graph.add_node(article("Second", "C Brown", 2002), NodeIdentity::Fingerprint);

        assert_eq!((root.index(), a.index(), b.index()), (0, 1, 2));
        let titles: Vec<_> = graph.records().map(|(_, r)| r.title().to_string()).collect();
        assert_eq!(titles, ["Root", "First", "Second"]);
    }

    #[test]
    fn test_fingerprint_merges_duplicates() {
        let mut graph = CitationGraph::new();
        let (first, added) = graph.add_node(article("Graph Theory", "A Smith", 2000), NodeIdentity::Fingerprint);
        assert!(added);

        let (again, added) = graph.add_node(article("graph theory!", "Alan Smith", 2000), NodeIdentity::Fingerprint);
        assert!(!added);
        assert_eq!(first, again);
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn test_identity_none_keeps_duplicates() {
        let mut graph = CitationGraph::new();
        let (first, _) = graph.add_node(article("Graph Theory", "A Smith", 2000), NodeIdentity::None);
        let (second, added) = graph.add_node(article("Graph Theory", "A Smith", 2000), NodeIdentity::None);

        assert!(added);
        assert_ne!(first, second);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.find(&graph.record(first).unwrap().identity_key()), Some(first));
    }

    #[test]
    fn test_citation_edges_are_validated() {
        let (mut graph, root) = CitationGraph::with_root(article("Root", "A Smith", 2000));
        let (citing, _) = graph.add_node(article("Citing", "B Jones", 2005), NodeIdentity::Fingerprint);

        assert!(graph.add_citation(root, citing));
        assert!(!graph.add_citation(root, citing));
        assert!(!graph.add_citation(root, root));
        assert!(!graph.add_citation(root, NodeIndex::new(42)));

        assert_eq!(graph.edges(), vec![(0, 1)]);
        assert_eq!(graph.citing(root), vec![citing]);
    }
}
