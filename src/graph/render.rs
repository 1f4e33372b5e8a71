//! Graph export as Graphviz DOT or JSON.

use petgraph::dot::{Config as DotConfig, Dot};
use serde_json::{json, Value};
use std::path::Path;

use super::CitationGraph;
use crate::models::ArticleRecord;
use crate::sources::SourceError;

/// Output format for [`write_graph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    Dot,
    Json,
}

impl GraphFormat {
    /// Guess the format from a file extension; anything but `.json` is DOT
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => GraphFormat::Json,
            _ => GraphFormat::Dot,
        }
    }
}

const LABEL_TITLE_CHARS: usize = 30;

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn node_attributes(record: &ArticleRecord) -> String {
    let mut title: String = record.title().chars().take(LABEL_TITLE_CHARS).collect();
    if record.title().chars().count() > LABEL_TITLE_CHARS {
        title.push_str("...");
    }
    let year = if record.has_known_year() {
        record.year().to_string()
    } else {
        "?".to_string()
    };

    format!(
        "label = \"{}\\n{} | cited by {}\" year = {} citations = {}",
        escape(&title),
        year,
        record.citations(),
        record.year(),
        record.citations()
    )
}

/// Render the graph as Graphviz DOT
pub fn to_dot(graph: &CitationGraph) -> String {
    let dot = Dot::with_attr_getters(
        graph.inner(),
        &[DotConfig::NodeNoLabel, DotConfig::EdgeNoLabel],
        &|_, _| String::new(),
        &|_, (_, record)| node_attributes(record),
    );
    format!("{}", dot)
}

/// Render the graph as a JSON document of nodes and edges
pub fn to_json(graph: &CitationGraph) -> Value {
    let nodes: Vec<Value> = graph
        .records()
        .map(|(index, record)| {
            json!({
                "id": index.index(),
                "title": record.title(),
                "year": record.year(),
                "citations": record.citations(),
                "authors": record.authors(),
                "public_url": record.public_url(),
            })
        })
        .collect();

    let edges: Vec<Value> = graph
        .edges()
        .into_iter()
        .map(|(source, target)| json!({ "source": source, "target": target }))
        .collect();

    json!({ "nodes": nodes, "edges": edges })
}

/// Write the graph to `path` in `format`
pub fn write_graph(graph: &CitationGraph, path: &Path, format: GraphFormat) -> Result<(), SourceError> {
    let content = match format {
        GraphFormat::Dot => to_dot(graph),
        GraphFormat::Json => serde_json::to_string_pretty(&to_json(graph))?,
    };
    std::fs::write(path, content)?;
    tracing::info!(path = %path.display(), nodes = graph.node_count(), edges = graph.edge_count(), "Wrote graph");
    Ok(())
}
