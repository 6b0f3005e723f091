use anyhow::Context;
use serde::Serialize;

use tangle_core::snapshot::AnalysisSnapshot;
use tangle_core::types::{EdgeKind, ExportFormat, NodeKind};

use crate::Exporter;

/// Force-directed layout input: `{ "nodes": [...], "links": [...] }`.
#[derive(Debug, Serialize)]
struct ForceGraph<'a> {
    nodes: Vec<ForceNode<'a>>,
    links: Vec<ForceLink<'a>>,
}

#[derive(Debug, Serialize)]
struct ForceNode<'a> {
    id: &'a str,
    name: &'a str,
    kind: NodeKind,
    /// Community id, or 0 when communities were not computed.
    group: usize,
    /// Rendered radius hint.
    size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    fan_in: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fan_out: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ForceLink<'a> {
    source: &'a str,
    target: &'a str,
    statement: &'a str,
    kind: EdgeKind,
    value: u32,
}

pub struct D3Exporter;

impl Exporter for D3Exporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::D3
    }

    fn file_name(&self, snapshot: &AnalysisSnapshot) -> Option<String> {
        Some(format!("{}_d3.json", snapshot.artifact_stem()))
    }

    fn render(&self, snapshot: &AnalysisSnapshot) -> anyhow::Result<String> {
        format_force_graph(snapshot)
    }
}

pub fn format_force_graph(snapshot: &AnalysisSnapshot) -> anyhow::Result<String> {
    let graph = ForceGraph {
        nodes: snapshot
            .nodes
            .iter()
            .map(|n| ForceNode {
                id: &n.id,
                name: &n.name,
                kind: n.kind,
                group: n.community.unwrap_or(0),
                size: n.sloc.unwrap_or(0).max(1),
                fan_in: n.fan_in,
                fan_out: n.fan_out,
            })
            .collect(),
        links: snapshot
            .edges
            .iter()
            .map(|e| ForceLink {
                source: &e.source,
                target: &e.target,
                statement: &e.statement,
                kind: e.kind,
                value: 1,
            })
            .collect(),
    };
    let mut json = serde_json::to_string_pretty(&graph).context("failed to serialize d3 graph")?;
    json.push('\n');
    Ok(json)
}
