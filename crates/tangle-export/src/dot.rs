use std::collections::HashMap;

use tangle_core::snapshot::{AnalysisSnapshot, NodeRecord};
use tangle_core::types::{EdgeKind, ExportFormat, NodeKind};

use crate::Exporter;

/// Fill colors cycled over communities.
const PALETTE: &[&str] = &[
    "#e8f5e9", "#e3f2fd", "#fff3e0", "#fce4ec", "#ede7f6", "#e0f7fa", "#f9fbe7", "#efebe9",
];

pub struct DotExporter;

impl Exporter for DotExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Dot
    }

    fn file_name(&self, snapshot: &AnalysisSnapshot) -> Option<String> {
        Some(format!("{}.dot", snapshot.artifact_stem()))
    }

    fn render(&self, snapshot: &AnalysisSnapshot) -> anyhow::Result<String> {
        Ok(generate_dot(snapshot))
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Quote a string as a DOT ID.
fn quote(s: &str) -> String {
    format!("\"{}\"", escape(s))
}

/// Sanitize a string to be a bare DOT identifier.
fn sanitize_dot_id(s: &str) -> String {
    let cleaned: String = s
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if cleaned.is_empty() || cleaned.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{cleaned}")
    } else {
        cleaned
    }
}

fn node_line(node: &NodeRecord, indent: &str) -> String {
    let mut label = escape(&node.name);
    if let Some(sloc) = node.sloc.filter(|_| node.kind != NodeKind::External) {
        label.push_str(&format!("\\n{sloc} sloc"));
    }
    let style = if node.kind == NodeKind::External {
        ", style=dashed, fillcolor=\"#f5f5f5\""
    } else {
        ""
    };
    format!("{indent}{} [label=\"{label}\"{style}];\n", quote(&node.id))
}

/// Render a snapshot as a GraphViz digraph, one cluster per community.
pub fn generate_dot(snapshot: &AnalysisSnapshot) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "digraph {} {{\n",
        sanitize_dot_id(&snapshot.artifact_stem())
    ));
    out.push_str("  rankdir=LR;\n");
    out.push_str("  node [shape=box, style=filled, fillcolor=white];\n\n");

    let by_id: HashMap<&str, &NodeRecord> =
        snapshot.nodes.iter().map(|n| (n.id.as_str(), n)).collect();

    if snapshot.communities.is_empty() {
        for node in &snapshot.nodes {
            out.push_str(&node_line(node, "  "));
        }
    } else {
        for community in &snapshot.communities {
            let color = PALETTE[community.id % PALETTE.len()];
            out.push_str(&format!("  subgraph cluster_{} {{\n", community.id));
            out.push_str(&format!("    label=\"community {}\";\n", community.id));
            out.push_str("    style=filled;\n");
            out.push_str(&format!("    color=\"{color}\";\n"));
            for member in &community.members {
                if let Some(node) = by_id.get(member.as_str()) {
                    out.push_str(&node_line(node, "    "));
                }
            }
            out.push_str("  }\n\n");
        }
        // Nodes outside any community, e.g. from a partial partition.
        for node in snapshot.nodes.iter().filter(|n| n.community.is_none()) {
            out.push_str(&node_line(node, "  "));
        }
    }

    for edge in &snapshot.edges {
        let from = quote(&edge.source);
        let to = quote(&edge.target);
        let label = quote(&edge.statement);
        match edge.kind {
            EdgeKind::Import => out.push_str(&format!("  {from} -> {to} [label={label}];\n")),
            EdgeKind::Inheritance => out.push_str(&format!(
                "  {from} -> {to} [label={label}, arrowhead=empty];\n"
            )),
        }
    }

    out.push_str("}\n");
    out
}
