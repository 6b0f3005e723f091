use tangle_core::snapshot::{AnalysisSnapshot, NodeRecord};
use tangle_core::types::ExportFormat;

use crate::{escape_xml, Exporter};

/// `(id, for, name, type)` of every declared attribute.
const KEYS: &[(&str, &str, &str, &str)] = &[
    ("d0", "node", "name", "string"),
    ("d1", "node", "kind", "string"),
    ("d2", "node", "language", "string"),
    ("d3", "node", "path", "string"),
    ("d4", "node", "sloc", "int"),
    ("d5", "node", "methods", "int"),
    ("d6", "node", "fan_in", "int"),
    ("d7", "node", "fan_out", "int"),
    ("d8", "node", "community", "int"),
    ("d9", "node", "keywords", "string"),
    ("d10", "edge", "statement", "string"),
    ("d11", "edge", "kind", "string"),
];

pub struct GraphmlExporter;

impl Exporter for GraphmlExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Graphml
    }

    fn file_name(&self, snapshot: &AnalysisSnapshot) -> Option<String> {
        Some(format!("{}.graphml", snapshot.artifact_stem()))
    }

    fn render(&self, snapshot: &AnalysisSnapshot) -> anyhow::Result<String> {
        Ok(generate_graphml(snapshot))
    }
}

fn push_data(out: &mut String, key: &str, value: &str) {
    out.push_str(&format!(
        "      <data key=\"{key}\">{}</data>\n",
        escape_xml(value)
    ));
}

fn push_node(out: &mut String, node: &NodeRecord) {
    out.push_str(&format!("    <node id=\"{}\">\n", escape_xml(&node.id)));
    push_data(out, "d0", &node.name);
    push_data(out, "d1", &node.kind.to_string());
    if let Some(language) = node.language {
        push_data(out, "d2", language.tag());
    }
    if let Some(path) = &node.path {
        push_data(out, "d3", path);
    }
    let counts = [
        ("d4", node.sloc),
        ("d5", node.methods),
        ("d6", node.fan_in),
        ("d7", node.fan_out),
        ("d8", node.community),
    ];
    for (key, value) in counts {
        if let Some(v) = value {
            push_data(out, key, &v.to_string());
        }
    }
    if !node.keywords.is_empty() {
        let tokens: Vec<&str> = node.keywords.iter().map(|k| k.token.as_str()).collect();
        push_data(out, "d9", &tokens.join(" "));
    }
    out.push_str("    </node>\n");
}

/// Render a snapshot as a directed GraphML document.
pub fn generate_graphml(snapshot: &AnalysisSnapshot) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<graphml xmlns=\"http://graphml.graphdrawing.org/xmlns\" ");
    out.push_str("xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" ");
    out.push_str("xsi:schemaLocation=\"http://graphml.graphdrawing.org/xmlns ");
    out.push_str("http://graphml.graphdrawing.org/xmlns/1.0/graphml.xsd\">\n");

    for (id, target, name, kind) in KEYS {
        out.push_str(&format!(
            "  <key id=\"{id}\" for=\"{target}\" attr.name=\"{name}\" attr.type=\"{kind}\"/>\n"
        ));
    }

    out.push_str(&format!(
        "  <graph id=\"{}\" edgedefault=\"directed\">\n",
        escape_xml(&snapshot.artifact_stem())
    ));
    for node in &snapshot.nodes {
        push_node(&mut out, node);
    }
    for (i, edge) in snapshot.edges.iter().enumerate() {
        out.push_str(&format!(
            "    <edge id=\"e{i}\" source=\"{}\" target=\"{}\">\n",
            escape_xml(&edge.source),
            escape_xml(&edge.target)
        ));
        push_data(&mut out, "d10", &edge.statement);
        push_data(&mut out, "d11", &edge.kind.to_string());
        out.push_str("    </edge>\n");
    }
    out.push_str("  </graph>\n");
    out.push_str("</graphml>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    #[test]
    fn test_graphml_declares_keys_and_nodes() {
        let xml = generate_graphml(&test_support::sample());
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("attr.name=\"fan_in\""));
        assert!(xml.contains("<node id=\"src/A.cs\">"));
        assert!(xml.contains("<data key=\"d2\">cs</data>"));
        assert!(xml.contains("<data key=\"d9\">invoice</data>"));
        assert!(xml.contains("source=\"src/A.cs\" target=\"System.IO\""));
        assert_eq!(xml.matches("<node ").count(), 3);
        assert_eq!(xml.matches("<edge ").count(), 2);
    }

    #[test]
    fn test_graphml_external_has_no_path() {
        let xml = generate_graphml(&test_support::sample());
        let external = xml
            .split("<node id=\"System.IO\">")
            .nth(1)
            .and_then(|rest| rest.split("</node>").next())
            .unwrap();
        assert!(!external.contains("d3"));
        assert!(external.contains("<data key=\"d1\">external</data>"));
    }

    #[test]
    fn test_graphml_empty_snapshot() {
        let xml = generate_graphml(&test_support::empty());
        assert!(xml.contains("<graph id=\"csharp_check_file\" edgedefault=\"directed\">"));
        assert!(xml.trim_end().ends_with("</graphml>"));
        assert!(!xml.contains("<node "));
    }
}
