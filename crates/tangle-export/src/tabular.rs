//! Table-shaped views of a snapshot: a TSV artifact and two console renderings.

use colored::Colorize;

use tangle_core::snapshot::{AnalysisSnapshot, NodeRecord};
use tangle_core::types::{ExportFormat, Metric, NodeKind};

use crate::Exporter;

const TSV_COLUMNS: &[&str] = &[
    "id",
    "name",
    "kind",
    "language",
    "path",
    "sloc",
    "methods",
    "fan_in",
    "fan_out",
    "community",
    "keywords",
];

/// Nodes listed per ranking in the overall view.
const TOP_N: usize = 5;

pub struct TabularFileExporter;
pub struct ConsoleTableExporter;
pub struct ConsoleSummaryExporter;

impl Exporter for TabularFileExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::TabularFile
    }

    fn file_name(&self, snapshot: &AnalysisSnapshot) -> Option<String> {
        Some(format!("{}.tsv", snapshot.artifact_stem()))
    }

    fn render(&self, snapshot: &AnalysisSnapshot) -> anyhow::Result<String> {
        Ok(format_tsv(snapshot))
    }
}

impl Exporter for ConsoleTableExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::TabularConsole
    }

    fn file_name(&self, _snapshot: &AnalysisSnapshot) -> Option<String> {
        None
    }

    fn render(&self, snapshot: &AnalysisSnapshot) -> anyhow::Result<String> {
        Ok(format_node_table(snapshot))
    }
}

impl Exporter for ConsoleSummaryExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::TabularConsoleOverall
    }

    fn file_name(&self, _snapshot: &AnalysisSnapshot) -> Option<String> {
        None
    }

    fn render(&self, snapshot: &AnalysisSnapshot) -> anyhow::Result<String> {
        Ok(format_overall(snapshot))
    }
}

fn cell(value: Option<usize>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn tsv_field(s: &str) -> String {
    s.replace(['\t', '\n', '\r'], " ")
}

fn keyword_list(node: &NodeRecord) -> String {
    node.keywords
        .iter()
        .map(|k| format!("{}:{:.3}", k.token, k.score))
        .collect::<Vec<_>>()
        .join(" ")
}

/// One header row, then one row per node. Metrics that were not computed
/// leave their cell empty.
pub fn format_tsv(snapshot: &AnalysisSnapshot) -> String {
    let mut out = TSV_COLUMNS.join("\t");
    out.push('\n');
    for node in &snapshot.nodes {
        let row = [
            tsv_field(&node.id),
            tsv_field(&node.name),
            node.kind.to_string(),
            node.language.map(|l| l.tag().to_string()).unwrap_or_default(),
            node.path.as_deref().map(tsv_field).unwrap_or_default(),
            cell(node.sloc),
            cell(node.methods),
            cell(node.fan_in),
            cell(node.fan_out),
            cell(node.community),
            keyword_list(node),
        ];
        out.push_str(&row.join("\t"));
        out.push('\n');
    }
    out
}

fn header(snapshot: &AnalysisSnapshot) -> String {
    let title = format!(
        "tangle - {} / {} ({} scan)",
        snapshot.project_name, snapshot.analysis_name, snapshot.scan
    );
    format!("\n{}\n{}\n", title.bold(), "=".repeat(title.chars().count().max(40)))
}

/// Per-node table for the terminal.
pub fn format_node_table(snapshot: &AnalysisSnapshot) -> String {
    let mut out = header(snapshot);

    if snapshot.nodes.is_empty() {
        out.push_str(&format!("\n{}\n\n", "No nodes found.".yellow()));
        return out;
    }

    let rows: Vec<[String; 7]> = snapshot
        .nodes
        .iter()
        .map(|n| {
            [
                n.id.clone(),
                n.kind.to_string(),
                cell(n.sloc),
                cell(n.methods),
                cell(n.fan_in),
                cell(n.fan_out),
                cell(n.community),
            ]
        })
        .collect();
    let titles = ["node", "kind", "sloc", "methods", "fan_in", "fan_out", "community"];
    let mut widths = titles.map(str::len);
    for row in &rows {
        for (w, value) in widths.iter_mut().zip(row) {
            *w = (*w).max(value.chars().count());
        }
    }

    // Pad before coloring so escape codes do not skew the columns.
    let title_line: Vec<String> = titles
        .iter()
        .zip(widths)
        .map(|(t, w)| format!("{t:<w$}").bold().to_string())
        .collect();
    out.push_str(&format!("\n{}\n", title_line.join("  ").trim_end()));
    out.push_str(&format!(
        "{}\n",
        "-".repeat(widths.iter().sum::<usize>() + 2 * (widths.len() - 1))
    ));

    for (node, row) in snapshot.nodes.iter().zip(&rows) {
        let mut line: Vec<String> = Vec::with_capacity(row.len());
        for (i, (value, w)) in row.iter().zip(widths).enumerate() {
            let padded = if i < 2 {
                format!("{value:<w$}")
            } else {
                format!("{value:>w$}")
            };
            let padded = if i == 0 && node.kind == NodeKind::External {
                padded.dimmed().to_string()
            } else {
                padded
            };
            line.push(padded);
        }
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    }

    let with_keywords: Vec<&NodeRecord> =
        snapshot.nodes.iter().filter(|n| !n.keywords.is_empty()).collect();
    if !with_keywords.is_empty() {
        out.push_str(&format!("\n{}\n{}\n", "Keywords".bold(), "-".repeat(40)));
        for node in with_keywords {
            let tokens: Vec<&str> = node.keywords.iter().map(|k| k.token.as_str()).collect();
            out.push_str(&format!("  {}: {}\n", node.id, tokens.join(", ")));
        }
    }

    push_warnings(&mut out, snapshot);
    out.push('\n');
    out
}

fn push_ranking(
    out: &mut String,
    title: &str,
    snapshot: &AnalysisSnapshot,
    value: fn(&NodeRecord) -> Option<usize>,
) {
    let mut ranked: Vec<(&str, usize)> = snapshot
        .nodes
        .iter()
        .filter_map(|n| value(n).filter(|v| *v > 0).map(|v| (n.id.as_str(), v)))
        .collect();
    if ranked.is_empty() {
        return;
    }
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    out.push_str(&format!("\n{}\n", title.bold()));
    for (id, v) in ranked.into_iter().take(TOP_N) {
        out.push_str(&format!("  {v:>4}  {id}\n"));
    }
}

fn push_warnings(out: &mut String, snapshot: &AnalysisSnapshot) {
    if snapshot.warnings.is_empty() {
        return;
    }
    out.push_str(&format!(
        "\n{} ({})\n{}\n",
        "Warnings".yellow().bold(),
        snapshot.warnings.len(),
        "-".repeat(40)
    ));
    for warning in &snapshot.warnings {
        out.push_str(&format!(
            "  {} [{}] {}\n",
            "WARN".yellow().bold(),
            warning.kind,
            warning.path
        ));
        out.push_str(&format!("    {}\n", warning.message));
    }
}

/// Aggregate view of one scan for the terminal.
pub fn format_overall(snapshot: &AnalysisSnapshot) -> String {
    let s = &snapshot.summary;
    let mut out = header(snapshot);

    out.push_str(&format!(
        "\n{}: {} nodes, {} external, {} edges\n",
        "Summary".bold(),
        s.node_count,
        s.external_count,
        s.edge_count
    ));
    if snapshot.has_metric(Metric::SourceLinesOfCode) {
        out.push_str(&format!("  Source lines of code: {}\n", s.total_sloc));
    }
    if snapshot.has_metric(Metric::NumberOfMethods) {
        out.push_str(&format!("  Methods: {}\n", s.total_methods));
    }
    if snapshot.has_metric(Metric::FanInOut) {
        out.push_str(&format!(
            "  Fan-in: avg={:.2}, max={}\n",
            s.average_fan_in, s.max_fan_in
        ));
        out.push_str(&format!(
            "  Fan-out: avg={:.2}, max={}\n",
            s.average_fan_out, s.max_fan_out
        ));
    }
    if snapshot.has_metric(Metric::LouvainModularity) {
        let q = format!("{:.4}", s.modularity);
        let q = if s.modularity >= 0.3 {
            q.green()
        } else if s.modularity > 0.0 {
            q.yellow()
        } else {
            q.normal()
        };
        out.push_str(&format!(
            "  Communities: {}, modularity={}\n",
            s.community_count, q
        ));
    }
    out.push_str(&format!(
        "  Ignored dependencies: {}, duplicate statements: {}\n",
        s.ignored_dependencies, s.duplicate_statements
    ));
    out.push_str(&format!("  Duration: {} ms\n", s.duration_ms));

    if snapshot.has_metric(Metric::FanInOut) {
        push_ranking(&mut out, "Highest fan-in", snapshot, |n| n.fan_in);
        push_ranking(&mut out, "Highest fan-out", snapshot, |n| n.fan_out);
    }

    if s.warning_count == 0 {
        out.push_str(&format!("\n{}\n", "No warnings.".green()));
    } else {
        push_warnings(&mut out, snapshot);
    }
    out.push('\n');
    out
}
