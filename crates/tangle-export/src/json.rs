use std::fs;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tangle_core::error::ScanWarning;
use tangle_core::modularity::Community;
use tangle_core::snapshot::{AnalysisSnapshot, AnalysisSummary, EdgeRecord, NodeRecord};
use tangle_core::types::{ExportFormat, Metric, ScanType};

use crate::Exporter;

/// Identity of the analysis a document was produced by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub tool: String,
    pub version: String,
    pub project_name: String,
    pub analysis_name: String,
    pub scan: ScanType,
    pub generated_at: DateTime<Utc>,
    pub source_directory: String,
    pub metrics: Vec<Metric>,
}

#[derive(Debug, Serialize)]
struct DocumentRef<'a> {
    meta: DocumentMeta,
    summary: &'a AnalysisSummary,
    nodes: &'a [NodeRecord],
    edges: &'a [EdgeRecord],
    communities: &'a [Community],
    warnings: &'a [ScanWarning],
}

#[derive(Debug, Deserialize)]
struct Document {
    meta: DocumentMeta,
    summary: AnalysisSummary,
    nodes: Vec<NodeRecord>,
    edges: Vec<EdgeRecord>,
    #[serde(default)]
    communities: Vec<Community>,
    #[serde(default)]
    warnings: Vec<ScanWarning>,
}

pub struct JsonExporter;

impl Exporter for JsonExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Json
    }

    fn file_name(&self, snapshot: &AnalysisSnapshot) -> Option<String> {
        Some(format!("{}.json", snapshot.artifact_stem()))
    }

    fn render(&self, snapshot: &AnalysisSnapshot) -> anyhow::Result<String> {
        format_snapshot(snapshot)
    }
}

/// Serialize a snapshot as a pretty-printed JSON document.
pub fn format_snapshot(snapshot: &AnalysisSnapshot) -> anyhow::Result<String> {
    let document = DocumentRef {
        meta: DocumentMeta {
            tool: "tangle".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            project_name: snapshot.project_name.clone(),
            analysis_name: snapshot.analysis_name.clone(),
            scan: snapshot.scan,
            generated_at: snapshot.generated_at,
            source_directory: snapshot.source_directory.clone(),
            metrics: snapshot.metrics.clone(),
        },
        summary: &snapshot.summary,
        nodes: &snapshot.nodes,
        edges: &snapshot.edges,
        communities: &snapshot.communities,
        warnings: &snapshot.warnings,
    };
    let mut json =
        serde_json::to_string_pretty(&document).context("failed to serialize snapshot")?;
    json.push('\n');
    Ok(json)
}

/// Parse a document written by [`format_snapshot`] back into a snapshot.
pub fn read_snapshot(text: &str) -> anyhow::Result<AnalysisSnapshot> {
    let document: Document = serde_json::from_str(text).context("invalid snapshot document")?;
    Ok(AnalysisSnapshot {
        project_name: document.meta.project_name,
        analysis_name: document.meta.analysis_name,
        scan: document.meta.scan,
        generated_at: document.meta.generated_at,
        source_directory: document.meta.source_directory,
        metrics: document.meta.metrics,
        nodes: document.nodes,
        edges: document.edges,
        communities: document.communities,
        summary: document.summary,
        warnings: document.warnings,
    })
}

pub fn read_snapshot_file(path: &Path) -> anyhow::Result<AnalysisSnapshot> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    read_snapshot(&text).with_context(|| format!("failed to load {}", path.display()))
}
