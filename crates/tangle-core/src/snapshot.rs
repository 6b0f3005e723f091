//! Frozen analysis results handed to exporters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ScanWarning;
use crate::language::Language;
use crate::modularity::Community;
use crate::tfidf::Keyword;
use crate::types::{EdgeKind, Metric, NodeKind, ScanType};

/// One node with the metrics requested for its scan.
///
/// Metric fields are `None` when the metric was not requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: String,
    pub name: String,
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sloc: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub methods: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fan_in: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fan_out: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub community: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<Keyword>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: String,
    pub target: String,
    pub statement: String,
    pub kind: EdgeKind,
}

/// Aggregate statistics of one scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    /// File or entity nodes, externals excluded.
    pub node_count: usize,
    pub external_count: usize,
    pub edge_count: usize,
    /// Over all nodes, externals included; zero for an empty graph.
    pub average_fan_in: f64,
    pub average_fan_out: f64,
    pub max_fan_in: usize,
    pub max_fan_out: usize,
    pub total_sloc: usize,
    pub total_methods: usize,
    pub community_count: usize,
    /// Zero when modularity was not computed or the graph has no edges.
    pub modularity: f64,
    pub ignored_dependencies: usize,
    pub duplicate_statements: usize,
    pub warning_count: usize,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSnapshot {
    pub project_name: String,
    pub analysis_name: String,
    pub scan: ScanType,
    pub generated_at: DateTime<Utc>,
    pub source_directory: String,
    pub metrics: Vec<Metric>,
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
    pub communities: Vec<Community>,
    pub summary: AnalysisSummary,
    pub warnings: Vec<ScanWarning>,
}

impl AnalysisSnapshot {
    pub fn has_metric(&self, metric: Metric) -> bool {
        self.metrics.contains(&metric)
    }

    /// Base name shared by this snapshot's artifacts, e.g. `csharp_check_file`.
    pub fn artifact_stem(&self) -> String {
        let name: String = self
            .analysis_name
            .trim()
            .chars()
            .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
            .collect();
        let name = name.trim_matches('_');
        if name.is_empty() {
            format!("analysis_{}", self.scan)
        } else {
            format!("{name}_{}", self.scan)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(name: &str) -> AnalysisSnapshot {
        AnalysisSnapshot {
            project_name: "demo".to_string(),
            analysis_name: name.to_string(),
            scan: ScanType::Entity,
            generated_at: Utc::now(),
            source_directory: "src".to_string(),
            metrics: vec![Metric::FanInOut],
            nodes: vec![],
            edges: vec![],
            communities: vec![],
            summary: AnalysisSummary::default(),
            warnings: vec![],
        }
    }

    #[test]
    fn test_artifact_stem() {
        assert_eq!(snapshot("C# check").artifact_stem(), "c__check_entity");
        assert_eq!(snapshot("  ").artifact_stem(), "analysis_entity");
        assert_eq!(snapshot("Backend").artifact_stem(), "backend_entity");
    }

    #[test]
    fn test_has_metric() {
        let s = snapshot("x");
        assert!(s.has_metric(Metric::FanInOut));
        assert!(!s.has_metric(Metric::Tfidf));
    }
}
