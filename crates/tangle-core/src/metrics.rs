use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use crate::graph::FrozenGraph;
use crate::modularity::Partition;
use crate::snapshot::{AnalysisSummary, EdgeRecord, NodeRecord};
use crate::tfidf::Keyword;
use crate::types::{Metric, NodeKind};

/// Per-node metric records, in node id order.
pub fn node_records(
    graph: &FrozenGraph,
    metrics: &BTreeSet<Metric>,
    partition: Option<&Partition>,
    keywords: &BTreeMap<String, Vec<Keyword>>,
) -> Vec<NodeRecord> {
    let membership = partition.map(Partition::membership).unwrap_or_default();
    let wants = |metric| metrics.contains(&metric);

    graph
        .nodes()
        .map(|node| NodeRecord {
            id: node.id.clone(),
            name: node.name.clone(),
            kind: node.kind,
            language: node.language,
            path: node.path.clone(),
            sloc: wants(Metric::SourceLinesOfCode).then_some(node.sloc),
            methods: wants(Metric::NumberOfMethods).then_some(node.methods),
            fan_in: wants(Metric::FanInOut).then(|| graph.fan_in(&node.id)),
            fan_out: wants(Metric::FanInOut).then(|| graph.fan_out(&node.id)),
            community: membership.get(node.id.as_str()).copied(),
            keywords: keywords.get(&node.id).cloned().unwrap_or_default(),
        })
        .collect()
}

pub fn edge_records(graph: &FrozenGraph) -> Vec<EdgeRecord> {
    graph
        .edges_with_nodes()
        .into_iter()
        .map(|(source, target, edge)| EdgeRecord {
            source: source.id.clone(),
            target: target.id.clone(),
            statement: edge.statement.clone(),
            kind: edge.kind,
        })
        .collect()
}

/// Aggregate statistics. Fan statistics come from the graph itself, so they
/// are reported even when `fan_in_out` was not requested per node.
pub fn summarize(
    graph: &FrozenGraph,
    partition: Option<&Partition>,
    ignored_dependencies: usize,
    warning_count: usize,
    duration: Duration,
) -> AnalysisSummary {
    let total = graph.node_count();
    let (mut sum_in, mut sum_out, mut max_in, mut max_out) = (0usize, 0usize, 0usize, 0usize);
    let (mut sloc, mut methods, mut externals) = (0usize, 0usize, 0usize);

    for node in graph.nodes() {
        let fan_in = graph.fan_in(&node.id);
        let fan_out = graph.fan_out(&node.id);
        sum_in += fan_in;
        sum_out += fan_out;
        max_in = max_in.max(fan_in);
        max_out = max_out.max(fan_out);
        sloc += node.sloc;
        methods += node.methods;
        if node.kind == NodeKind::External {
            externals += 1;
        }
    }

    let average = |sum: usize| if total == 0 { 0.0 } else { sum as f64 / total as f64 };

    AnalysisSummary {
        node_count: total - externals,
        external_count: externals,
        edge_count: graph.edge_count(),
        average_fan_in: average(sum_in),
        average_fan_out: average(sum_out),
        max_fan_in: max_in,
        max_fan_out: max_out,
        total_sloc: sloc,
        total_methods: methods,
        community_count: partition.map_or(0, |p| p.communities.len()),
        modularity: partition.map_or(0.0, |p| p.modularity),
        ignored_dependencies,
        duplicate_statements: graph.duplicate_statements(),
        warning_count,
        duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
    }
}
