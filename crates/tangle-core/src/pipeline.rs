use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use chrono::Utc;
use rayon::prelude::*;
use tracing::{info, info_span, warn};

use crate::collector::SourceCollector;
use crate::config::JobSpec;
use crate::error::{JobError, ScanWarning};
use crate::graph::{FrozenGraph, GraphBuilder, GraphEdge, GraphNode};
use crate::metrics;
use crate::modularity::detect_communities;
use crate::resolver::{EntityResolver, FileResolver};
use crate::scanner::{ScanOptions, ScannedFile, Scanner};
use crate::snapshot::AnalysisSnapshot;
use crate::tfidf;
use crate::types::{EdgeKind, Metric, NodeKind, ScanType};

/// Runs one analysis job: collect, scan in parallel, merge, measure.
pub struct AnalysisPipeline {
    job: JobSpec,
}

impl AnalysisPipeline {
    pub fn new(job: JobSpec) -> Self {
        Self { job }
    }

    /// One snapshot per requested scan type, file scan first.
    pub fn run(&self) -> Result<Vec<AnalysisSnapshot>, JobError> {
        let job = &self.job;
        let span = info_span!("analysis", name = %job.analysis_name);
        let _guard = span.enter();
        let started = Instant::now();

        let wants = |metric: Metric| job.file_scan.contains(&metric) || job.entity_scan.contains(&metric);
        let options = ScanOptions {
            entities: !job.entity_scan.is_empty(),
            tokens: wants(Metric::Tfidf),
        };

        let collector = SourceCollector::new(
            job.languages.clone(),
            job.extensions.clone(),
            job.ignore_directories.clone(),
        );
        let scanner = Scanner::new(
            collector.languages(),
            job.ignore_dependencies.clone(),
            job.ignore_entities.clone(),
            options,
        )?;
        let collection = collector.collect(&job.source_directory)?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(job.max_workers)
            .build()?;
        let scanned: Vec<ScannedFile> = pool.install(|| {
            collection
                .files
                .par_iter()
                .map(|file| scanner.scan_file(file))
                .collect()
        });

        let mut warnings: Vec<ScanWarning> = collection.warnings;
        warnings.extend(scanned.iter().flat_map(|f| f.warnings.iter().cloned()));
        let ignored: usize = scanned.iter().map(|f| f.ignored_dependencies).sum();
        let unreadable = scanned.iter().filter(|f| !f.readable).count();
        if unreadable > 0 {
            warn!(files = unreadable, "some files could not be read and were left out");
        }

        let generated_at = Utc::now();
        let mut snapshots = Vec::new();
        for (scan, requested) in job.scans() {
            let (graph, documents) = match scan {
                ScanType::File => build_file_graph(&scanned),
                ScanType::Entity => build_entity_graph(&scanned),
            };

            let partition = requested
                .contains(&Metric::LouvainModularity)
                .then(|| detect_communities(&graph));
            let keywords = if requested.contains(&Metric::Tfidf) {
                tfidf::keywords(documents.iter().map(|(id, tokens)| (id.as_str(), tokens.as_slice())))
            } else {
                BTreeMap::new()
            };

            let nodes = metrics::node_records(&graph, requested, partition.as_ref(), &keywords);
            let edges = metrics::edge_records(&graph);
            let summary = metrics::summarize(
                &graph,
                partition.as_ref(),
                ignored,
                warnings.len(),
                started.elapsed(),
            );

            info!(
                scan = %scan,
                nodes = summary.node_count,
                externals = summary.external_count,
                edges = summary.edge_count,
                modularity = summary.modularity,
                "analysis finished"
            );

            snapshots.push(AnalysisSnapshot {
                project_name: job.project_name.clone(),
                analysis_name: job.analysis_name.clone(),
                scan,
                generated_at,
                source_directory: job.source_directory.display().to_string(),
                metrics: requested.iter().copied().collect(),
                nodes,
                edges,
                communities: partition.map(|p| p.communities).unwrap_or_default(),
                summary,
                warnings: warnings.clone(),
            });
        }
        Ok(snapshots)
    }
}

/// Run independent jobs concurrently. Results are in job order.
pub fn run_all(jobs: &[JobSpec]) -> Vec<Result<Vec<AnalysisSnapshot>, JobError>> {
    jobs.par_iter()
        .map(|job| AnalysisPipeline::new(job.clone()).run())
        .collect()
}

/// Token documents keyed by node id, for TF-IDF.
type Documents = Vec<(String, Vec<String>)>;

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn build_file_graph(files: &[ScannedFile]) -> (FrozenGraph, Documents) {
    let readable: Vec<&ScannedFile> = files.iter().filter(|f| f.readable).collect();
    let mut builder = GraphBuilder::new();
    for file in &readable {
        builder.add_node(GraphNode {
            id: file.relative_path.clone(),
            name: file_name(&file.relative_path).to_string(),
            kind: NodeKind::File,
            language: Some(file.language),
            path: Some(file.relative_path.clone()),
            sloc: file.sloc,
            methods: file.methods,
        });
    }

    let resolver = FileResolver::new(
        readable
            .iter()
            .map(|f| (f.relative_path.as_str(), f.module.as_deref())),
    );
    for file in &readable {
        for dependency in &file.dependencies {
            let target = match resolver.resolve(&file.relative_path, file.language, dependency) {
                Some(path) => path.to_string(),
                None => {
                    builder.ensure_external(dependency);
                    dependency.clone()
                }
            };
            builder.add_dependency(
                &file.relative_path,
                &target,
                GraphEdge {
                    statement: dependency.clone(),
                    kind: EdgeKind::Import,
                },
            );
        }
    }

    let documents = readable
        .iter()
        .map(|f| (f.relative_path.clone(), f.tokens.clone()))
        .collect();
    (builder.freeze(), documents)
}

/// Node ids for every entity, parallel to `files[i].entities`.
///
/// A qualified name that occurs more than once gets `@<file>` appended, and
/// `:<line>` as well when it repeats inside one file.
fn entity_ids(files: &[&ScannedFile]) -> Vec<Vec<String>> {
    let mut by_name: HashMap<&str, usize> = HashMap::new();
    let mut by_file: HashMap<(&str, &str), usize> = HashMap::new();
    for file in files {
        for entity in &file.entities {
            *by_name.entry(entity.qualified_name.as_str()).or_insert(0) += 1;
            *by_file
                .entry((entity.qualified_name.as_str(), file.relative_path.as_str()))
                .or_insert(0) += 1;
        }
    }

    files
        .iter()
        .map(|file| {
            file.entities
                .iter()
                .map(|entity| {
                    let qualified = entity.qualified_name.as_str();
                    let path = file.relative_path.as_str();
                    if by_name.get(qualified).copied().unwrap_or(0) < 2 {
                        qualified.to_string()
                    } else if by_file.get(&(qualified, path)).copied().unwrap_or(0) < 2 {
                        format!("{qualified}@{path}")
                    } else {
                        format!("{qualified}@{path}:{}", entity.start_line)
                    }
                })
                .collect()
        })
        .collect()
}

fn build_entity_graph(files: &[ScannedFile]) -> (FrozenGraph, Documents) {
    let readable: Vec<&ScannedFile> = files.iter().filter(|f| f.readable).collect();
    let ids = entity_ids(&readable);

    let mut builder = GraphBuilder::new();
    for (file, file_ids) in readable.iter().zip(&ids) {
        for (entity, id) in file.entities.iter().zip(file_ids) {
            builder.add_node(GraphNode {
                id: id.clone(),
                name: entity.name.clone(),
                kind: NodeKind::Entity,
                language: Some(file.language),
                path: Some(file.relative_path.clone()),
                sloc: entity.sloc,
                methods: entity.methods,
            });
        }
    }

    let resolver = EntityResolver::new(readable.iter().zip(&ids).flat_map(|(file, file_ids)| {
        file.entities.iter().zip(file_ids).map(|(entity, id)| {
            (
                id.as_str(),
                entity.qualified_name.as_str(),
                entity.name.as_str(),
                file.relative_path.as_str(),
            )
        })
    }));

    let mut documents = Vec::new();
    for (file, file_ids) in readable.iter().zip(&ids) {
        for (entity, id) in file.entities.iter().zip(file_ids) {
            let references = entity
                .inheritance
                .iter()
                .map(|r| (r, EdgeKind::Inheritance))
                .chain(entity.imports.iter().map(|r| (r, EdgeKind::Import)));
            for (reference, kind) in references {
                let target = match resolver.resolve(&file.relative_path, file.language, reference) {
                    Some(target) => target.to_string(),
                    None => {
                        builder.ensure_external(reference);
                        reference.clone()
                    }
                };
                builder.add_dependency(
                    id,
                    &target,
                    GraphEdge {
                        statement: reference.clone(),
                        kind,
                    },
                );
            }
            documents.push((id.clone(), entity.tokens.clone()));
        }
    }

    (builder.freeze(), documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::anchored_pattern;
    use crate::language::Language;
    use std::collections::BTreeSet;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn job(root: &Path, languages: &[Language]) -> JobSpec {
        let mut job = JobSpec::for_directory(
            root,
            languages.iter().copied().collect(),
            root.join("out"),
            vec![],
        )
        .unwrap();
        job.max_workers = 2;
        job
    }

    #[test]
    fn test_ignored_using_yields_no_edge() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "A.cs",
            "using System.Text;\nusing Project.C;\n\nnamespace Project { class A { } }\n",
        );
        write(dir.path(), "C.cs", "namespace Project { class C { } }\n");

        let mut job = job(dir.path(), &[Language::CSharp]);
        job.ignore_dependencies = vec![anchored_pattern("System\\..*").unwrap()];
        let snapshots = AnalysisPipeline::new(job).run().unwrap();
        let file = &snapshots[0];

        assert_eq!(file.edges.len(), 1);
        assert_eq!(file.edges[0].source, "A.cs");
        assert_eq!(file.edges[0].target, "C.cs");
        assert!(file.nodes.iter().all(|n| n.id != "System.Text"));
        let a = file.nodes.iter().find(|n| n.id == "A.cs").unwrap();
        assert_eq!(a.fan_out, Some(1));
        assert_eq!(file.summary.ignored_dependencies, 1);
    }

    #[test]
    fn test_entity_scan_builds_inheritance_edges() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "app/shapes.py",
            "import math\n\nclass Shape:\n    def area(self):\n        return 0\n\nclass Circle(Shape):\n    def area(self):\n        return math.pi\n",
        );
        write(
            dir.path(),
            "app/square.py",
            "from app.shapes import Shape\n\nclass Square(Shape):\n    pass\n",
        );

        let mut job = job(dir.path(), &[Language::Python]);
        job.entity_scan = [Metric::DependencyGraph, Metric::FanInOut].into_iter().collect();
        let snapshots = AnalysisPipeline::new(job).run().unwrap();
        assert_eq!(snapshots.len(), 2);
        let entity = &snapshots[1];
        assert_eq!(entity.scan, ScanType::Entity);

        let inherits: Vec<(&str, &str)> = entity
            .edges
            .iter()
            .filter(|e| e.kind == EdgeKind::Inheritance)
            .map(|e| (e.source.as_str(), e.target.as_str()))
            .collect();
        assert!(inherits.contains(&("Circle", "Shape")));
        assert!(inherits.contains(&("Square", "Shape")));
        let shape = entity.nodes.iter().find(|n| n.id == "Shape").unwrap();
        assert_eq!(shape.fan_in, Some(2));
    }

    #[test]
    fn test_python_relative_imports_link_package_files() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "pkg/a.py", "from . import b\n\ndef run():\n    b.go()\n");
        write(dir.path(), "pkg/b.py", "def go():\n    pass\n");
        write(dir.path(), "pkg/sub/__init__.py", "");
        write(dir.path(), "pkg/sub/c.py", "from .. import a\nfrom . import d\n");

        let snapshots = AnalysisPipeline::new(job(dir.path(), &[Language::Python])).run().unwrap();
        let file = &snapshots[0];
        let edges: Vec<(&str, &str)> = file
            .edges
            .iter()
            .map(|e| (e.source.as_str(), e.target.as_str()))
            .collect();
        assert!(edges.contains(&("pkg/a.py", "pkg/b.py")));
        assert!(edges.contains(&("pkg/sub/c.py", "pkg/a.py")));
        assert!(file.nodes.iter().all(|n| n.id != "." && n.id != ".."));
        // An unresolved sibling stays external under its relative path.
        assert!(file
            .nodes
            .iter()
            .any(|n| n.id == "./d" && n.kind == NodeKind::External));
    }

    #[test]
    fn test_templates_and_stylesheets_share_one_graph() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "templates/base.html.twig", "<html>{% block body %}{% endblock %}</html>\n");
        write(
            dir.path(),
            "templates/home.html.twig",
            "{% extends 'base.html.twig' %}\n{% block body %}Hi{% endblock %}\n",
        );
        write(dir.path(), "styles/app.scss", "@use 'base/vars';\n@use 'sass:math';\n");
        write(dir.path(), "styles/base/_vars.scss", "$gap: 4px;\n");

        let job = job(dir.path(), &[Language::Twig, Language::Scss]);
        let snapshots = AnalysisPipeline::new(job).run().unwrap();
        let file = &snapshots[0];
        let edges: Vec<(&str, &str)> = file
            .edges
            .iter()
            .map(|e| (e.source.as_str(), e.target.as_str()))
            .collect();
        assert!(edges.contains(&("templates/home.html.twig", "templates/base.html.twig")));
        assert!(edges.contains(&("styles/app.scss", "styles/base/_vars.scss")));
        assert!(edges.contains(&("styles/app.scss", "sass:math")));
        assert_eq!(file.summary.external_count, 1);
    }

    #[test]
    fn test_duplicate_entity_names_get_file_suffix() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a/Util.java", "class Util {}\n");
        write(dir.path(), "b/Util.java", "class Util {}\n");
        let mut job = job(dir.path(), &[Language::Java]);
        job.file_scan.clear();
        job.entity_scan = [Metric::DependencyGraph].into_iter().collect();
        let snapshots = AnalysisPipeline::new(job).run().unwrap();
        let ids: Vec<&str> = snapshots[0].nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["Util@a/Util.java", "Util@b/Util.java"]);
    }

    #[test]
    fn test_empty_directory() {
        let dir = TempDir::new().unwrap();
        let snapshots = AnalysisPipeline::new(job(dir.path(), &[])).run().unwrap();
        let file = &snapshots[0];
        assert!(file.nodes.is_empty());
        assert!(file.edges.is_empty());
        assert_eq!(file.summary.modularity, 0.0);
    }

    #[test]
    fn test_fan_sums_match_edges_on_real_tree() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/main.js", "import './a';\nimport b from './b';\nimport fs from 'fs';\n");
        write(dir.path(), "src/a.js", "import './b';\nimport './b';\n");
        write(dir.path(), "src/b.js", "import './a';\n");
        let snapshots = AnalysisPipeline::new(job(dir.path(), &[Language::JavaScript])).run().unwrap();
        let file = &snapshots[0];
        let fan_in: usize = file.nodes.iter().filter_map(|n| n.fan_in).sum();
        let fan_out: usize = file.nodes.iter().filter_map(|n| n.fan_out).sum();
        assert_eq!(fan_in, file.edges.len());
        assert_eq!(fan_out, file.edges.len());
        assert_eq!(file.edges.len(), 5);
        let ids: BTreeSet<&str> = file.nodes.iter().map(|n| n.id.as_str()).collect();
        assert!(file
            .edges
            .iter()
            .all(|e| ids.contains(e.source.as_str()) && ids.contains(e.target.as_str())));
    }

    #[test]
    fn test_run_all_isolates_jobs() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.go", "package main\nfunc main() {}\n");
        let good = job(dir.path(), &[Language::Go]);
        let mut bad = good.clone();
        bad.source_directory = dir.path().join("gone");
        let results = run_all(&[bad, good]);
        assert!(results[0].is_err());
        assert_eq!(results[1].as_ref().unwrap()[0].nodes.len(), 1);
    }
}
