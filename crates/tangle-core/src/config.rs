use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::language::Language;
use crate::logging::LogLevel;
use crate::types::{ExportFormat, Metric, ScanType};

/// Top-level configuration from `tangle.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_project_name")]
    pub project_name: String,
    #[serde(default)]
    pub loglevel: LogLevel,
    #[serde(default)]
    pub analyses: Vec<AnalysisConfig>,
}

fn default_project_name() -> String {
    "tangle".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_name: default_project_name(),
            loglevel: LogLevel::default(),
            analyses: Vec::new(),
        }
    }
}

/// One `[[analyses]]` table, as written by the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_analysis_name")]
    pub analysis_name: String,
    pub source_directory: PathBuf,
    #[serde(default)]
    pub only_permit_languages: Vec<String>,
    #[serde(default)]
    pub only_permit_file_extensions: Vec<String>,
    #[serde(default)]
    pub ignore_directories_containing: Vec<String>,
    #[serde(default)]
    pub ignore_dependencies_matching: Vec<String>,
    /// Entities whose name contains any of these substrings are skipped.
    #[serde(default)]
    pub ignore_entities_containing: Vec<String>,
    #[serde(default)]
    pub file_scan: Vec<String>,
    #[serde(default)]
    pub entity_scan: Vec<String>,
    #[serde(default)]
    pub max_workers: Option<usize>,
    #[serde(default)]
    pub export: ExportConfig,
}

fn default_analysis_name() -> String {
    "analysis".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_export_directory")]
    pub directory: PathBuf,
    #[serde(default)]
    pub formats: Vec<String>,
}

fn default_export_directory() -> PathBuf {
    PathBuf::from("tangle-out")
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            directory: default_export_directory(),
            formats: Vec::new(),
        }
    }
}

/// A validated, self-contained analysis job.
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub project_name: String,
    pub analysis_name: String,
    pub source_directory: PathBuf,
    pub languages: BTreeSet<Language>,
    pub extensions: BTreeSet<String>,
    pub ignore_directories: Vec<String>,
    /// Anchored for full-string matching.
    pub ignore_dependencies: Vec<Regex>,
    pub ignore_entities: Vec<String>,
    pub file_scan: BTreeSet<Metric>,
    pub entity_scan: BTreeSet<Metric>,
    pub max_workers: usize,
    pub export_directory: PathBuf,
    pub export_formats: Vec<ExportFormat>,
}

impl JobSpec {
    /// An ad-hoc file scan of `root` with every metric enabled.
    pub fn for_directory(
        root: &Path,
        languages: BTreeSet<Language>,
        export_directory: PathBuf,
        export_formats: Vec<ExportFormat>,
    ) -> Result<Self, ConfigError> {
        if !root.is_dir() {
            return Err(ConfigError::SourceDirectory {
                path: root.to_path_buf(),
            });
        }
        let name = root
            .canonicalize()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_else(default_analysis_name);
        Ok(Self {
            project_name: name.clone(),
            analysis_name: name,
            source_directory: root.to_path_buf(),
            languages,
            extensions: BTreeSet::new(),
            ignore_directories: Vec::new(),
            ignore_dependencies: Vec::new(),
            ignore_entities: Vec::new(),
            file_scan: Metric::ALL.into_iter().collect(),
            entity_scan: BTreeSet::new(),
            max_workers: default_workers(),
            export_directory,
            export_formats,
        })
    }

    /// Requested scans with their metrics, file scan first.
    pub fn scans(&self) -> Vec<(ScanType, &BTreeSet<Metric>)> {
        [
            (ScanType::File, &self.file_scan),
            (ScanType::Entity, &self.entity_scan),
        ]
        .into_iter()
        .filter(|(_, metrics)| !metrics.is_empty())
        .collect()
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn resolve(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Compiles an ignore pattern so that it must match the whole statement.
pub fn anchored_pattern(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|source| ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

impl AnalysisConfig {
    fn to_job(&self, project_name: &str, base_dir: &Path) -> Result<JobSpec, ConfigError> {
        let languages = self
            .only_permit_languages
            .iter()
            .map(|tag| tag.parse::<Language>())
            .collect::<Result<BTreeSet<_>, _>>()?;

        let extensions = self
            .only_permit_file_extensions
            .iter()
            .map(|ext| {
                let ext = ext.trim();
                if ext.len() < 2 || !ext.starts_with('.') {
                    Err(ConfigError::InvalidExtension(ext.to_string()))
                } else {
                    Ok(ext.to_lowercase())
                }
            })
            .collect::<Result<BTreeSet<_>, _>>()?;

        let ignore_dependencies = self
            .ignore_dependencies_matching
            .iter()
            .map(|p| anchored_pattern(p))
            .collect::<Result<Vec<_>, _>>()?;

        let parse_metrics = |ids: &[String]| {
            ids.iter()
                .map(|id| id.parse::<Metric>())
                .collect::<Result<BTreeSet<_>, _>>()
        };
        let file_scan = parse_metrics(&self.file_scan)?;
        let entity_scan = parse_metrics(&self.entity_scan)?;
        if file_scan.is_empty() && entity_scan.is_empty() {
            return Err(ConfigError::NothingToScan);
        }

        let mut export_formats = Vec::new();
        for id in &self.export.formats {
            let format = id.parse::<ExportFormat>()?;
            if !export_formats.contains(&format) {
                export_formats.push(format);
            }
        }

        let max_workers = match self.max_workers {
            Some(0) => return Err(ConfigError::ZeroWorkers),
            Some(n) => n,
            None => default_workers(),
        };

        let source_directory = resolve(base_dir, &self.source_directory);
        if !source_directory.is_dir() {
            return Err(ConfigError::SourceDirectory {
                path: source_directory,
            });
        }

        Ok(JobSpec {
            project_name: project_name.to_string(),
            analysis_name: self.analysis_name.clone(),
            source_directory,
            languages,
            extensions,
            ignore_directories: self.ignore_directories_containing.clone(),
            ignore_dependencies,
            ignore_entities: self.ignore_entities_containing.clone(),
            file_scan,
            entity_scan,
            max_workers,
            export_directory: resolve(base_dir, &self.export.directory),
            export_formats,
        })
    }
}

impl Config {
    /// Load configuration from a `tangle.toml` file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Check every analysis and turn it into a job. Relative paths are
    /// resolved against `base_dir`, normally the config file's directory.
    pub fn validate(&self, base_dir: &Path) -> Result<Vec<JobSpec>, ConfigError> {
        if self.analyses.is_empty() {
            return Err(ConfigError::NoAnalyses);
        }
        self.analyses
            .iter()
            .map(|analysis| {
                analysis
                    .to_job(&self.project_name, base_dir)
                    .map_err(|e| e.in_analysis(&analysis.analysis_name))
            })
            .collect()
    }

    /// Generate default TOML content for `tangle init`.
    pub fn default_toml() -> String {
        r#"# tangle - dependency graph and modularity analysis
project_name = "my-project"

# error | warn | info | debug | trace (TANGLE_LOG overrides this)
loglevel = "info"

[[analyses]]
analysis_name = "main"
source_directory = "."

# Language tags: java, kotlin, swift, c, cpp, groovy, javascript, typescript,
# objc, ruby, py, go, cs, vbnet, rust, css, scss, twig. Empty means all.
only_permit_languages = []

# Extensions with a leading dot. Empty means every extension of the languages above.
only_permit_file_extensions = []

ignore_directories_containing = [".git", "node_modules", "target", "vendor", "test"]

# Regular expressions matched against the whole dependency statement.
ignore_dependencies_matching = []

ignore_entities_containing = []

# number_of_methods, source_lines_of_code, dependency_graph,
# louvain_modularity, fan_in_out, tfidf
file_scan = ["number_of_methods", "source_lines_of_code", "dependency_graph", "louvain_modularity", "fan_in_out"]
entity_scan = []

# max_workers = 8

[analyses.export]
directory = "tangle-out"
# graphml, dot, json, tabular_file, tabular_console, tabular_console_overall, d3
formats = ["json", "graphml", "tabular_console_overall"]
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::error_chain;
    use tempfile::TempDir;

    fn parse(toml_src: &str) -> Config {
        toml::from_str(toml_src).unwrap()
    }

    #[test]
    fn test_default_toml_parses_and_validates() {
        let dir = TempDir::new().unwrap();
        let config = parse(&Config::default_toml());
        assert_eq!(config.project_name, "my-project");
        assert_eq!(config.loglevel, LogLevel::Info);

        let jobs = config.validate(dir.path()).unwrap();
        assert_eq!(jobs.len(), 1);
        assert!(jobs[0].languages.is_empty());
        assert_eq!(jobs[0].export_directory, dir.path().join("tangle-out"));
        assert_eq!(jobs[0].scans().len(), 1);
    }

    #[test]
    fn test_full_analysis_table() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        let config = parse(
            r#"
project_name = "demo"
loglevel = "debug"

[[analyses]]
analysis_name = "csharp check"
source_directory = "src"
only_permit_languages = ["cs"]
only_permit_file_extensions = [".CS"]
ignore_directories_containing = ["test"]
ignore_dependencies_matching = ["System\\..*"]
file_scan = ["sloc", "fan_in_out", "fan_in_out"]
entity_scan = ["dependency_graph"]
max_workers = 2

[analyses.export]
directory = "/tmp/out"
formats = ["json", "d3", "json"]
"#,
        );
        let jobs = config.validate(dir.path()).unwrap();
        let job = &jobs[0];
        assert_eq!(job.project_name, "demo");
        assert_eq!(job.source_directory, dir.path().join("src"));
        assert!(job.languages.contains(&Language::CSharp));
        assert!(job.extensions.contains(".cs"));
        assert_eq!(job.file_scan.len(), 2);
        assert_eq!(job.max_workers, 2);
        assert_eq!(job.export_directory, PathBuf::from("/tmp/out"));
        assert_eq!(job.export_formats, vec![ExportFormat::Json, ExportFormat::D3]);
        assert!(job.ignore_dependencies[0].is_match("System.Text"));
        assert!(!job.ignore_dependencies[0].is_match("MySystem.Text"));
        let scans: Vec<_> = job.scans().into_iter().map(|(s, _)| s).collect();
        assert_eq!(scans, vec![ScanType::File, ScanType::Entity]);
    }

    fn analysis_with(extra: &str) -> String {
        format!(
            "[[analyses]]\nanalysis_name = \"bad\"\nsource_directory = \".\"\nfile_scan = [\"sloc\"]\n{extra}\n"
        )
    }

    #[test]
    fn test_validation_errors() {
        let dir = TempDir::new().unwrap();
        let cases = [
            ("only_permit_languages = [\"cobol\"]", "unknown language 'cobol'"),
            ("only_permit_file_extensions = [\"cs\"]", "must start with '.'"),
            ("ignore_dependencies_matching = [\"(\"]", "invalid ignore pattern '('"),
            ("max_workers = 0", "max_workers"),
            ("[analyses.export]\nformats = [\"xlsx\"]", "unknown export format 'xlsx'"),
        ];
        for (extra, expected) in cases {
            let err = parse(&analysis_with(extra)).validate(dir.path()).unwrap_err();
            assert_eq!(err.to_string(), "analysis 'bad'");
            let message = error_chain(&err);
            assert!(message.starts_with("analysis 'bad': "), "{message}");
            assert!(message.contains(expected), "{message}");
        }
    }

    #[test]
    fn test_unknown_metric_and_empty_scans() {
        let dir = TempDir::new().unwrap();
        let config = parse(
            "[[analyses]]\nsource_directory = \".\"\nfile_scan = [\"halstead\"]\n",
        );
        let err = config.validate(dir.path()).unwrap_err();
        assert!(error_chain(&err).contains("unknown metric 'halstead'"));

        let config = parse("[[analyses]]\nsource_directory = \".\"\n");
        assert!(matches!(
            config.validate(dir.path()),
            Err(ConfigError::Analysis { source, .. }) if matches!(*source, ConfigError::NothingToScan)
        ));
    }

    #[test]
    fn test_missing_source_directory() {
        let dir = TempDir::new().unwrap();
        let config = parse(
            "[[analyses]]\nsource_directory = \"does-not-exist\"\nfile_scan = [\"sloc\"]\n",
        );
        let err = config.validate(dir.path()).unwrap_err();
        assert!(error_chain(&err).contains("does-not-exist"));
    }

    #[test]
    fn test_no_analyses() {
        let dir = TempDir::new().unwrap();
        let err = Config::default().validate(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::NoAnalyses));
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tangle.toml");
        std::fs::write(&path, "loglevel = \"loud\"\n").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));
        assert!(matches!(
            Config::load(&dir.path().join("missing.toml")),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_for_directory() {
        let dir = TempDir::new().unwrap();
        let job = JobSpec::for_directory(dir.path(), BTreeSet::new(), dir.path().join("out"), vec![])
            .unwrap();
        assert_eq!(job.file_scan.len(), Metric::ALL.len());
        assert!(job.entity_scan.is_empty());
        assert!(JobSpec::for_directory(&dir.path().join("nope"), BTreeSet::new(), PathBuf::new(), vec![]).is_err());
    }
}
