pub mod collector;
pub mod config;
pub mod error;
pub mod graph;
pub mod language;
pub mod logging;
pub mod metrics;
pub mod modularity;
pub mod pipeline;
pub mod resolver;
pub mod scanner;
pub mod snapshot;
pub mod tfidf;
pub mod types;

pub use config::{Config, JobSpec};
pub use error::{ConfigError, JobError, ScanWarning, WarningKind};
pub use graph::{FrozenGraph, GraphBuilder};
pub use language::Language;
pub use logging::LogLevel;
pub use modularity::{Community, Partition};
pub use pipeline::{run_all, AnalysisPipeline};
pub use snapshot::{AnalysisSnapshot, AnalysisSummary, EdgeRecord, NodeRecord};
pub use types::*;
