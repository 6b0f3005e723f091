//! Error and warning types shared by the analysis pipeline.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration problems. Always fatal, raised before any file of the job is read.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}'", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{}': {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("no analyses configured")]
    NoAnalyses,

    #[error("source directory '{}' does not exist or is not a readable directory", path.display())]
    SourceDirectory { path: PathBuf },

    #[error("unknown language '{0}'")]
    UnknownLanguage(String),

    #[error("file extension '{0}' must start with '.'")]
    InvalidExtension(String),

    #[error("unknown metric '{0}'")]
    UnknownMetric(String),

    #[error("unknown export format '{0}'")]
    UnknownFormat(String),

    #[error("unknown log level '{0}'")]
    UnknownLogLevel(String),

    #[error("invalid ignore pattern '{pattern}'")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("neither file_scan nor entity_scan is configured")]
    NothingToScan,

    #[error("max_workers must be greater than zero")]
    ZeroWorkers,

    #[error("analysis '{name}'")]
    Analysis {
        name: String,
        #[source]
        source: Box<ConfigError>,
    },
}

impl ConfigError {
    pub fn in_analysis(self, name: &str) -> Self {
        ConfigError::Analysis {
            name: name.to_string(),
            source: Box::new(self),
        }
    }
}

/// Kind of recoverable, per-file problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Directory entry could not be visited while collecting sources.
    Walk,
    /// File could not be read; it contributes nothing to the graph.
    FileRead,
    /// File is not valid UTF-8 and was decoded lossily.
    Encoding,
    /// Structure could not be fully extracted; metrics are partial.
    Extraction,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningKind::Walk => write!(f, "walk"),
            WarningKind::FileRead => write!(f, "read"),
            WarningKind::Encoding => write!(f, "encoding"),
            WarningKind::Extraction => write!(f, "extraction"),
        }
    }
}

/// A recorded, non-fatal problem with a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{kind} warning for {path}: {message}")]
pub struct ScanWarning {
    pub path: String,
    pub kind: WarningKind,
    pub message: String,
}

impl ScanWarning {
    pub fn new(path: impl Into<String>, kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            message: message.into(),
        }
    }
}

/// Failure of one analysis job. Other jobs of the same run are unaffected.
#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build scanner thread pool")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Message of an error followed by each of its sources, `: ` separated.
#[cfg(test)]
pub(crate) fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}
