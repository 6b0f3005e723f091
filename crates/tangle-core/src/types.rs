use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Granularity of a dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanType {
    File,
    Entity,
}

impl fmt::Display for ScanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanType::File => write!(f, "file"),
            ScanType::Entity => write!(f, "entity"),
        }
    }
}

/// A metric that can be requested for a file or entity scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    NumberOfMethods,
    SourceLinesOfCode,
    DependencyGraph,
    LouvainModularity,
    FanInOut,
    Tfidf,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::NumberOfMethods,
        Metric::SourceLinesOfCode,
        Metric::DependencyGraph,
        Metric::LouvainModularity,
        Metric::FanInOut,
        Metric::Tfidf,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::NumberOfMethods => "number_of_methods",
            Metric::SourceLinesOfCode => "source_lines_of_code",
            Metric::DependencyGraph => "dependency_graph",
            Metric::LouvainModularity => "louvain_modularity",
            Metric::FanInOut => "fan_in_out",
            Metric::Tfidf => "tfidf",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "number_of_methods" | "methods" => Ok(Metric::NumberOfMethods),
            "source_lines_of_code" | "sloc" => Ok(Metric::SourceLinesOfCode),
            "dependency_graph" => Ok(Metric::DependencyGraph),
            "louvain_modularity" | "modularity" => Ok(Metric::LouvainModularity),
            "fan_in_out" => Ok(Metric::FanInOut),
            "tfidf" => Ok(Metric::Tfidf),
            _ => Err(ConfigError::UnknownMetric(s.to_string())),
        }
    }
}

/// Output format identifiers accepted in `export.formats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Graphml,
    Dot,
    Json,
    TabularFile,
    TabularConsole,
    TabularConsoleOverall,
    D3,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Graphml => "graphml",
            ExportFormat::Dot => "dot",
            ExportFormat::Json => "json",
            ExportFormat::TabularFile => "tabular_file",
            ExportFormat::TabularConsole => "tabular_console",
            ExportFormat::TabularConsoleOverall => "tabular_console_overall",
            ExportFormat::D3 => "d3",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "graphml" => Ok(ExportFormat::Graphml),
            "dot" | "graphviz" => Ok(ExportFormat::Dot),
            "json" => Ok(ExportFormat::Json),
            "tabular_file" | "tsv" => Ok(ExportFormat::TabularFile),
            "tabular_console" => Ok(ExportFormat::TabularConsole),
            "tabular_console_overall" => Ok(ExportFormat::TabularConsoleOverall),
            "d3" => Ok(ExportFormat::D3),
            _ => Err(ConfigError::UnknownFormat(s.to_string())),
        }
    }
}

/// What a graph node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Entity,
    /// A dependency target that resolved to no scanned file or entity.
    External,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::File => write!(f, "file"),
            NodeKind::Entity => write!(f, "entity"),
            NodeKind::External => write!(f, "external"),
        }
    }
}

/// Kind of dependency relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Import,
    Inheritance,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::Import => write!(f, "import"),
            EdgeKind::Inheritance => write!(f, "inheritance"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_parse() {
        assert_eq!("sloc".parse::<Metric>().unwrap(), Metric::SourceLinesOfCode);
        assert_eq!(
            "louvain_modularity".parse::<Metric>().unwrap(),
            Metric::LouvainModularity
        );
        assert_eq!(" FAN_IN_OUT ".parse::<Metric>().unwrap(), Metric::FanInOut);
        assert!("halstead".parse::<Metric>().is_err());
    }

    #[test]
    fn test_metric_names_round_trip() {
        for metric in Metric::ALL {
            assert_eq!(metric.as_str().parse::<Metric>().unwrap(), metric);
        }
    }

    #[test]
    fn test_export_format_parse() {
        assert_eq!("d3".parse::<ExportFormat>().unwrap(), ExportFormat::D3);
        assert_eq!(
            "tabular_console_overall".parse::<ExportFormat>().unwrap(),
            ExportFormat::TabularConsoleOverall
        );
        assert!("xlsx".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_scan_type_display() {
        assert_eq!(ScanType::File.to_string(), "file");
        assert_eq!(ScanType::Entity.to_string(), "entity");
    }
}
