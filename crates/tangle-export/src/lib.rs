//! Writers that turn an [`AnalysisSnapshot`] into files or console output.
//!
//! Every format is rendered and written on its own: a failure in one never
//! prevents the others from completing.

pub mod d3;
pub mod dot;
pub mod graphml;
pub mod json;
pub mod tabular;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use tangle_core::snapshot::AnalysisSnapshot;
use tangle_core::types::ExportFormat;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to render {format}: {message}")]
    Render {
        format: ExportFormat,
        message: String,
    },

    #[error("failed to write {format} export to '{}': {source}", path.display())]
    Write {
        format: ExportFormat,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExportError {
    pub fn format(&self) -> ExportFormat {
        match self {
            ExportError::Render { format, .. } | ExportError::Write { format, .. } => *format,
        }
    }
}

/// One output format.
pub trait Exporter {
    fn format(&self) -> ExportFormat;

    /// Artifact file name, or `None` for formats printed to the console.
    fn file_name(&self, snapshot: &AnalysisSnapshot) -> Option<String>;

    fn render(&self, snapshot: &AnalysisSnapshot) -> anyhow::Result<String>;
}

pub fn exporter_for(format: ExportFormat) -> Box<dyn Exporter> {
    match format {
        ExportFormat::Graphml => Box::new(graphml::GraphmlExporter),
        ExportFormat::Dot => Box::new(dot::DotExporter),
        ExportFormat::Json => Box::new(json::JsonExporter),
        ExportFormat::TabularFile => Box::new(tabular::TabularFileExporter),
        ExportFormat::TabularConsole => Box::new(tabular::ConsoleTableExporter),
        ExportFormat::TabularConsoleOverall => Box::new(tabular::ConsoleSummaryExporter),
        ExportFormat::D3 => Box::new(d3::D3Exporter),
    }
}

/// What happened to one requested format.
#[derive(Debug)]
pub struct ExportOutcome {
    pub format: ExportFormat,
    /// Written file, `None` for console output.
    pub result: Result<Option<PathBuf>, ExportError>,
}

impl ExportOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

fn export_one(
    exporter: &dyn Exporter,
    snapshot: &AnalysisSnapshot,
    directory: &Path,
    console: &mut dyn Write,
) -> Result<Option<PathBuf>, ExportError> {
    let format = exporter.format();
    let rendered = exporter
        .render(snapshot)
        .map_err(|e| ExportError::Render {
            format,
            message: format!("{e:#}"),
        })?;

    match exporter.file_name(snapshot) {
        None => {
            console
                .write_all(rendered.as_bytes())
                .and_then(|()| console.flush())
                .map_err(|source| ExportError::Write {
                    format,
                    path: PathBuf::from("<stdout>"),
                    source,
                })?;
            Ok(None)
        }
        Some(name) => {
            let path = directory.join(name);
            fs::create_dir_all(directory)
                .and_then(|()| fs::write(&path, rendered))
                .map_err(|source| ExportError::Write {
                    format,
                    path: path.clone(),
                    source,
                })?;
            Ok(Some(path))
        }
    }
}

/// Write every requested format of one snapshot.
pub fn write_all(
    snapshot: &AnalysisSnapshot,
    formats: &[ExportFormat],
    directory: &Path,
    console: &mut dyn Write,
) -> Vec<ExportOutcome> {
    formats
        .iter()
        .map(|&format| {
            let exporter = exporter_for(format);
            let result = export_one(exporter.as_ref(), snapshot, directory, console);
            match &result {
                Ok(Some(path)) => info!(%format, path = %path.display(), "export written"),
                Ok(None) => {}
                Err(e) => warn!(%format, error = %e, "export failed"),
            }
            ExportOutcome { format, result }
        })
        .collect()
}

/// Escape text for XML attribute and element content.
pub(crate) fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
