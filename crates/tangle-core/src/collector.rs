//! Source file discovery for one analysis job.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::error::{ConfigError, ScanWarning, WarningKind};
use crate::language::Language;

/// A file accepted for scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedFile {
    pub path: PathBuf,
    /// Path relative to the source root, always `/`-separated.
    pub relative_path: String,
    pub language: Language,
}

#[derive(Debug, Default)]
pub struct Collection {
    /// Sorted by relative path.
    pub files: Vec<CollectedFile>,
    pub warnings: Vec<ScanWarning>,
}

pub struct SourceCollector {
    languages: BTreeSet<Language>,
    extensions: BTreeSet<String>,
    ignore_directories: Vec<String>,
}

impl SourceCollector {
    /// An empty language set permits every language; an empty extension set
    /// permits every extension of the permitted languages.
    pub fn new(
        languages: BTreeSet<Language>,
        extensions: BTreeSet<String>,
        ignore_directories: Vec<String>,
    ) -> Self {
        let languages = if languages.is_empty() {
            Language::ALL.into_iter().collect()
        } else {
            languages
        };
        let extensions = if extensions.is_empty() {
            languages
                .iter()
                .flat_map(|lang| lang.extensions().iter().map(|ext| ext.to_string()))
                .collect()
        } else {
            extensions.into_iter().map(|ext| ext.to_lowercase()).collect()
        };
        Self {
            languages,
            extensions,
            ignore_directories,
        }
    }

    pub fn languages(&self) -> &BTreeSet<Language> {
        &self.languages
    }

    /// Language for a path, if the path passes the extension filter.
    pub fn classify(&self, path: &Path) -> Option<Language> {
        let extension = format!(".{}", path.extension()?.to_str()?.to_lowercase());
        if !self.extensions.contains(&extension) {
            return None;
        }
        Language::for_extension(&extension, &self.languages)
    }

    /// Any entry below the root whose name contains an ignore substring.
    fn is_ignored(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 {
            return false;
        }
        let name = entry.file_name().to_string_lossy();
        self.ignore_directories
            .iter()
            .any(|pattern| name.contains(pattern.as_str()))
    }

    /// Walk `root` and return every permitted source file.
    ///
    /// A missing or unreadable root is fatal. Entries that fail below the
    /// root become warnings.
    pub fn collect(&self, root: &Path) -> Result<Collection, ConfigError> {
        let is_dir = fs::metadata(root).map(|m| m.is_dir()).unwrap_or(false);
        if !is_dir || fs::read_dir(root).is_err() {
            return Err(ConfigError::SourceDirectory {
                path: root.to_path_buf(),
            });
        }

        let mut collection = Collection::default();
        let mut pruned = 0usize;
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                if self.is_ignored(entry) {
                    debug!(path = %entry.path().display(), "skipping ignored entry");
                    pruned += 1;
                    false
                } else {
                    true
                }
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .map(|p| relative_path(root, p))
                        .unwrap_or_default();
                    warn!(path = %path, error = %e, "failed to visit directory entry");
                    collection
                        .warnings
                        .push(ScanWarning::new(path, WarningKind::Walk, e.to_string()));
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(language) = self.classify(entry.path()) else {
                continue;
            };
            collection.files.push(CollectedFile {
                relative_path: relative_path(root, entry.path()),
                path: entry.into_path(),
                language,
            });
        }

        collection
            .files
            .sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        info!(
            root = %root.display(),
            files = collection.files.len(),
            ignored_entries = pruned,
            "collected source files"
        );
        Ok(collection)
    }
}

/// `/`-separated path of `path` below `root`.
pub fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
