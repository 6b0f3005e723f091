//! Mapping of raw dependency statements to scanned files and entities.
//!
//! Resolution is purely textual. When several candidates fit a statement,
//! the one sharing the longest directory prefix with the importing file wins;
//! remaining ties go to the lexically smallest path.

use std::collections::{BTreeMap, HashMap};

use crate::language::Language;

/// Directory part of a `/`-separated relative path.
fn parent_dir(path: &str) -> &str {
    path.rfind('/').map_or("", |i| &path[..i])
}

fn file_name(path: &str) -> &str {
    path.rfind('/').map_or(path, |i| &path[i + 1..])
}

/// File name without its last extension.
fn stem(path: &str) -> &str {
    let name = file_name(path);
    match name.rfind('.') {
        Some(0) | None => name,
        Some(i) => &name[..i],
    }
}

fn without_extension(path: &str) -> &str {
    let name_start = path.len() - file_name(path).len();
    match file_name(path).rfind('.') {
        Some(0) | None => path,
        Some(i) => &path[..name_start + i],
    }
}

/// Number of leading directory segments two paths share.
fn shared_prefix(a: &str, b: &str) -> usize {
    parent_dir(a)
        .split('/')
        .zip(parent_dir(b).split('/'))
        .take_while(|(x, y)| !x.is_empty() && x == y)
        .count()
}

/// Picks the candidate nearest to `importer` among (file path, value) pairs.
pub fn pick_nearest<'a, T>(
    importer: &str,
    candidates: impl IntoIterator<Item = (&'a str, T)>,
) -> Option<T> {
    candidates
        .into_iter()
        .min_by(|(pa, _), (pb, _)| {
            shared_prefix(importer, pb)
                .cmp(&shared_prefix(importer, pa))
                .then_with(|| pa.cmp(pb))
        })
        .map(|(_, value)| value)
}

/// Collapses `.` and `..` segments; `None` if the path climbs above the root.
fn normalize(path: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

/// Splits a qualified name on `.`, `::`, `/` and `\`.
pub fn segments(dependency: &str) -> Vec<&str> {
    dependency
        .split(['.', ':', '/', '\\'])
        .filter(|s| !s.is_empty())
        .collect()
}

fn is_wildcard(dependency: &str) -> bool {
    dependency.ends_with(".*") || dependency.ends_with("::*")
}

/// Rust paths start with a crate-relative keyword that never names a file.
fn trim_path_keywords<'a>(language: Language, segs: Vec<&'a str>) -> Vec<&'a str> {
    if language != Language::Rust {
        return segs;
    }
    segs.into_iter()
        .skip_while(|s| matches!(*s, "crate" | "self" | "super"))
        .collect()
}

struct FileEntry {
    path: String,
    module: Option<String>,
    /// Extensionless path segments.
    segments: Vec<String>,
}

/// Resolves dependency statements of a file graph.
pub struct FileResolver {
    files: Vec<FileEntry>,
    by_path: HashMap<String, usize>,
    by_stem: BTreeMap<String, Vec<usize>>,
}

impl FileResolver {
    /// `files` are (relative path, declared module) pairs.
    pub fn new<'a>(files: impl IntoIterator<Item = (&'a str, Option<&'a str>)>) -> Self {
        let mut resolver = Self {
            files: Vec::new(),
            by_path: HashMap::new(),
            by_stem: BTreeMap::new(),
        };
        for (path, module) in files {
            let idx = resolver.files.len();
            resolver.by_path.insert(path.to_string(), idx);
            resolver
                .by_stem
                .entry(stem(path).to_string())
                .or_default()
                .push(idx);
            resolver.files.push(FileEntry {
                path: path.to_string(),
                module: module.map(str::to_string),
                segments: without_extension(path)
                    .split('/')
                    .map(str::to_string)
                    .collect(),
            });
        }
        resolver
    }

    /// Relative path of the file `dependency` refers to, if it is part of the scan.
    pub fn resolve(&self, importer: &str, language: Language, dependency: &str) -> Option<&str> {
        if language == Language::Go {
            return self.resolve_go_package(importer, dependency);
        }
        let explicit_path = dependency.contains('/')
            || dependency.contains('\\')
            || dependency.starts_with("./")
            || dependency.starts_with("../");

        if explicit_path || language.syntax().path_imports {
            return self.resolve_path(importer, language, dependency);
        }
        if is_wildcard(dependency) {
            return None;
        }
        self.resolve_qualified(importer, language, dependency)
    }

    fn nearest(&self, importer: &str, candidates: &[usize]) -> Option<&str> {
        pick_nearest(
            importer,
            candidates.iter().map(|&i| (self.files[i].path.as_str(), i)),
        )
        .map(|i| self.files[i].path.as_str())
    }

    fn lookup(&self, base: &str, language: Language) -> Option<&str> {
        let base = normalize(base)?;
        if base.is_empty() {
            return None;
        }
        let mut tried = vec![base.clone()];
        tried.extend(language.extensions().iter().map(|ext| format!("{base}{ext}")));
        if matches!(language, Language::JavaScript | Language::TypeScript) {
            tried.extend(
                language
                    .extensions()
                    .iter()
                    .map(|ext| format!("{base}/index{ext}")),
            );
        }
        if language == Language::Python {
            tried.push(format!("{base}/__init__.py"));
        }
        // Sass partials: `@use 'base/vars'` loads `base/_vars.scss`.
        if language == Language::Scss {
            let name = file_name(&base);
            let dir = &base[..base.len() - name.len()];
            tried.push(format!("{dir}_{name}.scss"));
            tried.push(format!("{base}/_index.scss"));
        }
        tried
            .iter()
            .find_map(|candidate| self.by_path.get(candidate))
            .map(|&i| self.files[i].path.as_str())
    }

    fn resolve_path(&self, importer: &str, language: Language, dependency: &str) -> Option<&str> {
        let dependency = dependency.replace('\\', "/");
        let dir = parent_dir(importer);
        let relative = if dir.is_empty() {
            dependency.clone()
        } else {
            format!("{dir}/{dependency}")
        };
        if let Some(found) = self.lookup(&relative, language) {
            return Some(found);
        }
        if dependency.starts_with("./") || dependency.starts_with("../") {
            return None;
        }
        if let Some(found) = self.lookup(&dependency, language) {
            return Some(found);
        }

        // Include directories and load paths: any file whose path ends with the statement.
        let suffix = normalize(&dependency)?;
        let candidates: Vec<usize> = self
            .files
            .iter()
            .enumerate()
            .filter(|(_, f)| {
                let bare = without_extension(&f.path);
                [f.path.as_str(), bare]
                    .iter()
                    .any(|p| p.ends_with(&format!("/{suffix}")))
            })
            .map(|(i, _)| i)
            .collect();
        self.nearest(importer, &candidates)
    }

    /// Go imports name a package directory; a bare name such as `errors` is the standard library.
    fn resolve_go_package(&self, importer: &str, dependency: &str) -> Option<&str> {
        if !dependency.contains('/') {
            return None;
        }
        let suffix = normalize(dependency)?;
        let candidates: Vec<usize> = self
            .files
            .iter()
            .enumerate()
            .filter(|(_, f)| {
                let dir = parent_dir(&f.path);
                !dir.is_empty() && (suffix == dir || suffix.ends_with(&format!("/{dir}")))
            })
            .map(|(i, _)| i)
            .collect();
        let deepest = candidates
            .iter()
            .map(|&i| parent_dir(&self.files[i].path).len())
            .max()?;
        let in_deepest: Vec<usize> = candidates
            .into_iter()
            .filter(|&i| parent_dir(&self.files[i].path).len() == deepest)
            .collect();
        self.nearest(importer, &in_deepest)
    }

    fn resolve_qualified(&self, importer: &str, language: Language, dependency: &str) -> Option<&str> {
        let segs = trim_path_keywords(language, segments(dependency));
        if language != Language::Rust {
            return self.resolve_segments(importer, dependency, &segs);
        }
        // `use a::b::Item` names an item inside module `a::b`.
        (1..=segs.len())
            .rev()
            .find_map(|n| self.resolve_segments(importer, dependency, &segs[..n]))
    }

    fn resolve_segments(&self, importer: &str, dependency: &str, segs: &[&str]) -> Option<&str> {
        let last = *segs.last()?;

        let by_module: Vec<usize> = self.by_stem.get(last).map_or_else(Vec::new, |idx| {
            idx.iter()
                .copied()
                .filter(|&i| {
                    self.files[i]
                        .module
                        .as_ref()
                        .is_some_and(|m| format!("{m}.{last}") == dependency)
                })
                .collect()
        });
        if !by_module.is_empty() {
            return self.nearest(importer, &by_module);
        }

        if segs.len() >= 2 {
            let by_suffix: Vec<usize> = self
                .files
                .iter()
                .enumerate()
                .filter(|(_, f)| ends_with_segments(&f.segments, segs))
                .map(|(i, _)| i)
                .collect();
            if !by_suffix.is_empty() {
                return self.nearest(importer, &by_suffix);
            }
        }

        // A file that declares a different module is not what a qualified name points at.
        let by_stem: Vec<usize> = self
            .by_stem
            .get(last)?
            .iter()
            .copied()
            .filter(|&i| segs.len() < 2 || self.files[i].module.is_none())
            .collect();
        self.nearest(importer, &by_stem)
    }
}

fn ends_with_segments(path: &[String], tail: &[&str]) -> bool {
    path.len() >= tail.len()
        && path[path.len() - tail.len()..]
            .iter()
            .zip(tail)
            .all(|(a, b)| a == b)
}

struct EntityEntry {
    id: String,
    path: String,
}

/// Resolves imports and parent names of an entity graph to entity ids.
pub struct EntityResolver {
    entries: Vec<EntityEntry>,
    by_qualified: HashMap<String, Vec<usize>>,
    by_name: HashMap<String, Vec<usize>>,
}

impl EntityResolver {
    /// `entities` are (node id, qualified name, simple name, file path) tuples.
    pub fn new<'a>(entities: impl IntoIterator<Item = (&'a str, &'a str, &'a str, &'a str)>) -> Self {
        let mut resolver = Self {
            entries: Vec::new(),
            by_qualified: HashMap::new(),
            by_name: HashMap::new(),
        };
        for (id, qualified, name, path) in entities {
            let idx = resolver.entries.len();
            resolver
                .by_qualified
                .entry(qualified.to_string())
                .or_default()
                .push(idx);
            let simple = segments(name).last().copied().unwrap_or(name);
            resolver
                .by_name
                .entry(simple.to_string())
                .or_default()
                .push(idx);
            resolver.entries.push(EntityEntry {
                id: id.to_string(),
                path: path.to_string(),
            });
        }
        resolver
    }

    fn nearest(&self, importer: &str, candidates: &[usize]) -> Option<&str> {
        pick_nearest(
            importer,
            candidates.iter().map(|&i| (self.entries[i].path.as_str(), i)),
        )
        .map(|i| self.entries[i].id.as_str())
    }

    /// Node id of the entity `reference` names, as seen from a file at `importer`.
    pub fn resolve(&self, importer: &str, language: Language, reference: &str) -> Option<&str> {
        if is_wildcard(reference) {
            return None;
        }
        let segs = trim_path_keywords(language, segments(reference));
        let dotted = segs.join(".");
        if let Some(found) = self.by_qualified.get(&dotted) {
            return self.nearest(importer, found);
        }
        let found = self.by_name.get(*segs.last()?)?;
        self.nearest(importer, found)
    }
}
