use std::collections::{BTreeSet, HashMap};
use std::fs;

use regex::{Captures, Regex};
use tracing::{debug, warn};

use crate::collector::CollectedFile;
use crate::error::{ConfigError, ScanWarning, WarningKind};
use crate::language::{Language, SpanStyle, Syntax};

/// Names that show up where a method name is expected but are control flow.
const CONTROL_KEYWORDS: &[&str] = &[
    "if", "else", "elif", "for", "foreach", "while", "do", "switch", "case", "catch", "try",
    "finally", "return", "sizeof", "typeof", "synchronized", "using", "lock", "fixed", "checked",
    "unchecked", "when", "with", "new", "delete", "throw", "yield", "await", "super", "this",
    "function", "defined",
];

/// Words that turn a declaration-looking line into an expression.
const EXPRESSION_KEYWORDS: &[&str] = &["new", "return", "throw", "else", "await", "yield"];

/// Keywords that survive in inheritance clauses and are never parent names.
const HERITAGE_KEYWORDS: &[&str] = &[
    "extends", "implements", "public", "private", "protected", "internal", "virtual", "final",
    "open", "class", "struct", "override", "sealed", "abstract", "static", "const", "new",
    "object", "with", "fileprivate", "where",
];

/// Entity names that only come out of parse noise.
const ENTITY_KEYWORDS: &[&str] = &[
    "class", "struct", "interface", "enum", "namespace", "using", "public", "private",
    "protected", "internal", "static", "readonly", "virtual", "override", "abstract", "new",
    "this", "base", "event", "delegate", "operator", "implicit", "explicit", "extends", "where",
];

const NATURAL_STOPWORDS: &[&str] = &[
    "switch", "props", "id", "and", "the", "to", "of", "or", "then", "any", "use", "see", "do",
    "this", "def", "end", "with", "without", "if", "else", "in", "where", "is", "it", "by", "you",
    "for", "license", "all", "from", "that", "an", "get", "set", "as", "when", "up", "ok", "may",
    "foo", "bar", "baz", "at", "too", "only", "but", "just",
];

/// Which optional extractions a scan performs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanOptions {
    pub entities: bool,
    pub tokens: bool,
}

/// An entity (class, struct, module, ...) found inside a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedEntity {
    pub name: String,
    /// `<module>.<name>` when the file declares a module, else `name`.
    pub qualified_name: String,
    /// 1-based, inclusive.
    pub start_line: usize,
    pub end_line: usize,
    pub sloc: usize,
    pub methods: usize,
    pub imports: Vec<String>,
    pub inheritance: Vec<String>,
    pub tokens: Vec<String>,
}

/// Everything the scanner learned about one file.
#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub relative_path: String,
    pub language: Language,
    /// False when the file could not be read at all; such files get no node.
    pub readable: bool,
    pub module: Option<String>,
    pub sloc: usize,
    pub methods: usize,
    /// Dependency statements that survived the ignore patterns, in source order.
    pub dependencies: Vec<String>,
    pub ignored_dependencies: usize,
    pub entities: Vec<ScannedEntity>,
    pub tokens: Vec<String>,
    pub warnings: Vec<ScanWarning>,
}

impl ScannedFile {
    fn empty(relative_path: &str, language: Language) -> Self {
        Self {
            relative_path: relative_path.to_string(),
            language,
            readable: true,
            module: None,
            sloc: 0,
            methods: 0,
            dependencies: Vec::new(),
            ignored_dependencies: 0,
            entities: Vec::new(),
            tokens: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

struct CompiledSyntax {
    syntax: &'static Syntax,
    methods: Vec<Regex>,
    dependencies: Vec<Regex>,
    blocks: Vec<(Regex, Regex)>,
    relative_imports: Option<Regex>,
    module: Option<Regex>,
    entity: Option<Regex>,
    body_inheritance: Option<Regex>,
    closing: Option<Regex>,
}

impl CompiledSyntax {
    fn compile(syntax: &'static Syntax) -> Result<Self, ConfigError> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })
        };
        let compile_all = |patterns: &[&str]| -> Result<Vec<Regex>, ConfigError> {
            patterns.iter().map(|p| compile(p)).collect()
        };

        let blocks = syntax
            .dependency_blocks
            .iter()
            .map(|(open, item)| Ok((compile(open)?, compile(item)?)))
            .collect::<Result<Vec<_>, ConfigError>>()?;
        let closing = match syntax.span {
            SpanStyle::Closing(pattern) => Some(compile(pattern)?),
            _ => None,
        };

        Ok(Self {
            syntax,
            methods: compile_all(syntax.methods)?,
            dependencies: compile_all(syntax.dependencies)?,
            blocks,
            relative_imports: syntax.relative_imports.map(compile).transpose()?,
            module: syntax.module.map(compile).transpose()?,
            entity: syntax.entity.map(compile).transpose()?,
            body_inheritance: syntax.body_inheritance.map(compile).transpose()?,
            closing,
        })
    }
}

/// A source text with comments blanked out.
///
/// `code` keeps string literals (dependency paths live there), `skeleton`
/// blanks their contents as well. Both have the same line structure as the
/// original text.
struct Stripped {
    code: String,
    skeleton: String,
}

#[derive(Clone, Copy)]
enum StripState {
    Code,
    LineComment,
    Block(&'static str),
    Str(char),
}

fn blank(code: &mut String, skeleton: &mut String, n: usize) {
    for _ in 0..n {
        code.push(' ');
        skeleton.push(' ');
    }
}

fn strip(text: &str, syntax: &Syntax) -> Stripped {
    let mut code = String::with_capacity(text.len());
    let mut skeleton = String::with_capacity(text.len());
    let mut state = StripState::Code;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c == '\n' {
            code.push('\n');
            skeleton.push('\n');
            if matches!(state, StripState::LineComment | StripState::Str(_)) {
                state = StripState::Code;
            }
            continue;
        }

        match state {
            StripState::Code => {
                let rest = &text[i..];
                if let Some(&(open, close)) = syntax
                    .block_comments
                    .iter()
                    .find(|(open, _)| rest.starts_with(open))
                {
                    blank(&mut code, &mut skeleton, open.len());
                    for _ in 1..open.len() {
                        chars.next();
                    }
                    state = StripState::Block(close);
                } else if syntax.line_comments.iter().any(|t| rest.starts_with(t)) {
                    blank(&mut code, &mut skeleton, 1);
                    state = StripState::LineComment;
                } else if syntax.string_delimiters.contains(&c) {
                    code.push(c);
                    skeleton.push(c);
                    state = StripState::Str(c);
                } else {
                    code.push(c);
                    skeleton.push(c);
                }
            }
            StripState::LineComment => blank(&mut code, &mut skeleton, 1),
            StripState::Block(close) => {
                if text[i..].starts_with(close) {
                    blank(&mut code, &mut skeleton, close.len());
                    for _ in 1..close.len() {
                        chars.next();
                    }
                    state = StripState::Code;
                } else {
                    blank(&mut code, &mut skeleton, 1);
                }
            }
            StripState::Str(delimiter) => {
                if syntax.backslash_escapes && c == '\\' {
                    code.push(c);
                    skeleton.push(' ');
                    if let Some(&(_, next)) = chars.peek() {
                        if next != '\n' {
                            chars.next();
                            code.push(next);
                            skeleton.push(' ');
                        }
                    }
                } else if c == delimiter {
                    code.push(c);
                    skeleton.push(c);
                    state = StripState::Code;
                } else {
                    code.push(c);
                    skeleton.push(' ');
                }
            }
        }
    }

    Stripped { code, skeleton }
}

/// Byte offsets of line starts, for mapping regex matches to line numbers.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { starts }
    }

    /// 0-based line containing `offset`.
    fn line_of(&self, offset: usize) -> usize {
        self.starts.partition_point(|&start| start <= offset) - 1
    }

    fn len(&self) -> usize {
        self.starts.len()
    }
}

/// One file's stripped text, split into lines, with the syntax it was stripped with.
struct SourceText<'a> {
    relative_path: &'a str,
    language: Language,
    compiled: &'a CompiledSyntax,
    skeleton: &'a str,
    code_lines: Vec<&'a str>,
    skeleton_lines: Vec<&'a str>,
    index: LineIndex,
}

impl<'a> SourceText<'a> {
    fn new(
        relative_path: &'a str,
        language: Language,
        compiled: &'a CompiledSyntax,
        stripped: &'a Stripped,
    ) -> Self {
        Self {
            relative_path,
            language,
            compiled,
            skeleton: &stripped.skeleton,
            code_lines: stripped.code.split('\n').collect(),
            skeleton_lines: stripped.skeleton.split('\n').collect(),
            index: LineIndex::new(&stripped.skeleton),
        }
    }

    /// 0-based last line of an entity, or a message when the body never closes.
    fn span_end(&self, match_end: usize, start: usize, decl_end: usize) -> Result<usize, String> {
        let Self {
            compiled,
            ref skeleton_lines,
            ref index,
            ..
        } = *self;
        let last = skeleton_lines.len() - 1;
        match compiled.syntax.span {
            SpanStyle::Braces => {
                let rest = &self.skeleton[match_end..];
                let body_offset = rest.len() - rest.trim_start().len();
                if !rest[body_offset..].starts_with('{') {
                    return Ok(decl_end);
                }
                let mut depth = 0usize;
                for (i, c) in rest[body_offset..].char_indices() {
                    match c {
                        '{' => depth += 1,
                        '}' => {
                            depth -= 1;
                            if depth == 0 {
                                return Ok(index.line_of(match_end + body_offset + i));
                            }
                        }
                        _ => {}
                    }
                }
                Err("unbalanced braces, body runs to end of file".to_string())
            }
            SpanStyle::Indentation => {
                let decl_indent = indentation(skeleton_lines[start]);
                let mut end = decl_end;
                for (i, line) in skeleton_lines.iter().enumerate().skip(decl_end + 1) {
                    if is_blank(line) {
                        continue;
                    }
                    if indentation(line) <= decl_indent {
                        break;
                    }
                    end = i;
                }
                Ok(end)
            }
            SpanStyle::IndentedEnd => {
                let decl_line = skeleton_lines[start];
                if decl_line
                    .split(|c: char| !c.is_alphanumeric() && c != '_')
                    .skip_while(|w| *w != "class" && *w != "module")
                    .any(|w| w == "end")
                {
                    return Ok(start);
                }
                let decl_indent = indentation(decl_line);
                for (i, line) in skeleton_lines.iter().enumerate().skip(decl_end + 1) {
                    let trimmed = line.trim_start();
                    let is_end = trimmed == "end"
                        || trimmed.starts_with("end ")
                        || trimmed.starts_with("end;")
                        || trimmed.starts_with("end.");
                    if is_end && indentation(line) <= decl_indent {
                        return Ok(i);
                    }
                }
                Err("missing 'end', body runs to end of file".to_string())
            }
            SpanStyle::Closing(_) => {
                let (Some(closing), Some(open)) = (compiled.closing.as_ref(), compiled.entity.as_ref()) else {
                    return Ok(last);
                };
                // The rest of the declaration line may already close it: `{% block a %}x{% endblock %}`.
                let line_end = self.skeleton[match_end..]
                    .find('\n')
                    .map_or(self.skeleton.len(), |n| match_end + n);
                let tail = &self.skeleton[match_end..line_end];
                let mut depth = 1 + open.find_iter(tail).count();
                let lines = std::iter::once((decl_end, tail))
                    .chain(skeleton_lines.iter().copied().enumerate().skip(decl_end + 1));
                for (i, line) in lines {
                    if i > decl_end {
                        depth += open.find_iter(line).count();
                    }
                    let closed = closing.find_iter(line).count();
                    if closed >= depth {
                        return Ok(i);
                    }
                    depth -= closed;
                }
                Err("missing closing statement, body runs to end of file".to_string())
            }
        }
    }
}

fn indentation(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Removes balanced `open .. close` groups; an unmatched `open` becomes a space.
fn remove_bracketed(text: &str, open: char, close: char) -> String {
    let mut out = String::with_capacity(text.len());
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == open {
            let mut depth = 0usize;
            let mut end = None;
            for (j, &c) in chars.iter().enumerate().skip(i) {
                if c == open {
                    depth += 1;
                } else if c == close {
                    depth -= 1;
                    if depth == 0 {
                        end = Some(j);
                        break;
                    }
                }
            }
            match end {
                Some(j) => {
                    out.push(' ');
                    i = j + 1;
                }
                None => {
                    out.push(' ');
                    i += 1;
                }
            }
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

/// Extracts parent type names from the text following an entity name.
fn parse_parents(raw: &str, in_parens: bool) -> Vec<String> {
    let mut text = raw.trim().to_string();
    if in_parens {
        text = text
            .trim_start_matches('(')
            .trim_end_matches(')')
            .split(',')
            .filter(|part| !part.contains('='))
            .collect::<Vec<_>>()
            .join(",");
    } else {
        text = remove_bracketed(&text, '(', ')');
    }
    text = remove_bracketed(&text, '<', '>');
    if let Some(pos) = text.split_whitespace().position(|w| w == "where") {
        text = text
            .split_whitespace()
            .take(pos)
            .collect::<Vec<_>>()
            .join(" ");
    }

    let mut parents = Vec::new();
    for token in text.split(|c: char| !(c.is_alphanumeric() || matches!(c, '_' | '.' | ':' | '$'))) {
        let token = token.trim_matches(|c| c == ':' || c == '.');
        if token.is_empty() || HERITAGE_KEYWORDS.contains(&token) {
            continue;
        }
        if !token.starts_with(|c: char| c.is_alphabetic() || c == '_') {
            continue;
        }
        if !parents.iter().any(|p: &String| p == token) {
            parents.push(token.to_string());
        }
    }
    parents
}

fn normalize_dependency(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|part| part.split_whitespace().next())
        .map(|part| part.trim_matches(|c| c == '"' || c == '\'').to_string())
        .filter(|part| !part.is_empty())
        .collect()
}

/// `from ..pkg import a` becomes `../pkg`; without a module every imported
/// name is a sibling module: `from . import a, b` gives `./a` and `./b`.
fn relative_dependencies(caps: &Captures<'_>) -> Vec<String> {
    let depth = caps.name("dots").map_or(1, |m| m.as_str().len());
    let prefix = if depth <= 1 {
        "./".to_string()
    } else {
        "../".repeat(depth - 1)
    };
    match caps.name("module").map(|m| m.as_str()).filter(|m| !m.is_empty()) {
        Some(module) => vec![format!("{prefix}{}", module.replace('.', "/"))],
        None => caps
            .name("names")
            .map(|names| normalize_dependency(names.as_str()))
            .unwrap_or_default()
            .into_iter()
            .map(|name| format!("{prefix}{name}"))
            .collect(),
    }
}

/// Lexical scanner for the languages of one analysis job.
pub struct Scanner {
    compiled: HashMap<Language, CompiledSyntax>,
    ignore_dependencies: Vec<Regex>,
    ignore_entities: Vec<String>,
    identifier: Regex,
    options: ScanOptions,
}

impl Scanner {
    /// `ignore_dependencies` must already be anchored for full-string matching.
    pub fn new(
        languages: &BTreeSet<Language>,
        ignore_dependencies: Vec<Regex>,
        ignore_entities: Vec<String>,
        options: ScanOptions,
    ) -> Result<Self, ConfigError> {
        let mut compiled = HashMap::with_capacity(languages.len());
        for &language in languages {
            compiled.insert(language, CompiledSyntax::compile(language.syntax())?);
        }
        let identifier = Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").map_err(|source| {
            ConfigError::InvalidPattern {
                pattern: "identifier".to_string(),
                source,
            }
        })?;
        Ok(Self {
            compiled,
            ignore_dependencies,
            ignore_entities,
            identifier,
            options,
        })
    }

    /// True if the statement fully matches any configured ignore pattern.
    pub fn is_ignored(&self, dependency: &str) -> bool {
        self.ignore_dependencies
            .iter()
            .any(|pattern| pattern.is_match(dependency))
    }

    /// Read and scan one collected file. Never fails: problems become warnings.
    pub fn scan_file(&self, file: &CollectedFile) -> ScannedFile {
        let bytes = match fs::read(&file.path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %file.relative_path, error = %e, "failed to read source file");
                let mut scanned = ScannedFile::empty(&file.relative_path, file.language);
                scanned.readable = false;
                scanned.warnings.push(ScanWarning::new(
                    &file.relative_path,
                    WarningKind::FileRead,
                    e.to_string(),
                ));
                return scanned;
            }
        };

        let (text, encoding_warning) = match String::from_utf8(bytes) {
            Ok(text) => (text, None),
            Err(e) => {
                warn!(path = %file.relative_path, "source file is not valid UTF-8, decoding lossily");
                let text = String::from_utf8_lossy(e.as_bytes()).into_owned();
                let warning = ScanWarning::new(
                    &file.relative_path,
                    WarningKind::Encoding,
                    format!("invalid UTF-8: {}", e.utf8_error()),
                );
                (text, Some(warning))
            }
        };

        let mut scanned = self.scan_source(&file.relative_path, file.language, &text);
        if let Some(warning) = encoding_warning {
            scanned.warnings.insert(0, warning);
        }
        scanned
    }

    /// Scan already-loaded source text.
    pub fn scan_source(&self, relative_path: &str, language: Language, text: &str) -> ScannedFile {
        let mut scanned = ScannedFile::empty(relative_path, language);
        let Some(compiled) = self.compiled.get(&language) else {
            scanned.warnings.push(ScanWarning::new(
                relative_path,
                WarningKind::Extraction,
                format!("language '{language}' is not enabled for this analysis"),
            ));
            return scanned;
        };

        let text = text.strip_prefix('\u{feff}').unwrap_or(text).replace("\r\n", "\n");
        let stripped = strip(&text, compiled.syntax);
        let source = SourceText::new(relative_path, language, compiled, &stripped);

        scanned.sloc = source.code_lines.iter().filter(|line| !is_blank(line)).count();

        let method_lines = self.method_lines(compiled, source.skeleton, &source.index);
        scanned.methods = method_lines.len();

        let (dependencies, ignored) = self.dependencies(compiled, &source.code_lines);
        scanned.dependencies = dependencies;
        scanned.ignored_dependencies = ignored;

        scanned.module = compiled
            .module
            .as_ref()
            .and_then(|re| re.captures(source.skeleton))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string());

        if self.options.tokens {
            scanned.tokens = self.tokens(language, source.skeleton_lines.iter().copied());
        }

        if self.options.entities {
            scanned.entities = self.entities(&source, &method_lines, &mut scanned);
        }

        debug!(
            path = relative_path,
            sloc = scanned.sloc,
            methods = scanned.methods,
            dependencies = scanned.dependencies.len(),
            entities = scanned.entities.len(),
            "scanned file"
        );
        scanned
    }

    /// 0-based line of every method declaration, in order.
    fn method_lines(&self, compiled: &CompiledSyntax, skeleton: &str, index: &LineIndex) -> Vec<usize> {
        let mut lines = Vec::new();
        for re in &compiled.methods {
            for caps in re.captures_iter(skeleton) {
                if let Some(name) = caps.name("name") {
                    if CONTROL_KEYWORDS.contains(&name.as_str()) {
                        continue;
                    }
                }
                if let Some(prefix) = caps.name("prefix") {
                    if prefix
                        .as_str()
                        .split_whitespace()
                        .any(|word| EXPRESSION_KEYWORDS.contains(&word))
                    {
                        continue;
                    }
                }
                if let Some(whole) = caps.get(0) {
                    let offset = caps.name("name").map_or(whole.start(), |m| m.start());
                    lines.push(index.line_of(offset));
                }
            }
        }
        lines.sort_unstable();
        lines
    }

    /// Returns the surviving dependency statements and the number ignored.
    fn dependencies(&self, compiled: &CompiledSyntax, code_lines: &[&str]) -> (Vec<String>, usize) {
        let mut raw = Vec::new();
        let mut open_block: Option<&Regex> = None;

        for line in code_lines {
            if let Some(item) = open_block {
                if line.trim_start().starts_with(')') {
                    open_block = None;
                } else if let Some(dep) = item.captures(line).and_then(|caps| caps.get(1)) {
                    raw.push(dep.as_str().to_string());
                }
                continue;
            }
            if let Some((_, item)) = compiled.blocks.iter().find(|(open, _)| open.is_match(line)) {
                open_block = Some(item);
                continue;
            }
            for re in &compiled.dependencies {
                for caps in re.captures_iter(line) {
                    if let Some(dep) = caps.get(1) {
                        raw.extend(normalize_dependency(dep.as_str()));
                    }
                }
            }
            if let Some(caps) = compiled.relative_imports.as_ref().and_then(|re| re.captures(line)) {
                raw.extend(relative_dependencies(&caps));
            }
        }

        self.filter_ignored(raw)
    }

    fn filter_ignored(&self, raw: Vec<String>) -> (Vec<String>, usize) {
        let mut seen = BTreeSet::new();
        let mut kept = Vec::new();
        let mut ignored = 0;
        for dep in raw {
            if !seen.insert(dep.clone()) {
                continue;
            }
            if self.is_ignored(&dep) {
                debug!(dependency = %dep, "dependency matches ignore pattern");
                ignored += 1;
            } else {
                kept.push(dep);
            }
        }
        (kept, ignored)
    }

    fn tokens<'a>(&self, language: Language, lines: impl Iterator<Item = &'a str>) -> Vec<String> {
        let stopwords = language.syntax().stopwords;
        let mut tokens = Vec::new();
        for line in lines {
            for m in self.identifier.find_iter(line) {
                let token = m.as_str();
                if token.len() < 2 || !token.chars().all(|c| c.is_ascii_alphabetic()) {
                    continue;
                }
                let token = token.to_lowercase();
                if NATURAL_STOPWORDS.contains(&token.as_str()) || stopwords.contains(&token.as_str()) {
                    continue;
                }
                tokens.push(token);
            }
        }
        tokens
    }

    fn entities(
        &self,
        source: &SourceText<'_>,
        method_lines: &[usize],
        scanned: &mut ScannedFile,
    ) -> Vec<ScannedEntity> {
        let SourceText {
            relative_path,
            language,
            compiled,
            ref code_lines,
            ref skeleton_lines,
            ref index,
            ..
        } = *source;
        let Some(entity_re) = compiled.entity.as_ref() else {
            return Vec::new();
        };

        let mut entities = Vec::new();
        for caps in entity_re.captures_iter(source.skeleton) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.name("name")) else {
                continue;
            };
            let name = name.as_str();
            if ENTITY_KEYWORDS.contains(&name) {
                continue;
            }
            if self.ignore_entities.iter().any(|s| name.contains(s.as_str())) {
                debug!(entity = name, "entity matches ignore list");
                continue;
            }

            let start = index.line_of(whole.start() + (whole.as_str().len() - whole.as_str().trim_start().len()));
            let decl_end = index.line_of(whole.end().saturating_sub(1).max(whole.start()));
            let end = match source.span_end(whole.end(), start, decl_end) {
                Ok(end) => end,
                Err(message) => {
                    warn!(path = relative_path, entity = name, "{message}");
                    scanned.warnings.push(ScanWarning::new(
                        relative_path,
                        WarningKind::Extraction,
                        format!("entity '{name}': {message}"),
                    ));
                    index.len() - 1
                }
            };

            let mut inheritance = caps
                .name("parents")
                .map(|p| parse_parents(p.as_str(), compiled.syntax.parents_in_parens))
                .unwrap_or_default();
            if let Some(body_re) = compiled.body_inheritance.as_ref() {
                for line in &skeleton_lines[start..=end] {
                    if let Some(list) = body_re.captures(line).and_then(|c| c.get(1)) {
                        for parent in list.as_str().split(',') {
                            let parent = parent.trim();
                            if !parent.is_empty() && !inheritance.iter().any(|p| p == parent) {
                                inheritance.push(parent.to_string());
                            }
                        }
                    }
                }
            }
            let (inheritance, ignored) = self.filter_ignored(inheritance);
            scanned.ignored_dependencies += ignored;

            let qualified_name = match &scanned.module {
                Some(module) => format!("{module}.{name}"),
                None => name.to_string(),
            };
            let sloc = code_lines[start..=end].iter().filter(|l| !is_blank(l)).count();
            let methods = method_lines
                .iter()
                .filter(|&&line| line >= start && line <= end)
                .count();
            let tokens = if self.options.tokens {
                self.tokens(language, skeleton_lines[start..=end].iter().copied())
            } else {
                Vec::new()
            };

            entities.push(ScannedEntity {
                name: name.to_string(),
                qualified_name,
                start_line: start + 1,
                end_line: end + 1,
                sloc,
                methods,
                imports: scanned.dependencies.clone(),
                inheritance,
                tokens,
            });
        }
        entities
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner(languages: &[Language], ignore: &[&str], options: ScanOptions) -> Scanner {
        let ignore = ignore
            .iter()
            .map(|p| Regex::new(&format!("^(?:{p})$")).unwrap())
            .collect();
        Scanner::new(
            &languages.iter().copied().collect(),
            ignore,
            Vec::new(),
            options,
        )
        .unwrap()
    }

    fn entity_scanner(language: Language) -> Scanner {
        scanner(
            &[language],
            &[],
            ScanOptions {
                entities: true,
                tokens: false,
            },
        )
    }

    #[test]
    fn test_sloc_skips_blank_and_comment_lines() {
        let src = r#"// header comment
using System;

/* block
   comment */
namespace Demo {
    class A { } // trailing comment keeps the line
}
"#;
        let s = scanner(&[Language::CSharp], &[], ScanOptions::default());
        let result = s.scan_source("A.cs", Language::CSharp, src);
        assert_eq!(result.sloc, 4);
    }

    #[test]
    fn test_comment_markers_inside_strings_are_code() {
        let src = "let url = \"http://example.com\";\nlet x = 1;\n";
        let s = scanner(&[Language::Rust], &[], ScanOptions::default());
        let result = s.scan_source("a.rs", Language::Rust, src);
        assert_eq!(result.sloc, 2);
    }

    #[test]
    fn test_python_docstrings_are_not_sloc() {
        let src = "\"\"\"Module docstring.\n\nMore text.\n\"\"\"\nimport os\n\n# comment\ndef main():\n    pass\n";
        let s = scanner(&[Language::Python], &[], ScanOptions::default());
        let result = s.scan_source("main.py", Language::Python, src);
        assert_eq!(result.sloc, 3);
        assert_eq!(result.methods, 1);
        assert_eq!(result.dependencies, vec!["os"]);
    }

    #[test]
    fn test_python_relative_imports_become_paths() {
        let src = "from . import b, c as d\nfrom .. import x\nfrom .models import User\nfrom ..core.db import (Session,\n    Engine)\nfrom app.views import index\n";
        let s = scanner(&[Language::Python], &[], ScanOptions::default());
        let result = s.scan_source("pkg/a.py", Language::Python, src);
        assert_eq!(
            result.dependencies,
            vec!["./b", "./c", "../x", "./models", "../core/db", "app.views"]
        );
    }

    #[test]
    fn test_java_methods_and_imports() {
        let src = r#"package com.example;

import java.util.List;
import static org.junit.Assert.assertEquals;

public class Service extends Base implements Runnable {
    public Service(int x) {
        super(x);
    }

    @Override
    public void run() {
        if (ready) {
            work();
        }
        for (int i = 0; i < 3; i++) {
        }
    }

    private static List<String> names(final int limit) throws Exception {
        return new ArrayList<>();
    }
}
"#;
        let s = entity_scanner(Language::Java);
        let result = s.scan_source("Service.java", Language::Java, src);
        assert_eq!(result.methods, 3);
        assert_eq!(
            result.dependencies,
            vec!["java.util.List", "org.junit.Assert.assertEquals"]
        );
        assert_eq!(result.module.as_deref(), Some("com.example"));

        assert_eq!(result.entities.len(), 1);
        let entity = &result.entities[0];
        assert_eq!(entity.qualified_name, "com.example.Service");
        assert_eq!(entity.inheritance, vec!["Base", "Runnable"]);
        assert_eq!(entity.start_line, 6);
        assert_eq!(entity.end_line, 23);
        assert_eq!(entity.methods, 3);
    }

    #[test]
    fn test_ignore_patterns_match_full_statement() {
        let src = "using System.Text;\nusing Project.C;\nusing SystemX;\n";
        let s = scanner(&[Language::CSharp], &["System\\..*"], ScanOptions::default());
        let result = s.scan_source("A.cs", Language::CSharp, src);
        assert_eq!(result.dependencies, vec!["Project.C", "SystemX"]);
        assert_eq!(result.ignored_dependencies, 1);
    }

    #[test]
    fn test_partial_pattern_does_not_ignore() {
        let s = scanner(&[Language::CSharp], &["System"], ScanOptions::default());
        assert!(s.is_ignored("System"));
        assert!(!s.is_ignored("System.Text"));
    }

    #[test]
    fn test_go_import_block() {
        let src = "package main\n\nimport (\n\t\"fmt\"\n\tlog \"github.com/sirupsen/logrus\"\n)\n\nimport \"os\"\n\nfunc main() {}\nfunc helper() {}\n";
        let s = scanner(&[Language::Go], &[], ScanOptions::default());
        let result = s.scan_source("main.go", Language::Go, src);
        assert_eq!(
            result.dependencies,
            vec!["fmt", "github.com/sirupsen/logrus", "os"]
        );
        assert_eq!(result.methods, 2);
        assert_eq!(result.module.as_deref(), Some("main"));
    }

    #[test]
    fn test_javascript_imports_and_requires() {
        let src = r#"import React from 'react';
import { a,
  b } from './util';
const fs = require("fs");
// import nothing from 'commented';
function top() {}
const arrow = (x) => x * 2;
"#;
        let s = scanner(&[Language::JavaScript], &[], ScanOptions::default());
        let result = s.scan_source("index.js", Language::JavaScript, src);
        assert_eq!(result.dependencies, vec!["react", "./util", "fs"]);
        assert_eq!(result.methods, 2);
    }

    #[test]
    fn test_python_comma_imports_and_class_span() {
        let src = "import os, sys as system\nfrom pkg.mod import thing\n\nclass Foo(Base, metaclass=Meta):\n    def a(self):\n        pass\n\n    def b(self):\n        pass\n\ndef outside():\n    pass\n";
        let s = entity_scanner(Language::Python);
        let result = s.scan_source("foo.py", Language::Python, src);
        assert_eq!(result.dependencies, vec!["os", "sys", "pkg.mod"]);
        assert_eq!(result.methods, 3);
        let foo = &result.entities[0];
        assert_eq!(foo.name, "Foo");
        assert_eq!(foo.inheritance, vec!["Base"]);
        assert_eq!((foo.start_line, foo.end_line), (4, 9));
        assert_eq!(foo.methods, 2);
    }

    #[test]
    fn test_ruby_class_ends_at_matching_end() {
        let src = "require 'json'\n\nclass Parser < Base\n  def parse\n    if x\n      y\n    end\n  end\nend\n\nmodule Util; end\n";
        let s = entity_scanner(Language::Ruby);
        let result = s.scan_source("parser.rb", Language::Ruby, src);
        assert_eq!(result.dependencies, vec!["json"]);
        assert_eq!(result.entities.len(), 2);
        assert_eq!(result.entities[0].inheritance, vec!["Base"]);
        assert_eq!(result.entities[0].end_line, 9);
        assert_eq!(result.entities[1].name, "Util");
        assert_eq!(result.entities[1].end_line, 11);
    }

    #[test]
    fn test_vbnet_entities_and_inherits() {
        let src = "Imports System.IO\n\nNamespace Shapes\n    Public Class Circle\n        Inherits Shape\n        Public Function Area() As Double\n            Return 1\n        End Function\n    End Class\nEnd Namespace\n";
        let s = entity_scanner(Language::VbNet);
        let result = s.scan_source("Circle.vb", Language::VbNet, src);
        assert_eq!(result.dependencies, vec!["System.IO"]);
        assert_eq!(result.methods, 1);
        let circle = &result.entities[0];
        assert_eq!(circle.qualified_name, "Shapes.Circle");
        assert_eq!(circle.inheritance, vec!["Shape"]);
        assert_eq!((circle.start_line, circle.end_line), (4, 9));
    }

    #[test]
    fn test_css_imports() {
        let src = "/* @import \"commented.css\"; */\n@import \"reset.css\";\n@import url('theme/dark.css') screen;\n\nbody { margin: 0; }\n";
        let s = scanner(&[Language::Css], &[], ScanOptions::default());
        let result = s.scan_source("main.css", Language::Css, src);
        assert_eq!(result.dependencies, vec!["reset.css", "theme/dark.css"]);
        assert_eq!(result.sloc, 3);
    }

    #[test]
    fn test_scss_imports_mixins_and_extends() {
        let src = "// @import 'old';\n@use 'sass:math';\n@import 'base/vars', 'base/colors';\n@forward \"tools\";\n\n@mixin button-base {\n  @extend %clickable;\n  padding: 4px;\n}\n\n@mixin gap($size) {\n  margin: $size;\n}\n\n@function double($n) { @return $n * 2; }\n";
        let s = entity_scanner(Language::Scss);
        let result = s.scan_source("app.scss", Language::Scss, src);
        assert_eq!(
            result.dependencies,
            vec!["sass:math", "base/vars", "base/colors", "tools"]
        );
        assert_eq!(result.methods, 3);
        assert_eq!(result.entities.len(), 2);
        let mixin = &result.entities[0];
        assert_eq!(mixin.name, "button-base");
        assert_eq!(mixin.inheritance, vec!["clickable"]);
        assert_eq!((mixin.start_line, mixin.end_line), (6, 9));
        let gap = &result.entities[1];
        assert_eq!((gap.name.as_str(), gap.start_line, gap.end_line), ("gap", 11, 13));
    }

    #[test]
    fn test_twig_includes_and_blocks() {
        let src = "{% extends 'layouts/base.html.twig' %}\n{# {% include 'hidden.twig' %} #}\n{% import \"macros/forms.twig\" as forms %}\n\n{% block title %}Don't panic{% endblock %}\n\n{% block body %}\n  {% block intro %}Hi{% endblock %}\n  {{ include('partials/card.twig') }}\n{% endblock %}\n";
        let s = entity_scanner(Language::Twig);
        let result = s.scan_source("page.html.twig", Language::Twig, src);
        assert_eq!(
            result.dependencies,
            vec!["layouts/base.html.twig", "macros/forms.twig", "partials/card.twig"]
        );
        let spans: Vec<(&str, usize, usize)> = result
            .entities
            .iter()
            .map(|e| (e.name.as_str(), e.start_line, e.end_line))
            .collect();
        assert_eq!(spans, vec![("title", 5, 5), ("body", 7, 10), ("intro", 8, 8)]);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_csharp_allman_braces() {
        let src = "namespace Project\n{\n    public class C : B, IThing\n    {\n        public void Run()\n        {\n        }\n    }\n}\n";
        let s = entity_scanner(Language::CSharp);
        let result = s.scan_source("C.cs", Language::CSharp, src);
        let c = &result.entities[0];
        assert_eq!(c.qualified_name, "Project.C");
        assert_eq!(c.inheritance, vec!["B", "IThing"]);
        assert_eq!((c.start_line, c.end_line), (3, 8));
        assert_eq!(c.methods, 1);
    }

    #[test]
    fn test_unbalanced_braces_degrade_to_partial_metrics() {
        let src = "package a;\npublic class Broken {\n    void run() {\n";
        let s = entity_scanner(Language::Java);
        let result = s.scan_source("Broken.java", Language::Java, src);
        assert_eq!(result.entities.len(), 1);
        assert_eq!(result.entities[0].end_line, 4);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::Extraction));
    }

    #[test]
    fn test_c_includes() {
        let src = "#include <stdio.h>\n#include \"util/strings.h\"\n\nstatic int add(int a, int b)\n{\n    return a + b;\n}\n\nint sub(int a, int b);\n";
        let s = scanner(&[Language::C], &[], ScanOptions::default());
        let result = s.scan_source("math.c", Language::C, src);
        assert_eq!(result.dependencies, vec!["stdio.h", "util/strings.h"]);
        assert_eq!(result.methods, 1);
    }

    #[test]
    fn test_rust_use_and_mod() {
        let src = "use std::collections::{HashMap, HashSet};\nuse crate::graph::Graph;\nmod scanner;\n\npub fn run() {}\nasync fn go() {}\n";
        let s = scanner(&[Language::Rust], &[], ScanOptions::default());
        let result = s.scan_source("lib.rs", Language::Rust, src);
        assert_eq!(
            result.dependencies,
            vec!["std::collections", "crate::graph::Graph", "scanner"]
        );
        assert_eq!(result.methods, 2);
    }

    #[test]
    fn test_tokens_skip_stopwords_and_strings() {
        let src = "class Ledger:\n    def balance(self):\n        return \"ignored words\"\n";
        let s = scanner(
            &[Language::Python],
            &[],
            ScanOptions {
                entities: false,
                tokens: true,
            },
        );
        let result = s.scan_source("ledger.py", Language::Python, src);
        assert_eq!(result.tokens, vec!["ledger", "balance"]);
    }

    #[test]
    fn test_bom_is_stripped() {
        let src = "\u{feff}Imports System\r\nModule M\r\nEnd Module\r\n";
        let s = entity_scanner(Language::VbNet);
        let result = s.scan_source("m.vb", Language::VbNet, src);
        assert_eq!(result.dependencies, vec!["System"]);
        assert_eq!(result.entities.len(), 1);
    }

    #[test]
    fn test_parse_parents_variants() {
        assert_eq!(parse_parents(" : public Base, private Other ", false), vec!["Base", "Other"]);
        assert_eq!(parse_parents("<T> extends Base<T> implements A, B", false), vec!["Base", "A", "B"]);
        assert_eq!(parse_parents("(val x: Int) : Parent(), Iface", false), vec!["Parent", "Iface"]);
        assert_eq!(parse_parents("< Base", false), vec!["Base"]);
        assert_eq!(parse_parents("(Base, object)", true), vec!["Base"]);
        assert_eq!(parse_parents(": Codable where T: Equatable", false), vec!["Codable"]);
        assert!(parse_parents("", false).is_empty());
    }
}
