//! Supported languages and the lexical syntax each one is scanned with.
//!
//! Every language is a variant of one closed enum. A variant's [`Syntax`]
//! describes comments, string literals and the regular expressions used to
//! find methods, dependency statements, module declarations and entities.
//! The scanner never consults anything beyond this table.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "java")]
    Java,
    #[serde(rename = "kotlin")]
    Kotlin,
    #[serde(rename = "swift")]
    Swift,
    #[serde(rename = "c")]
    C,
    #[serde(rename = "cpp")]
    Cpp,
    #[serde(rename = "groovy")]
    Groovy,
    #[serde(rename = "javascript")]
    JavaScript,
    #[serde(rename = "typescript")]
    TypeScript,
    #[serde(rename = "objc")]
    ObjC,
    #[serde(rename = "ruby")]
    Ruby,
    #[serde(rename = "py")]
    Python,
    #[serde(rename = "go")]
    Go,
    #[serde(rename = "cs")]
    CSharp,
    #[serde(rename = "vbnet")]
    VbNet,
    #[serde(rename = "rust")]
    Rust,
    #[serde(rename = "css")]
    Css,
    #[serde(rename = "scss")]
    Scss,
    #[serde(rename = "twig")]
    Twig,
}

/// How the extent of an entity declaration is located.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanStyle {
    /// Body between the first `{` after the declaration and its matching `}`.
    Braces,
    /// Body is every following line indented deeper than the declaration.
    Indentation,
    /// Body ends at the first `end` line indented no deeper than the declaration.
    IndentedEnd,
    /// Body ends where the closing regex balances the opening declarations.
    Closing(&'static str),
}

/// Lexical description of a language.
#[derive(Debug)]
pub struct Syntax {
    pub line_comments: &'static [&'static str],
    pub block_comments: &'static [(&'static str, &'static str)],
    pub string_delimiters: &'static [char],
    pub backslash_escapes: bool,
    /// Method/function declarations; an optional `name` group is checked
    /// against control keywords, an optional `prefix` group against
    /// expression keywords such as `new` or `return`.
    pub methods: &'static [&'static str],
    /// Per-line dependency statements; capture group 1 is the dependency.
    pub dependencies: &'static [&'static str],
    /// Multi-line dependency blocks as (opening line, item line) regexes.
    pub dependency_blocks: &'static [(&'static str, &'static str)],
    /// Dependencies are written as file paths (`#include "a/b.h"`, `import './x'`).
    pub path_imports: bool,
    /// Dependencies relative to the importing file, with a `dots` group counting
    /// levels and either a `module` group or a comma separated `names` group.
    pub relative_imports: Option<&'static str>,
    pub module: Option<&'static str>,
    /// Entity declaration with a `name` group and an optional `parents` group.
    pub entity: Option<&'static str>,
    /// Extra inheritance statements found inside an entity body.
    pub body_inheritance: Option<&'static str>,
    pub parents_in_parens: bool,
    pub span: SpanStyle,
    pub stopwords: &'static [&'static str],
}

const C_LINE: &[&str] = &["//"];
const C_BLOCK: &[(&str, &str)] = &[("/*", "*/")];

/// A typed declaration (`<modifiers> <type> name(args) ... {`), as written in C-family languages.
const TYPED_BRACED_METHOD: &str = r"(?m)^[ \t]*(?P<prefix>(?:[\w$<>\[\],.?*&:~@]+[ \t]+)+)(?P<name>[A-Za-z_$~][\w$]*(?:::~?[A-Za-z_]\w*)*)[ \t]*\([^;{}]*\)[^;{}=]*\{";

const C_INCLUDE: &str = r#"^\s*#\s*(?:include|import)\s*[<"]([^>"]+)[>"]"#;

const JS_DEPENDENCIES: &[&str] = &[
    r#"\bimport\s+(?:[^'";]*?\s+from\s+)?['"]([^'"]+)['"]"#,
    r#"\bimport\s*\(\s*['"]([^'"]+)['"]\s*\)"#,
    r#"\brequire\s*\(\s*['"]([^'"]+)['"]\s*\)"#,
    r#"\bexport\s+[^'";]*?\s+from\s+['"]([^'"]+)['"]"#,
    r#"^[^'"{]*\}\s*from\s+['"]([^'"]+)['"]"#,
];

const JAVA_STOPWORDS: &[&str] = &[
    "true", "false", "null", "throw", "return", "static", "public", "private", "protected",
    "super", "final", "char", "string", "synchronized", "throws", "long", "int", "import", "new",
    "void",
];

const C_STOPWORDS: &[&str] = &[
    "return", "int", "static", "void", "case", "break", "const", "struct", "printf", "fprintf",
    "unsigned", "extern", "char", "float", "sizeof", "undef", "define",
];

const CPP_STOPWORDS: &[&str] = &[
    "return", "int", "static", "void", "case", "break", "const", "struct", "printf", "fprintf",
    "unsigned", "extern", "char", "float", "sizeof", "string", "bool", "virtual", "override",
    "nullptr", "final", "inline", "template",
];

const JS_STOPWORDS: &[&str] = &[
    "case", "break", "this", "static", "throw", "var", "let", "obj", "const", "string", "export",
    "true", "false", "return", "require", "function", "exports", "null", "void", "undefined",
];

const TS_STOPWORDS: &[&str] = &[
    "break", "var", "case", "this", "import", "let", "const", "return", "public", "private",
    "function", "null", "true", "false", "string", "export", "new", "void", "readonly",
    "abstract", "static", "require", "exports", "boolean", "obj", "index", "undefined", "number",
];

const JAVA: Syntax = Syntax {
    line_comments: C_LINE,
    block_comments: C_BLOCK,
    string_delimiters: &['"', '\''],
    backslash_escapes: true,
    methods: &[TYPED_BRACED_METHOD],
    dependencies: &[r"^\s*import\s+(?:static\s+)?([\w.]+(?:\.\*)?)\s*;"],
    dependency_blocks: &[],
    path_imports: false,
    relative_imports: None,
    module: Some(r"(?m)^\s*package\s+([\w.]+)"),
    entity: Some(r"(?m)^[ \t]*(?:@\w+[ \t]+)*(?:(?:public|protected|private|static|final|abstract|sealed|non-sealed|strictfp)[ \t]+)*(?:class|interface|enum|record|@interface)[ \t]+(?P<name>\w+)(?P<parents>[^{;]*)"),
    body_inheritance: None,
    parents_in_parens: false,
    span: SpanStyle::Braces,
    stopwords: JAVA_STOPWORDS,
};

const KOTLIN: Syntax = Syntax {
    line_comments: C_LINE,
    block_comments: C_BLOCK,
    string_delimiters: &['"', '\''],
    backslash_escapes: true,
    methods: &[r"\bfun\s+(?:<[^>]*>\s*)?(?:[\w.]+\.)?\w+\s*\("],
    dependencies: &[r"^\s*import\s+([\w.]+(?:\.\*)?)"],
    dependency_blocks: &[],
    path_imports: false,
    relative_imports: None,
    module: Some(r"(?m)^\s*package\s+([\w.]+)"),
    entity: Some(r"(?m)^[ \t]*(?:(?:public|private|internal|protected|open|abstract|sealed|data|enum|inner|annotation|value|final|companion)[ \t]+)*(?:class|interface|object)[ \t]+(?P<name>\w+)(?P<parents>[^{\n]*)"),
    body_inheritance: None,
    parents_in_parens: false,
    span: SpanStyle::Braces,
    stopwords: &[
        "null", "val", "var", "lateinit", "fun", "throw", "private", "override", "import",
        "sealed", "const", "object", "set", "return", "string", "map", "int", "boolean", "true",
        "false", "abstract",
    ],
};

const SWIFT: Syntax = Syntax {
    line_comments: C_LINE,
    block_comments: C_BLOCK,
    string_delimiters: &['"'],
    backslash_escapes: true,
    methods: &[r"\bfunc\s+[^\s(<]+", r"(?m)^[ \t]*(?:(?:public|private|fileprivate|internal|open|convenience|required|override)[ \t]+)*init[?!]?\s*\("],
    dependencies: &[r"^\s*(?:@\w+\s+)*import\s+(?:(?:typealias|struct|class|enum|protocol|let|var|func)\s+)?([\w.]+)"],
    dependency_blocks: &[],
    path_imports: false,
    relative_imports: None,
    module: None,
    entity: Some(r"(?m)^[ \t]*(?:(?:public|private|fileprivate|internal|open|final|indirect)[ \t]+)*(?:class|struct|protocol|enum|extension|actor)[ \t]+(?P<name>\w+)(?P<parents>[^{;]*)"),
    body_inheritance: None,
    parents_in_parens: false,
    span: SpanStyle::Braces,
    stopwords: &[
        "didset", "cgfloat", "float", "cgsize", "func", "let", "var", "weak", "return", "true",
        "false", "line", "file", "try", "override", "self", "keypath", "case", "guard", "some",
        "void", "nil", "throws", "private", "struct", "class", "protocol", "bool", "static",
        "inout", "int", "string",
    ],
};

const C: Syntax = Syntax {
    line_comments: C_LINE,
    block_comments: C_BLOCK,
    string_delimiters: &['"', '\''],
    backslash_escapes: true,
    methods: &[TYPED_BRACED_METHOD],
    dependencies: &[C_INCLUDE],
    dependency_blocks: &[],
    path_imports: true,
    relative_imports: None,
    module: None,
    entity: Some(r"(?m)^[ \t]*(?:typedef[ \t]+)?(?:struct|union|enum)[ \t]+(?P<name>\w+)[ \t]*\{"),
    body_inheritance: None,
    parents_in_parens: false,
    span: SpanStyle::Braces,
    stopwords: C_STOPWORDS,
};

const CPP: Syntax = Syntax {
    line_comments: C_LINE,
    block_comments: C_BLOCK,
    string_delimiters: &['"', '\''],
    backslash_escapes: true,
    methods: &[TYPED_BRACED_METHOD],
    dependencies: &[C_INCLUDE],
    dependency_blocks: &[],
    path_imports: true,
    relative_imports: None,
    module: None,
    entity: Some(r"(?m)^[ \t]*(?:template[ \t]*<[^>]*>[ \t]*)?(?:class|struct)[ \t]+(?:\w+[ \t]+)?(?P<name>\w+)(?P<parents>[ \t]*(?:final[ \t]*)?(?::[^;{]*)?)\{"),
    body_inheritance: None,
    parents_in_parens: false,
    span: SpanStyle::Braces,
    stopwords: CPP_STOPWORDS,
};

const GROOVY: Syntax = Syntax {
    line_comments: C_LINE,
    block_comments: C_BLOCK,
    string_delimiters: &['"', '\''],
    backslash_escapes: true,
    methods: &[TYPED_BRACED_METHOD],
    dependencies: &[r"^\s*import\s+(?:static\s+)?([\w.]+(?:\.\*)?)"],
    dependency_blocks: &[],
    path_imports: false,
    relative_imports: None,
    module: Some(r"(?m)^\s*package\s+([\w.]+)"),
    entity: Some(r"(?m)^[ \t]*(?:(?:public|protected|private|static|final|abstract)[ \t]+)*(?:class|interface|enum|trait)[ \t]+(?P<name>\w+)(?P<parents>[^{;]*)"),
    body_inheritance: None,
    parents_in_parens: false,
    span: SpanStyle::Braces,
    stopwords: JAVA_STOPWORDS,
};

const JAVASCRIPT: Syntax = Syntax {
    line_comments: C_LINE,
    block_comments: C_BLOCK,
    string_delimiters: &['"', '\'', '`'],
    backslash_escapes: true,
    methods: &[
        r"\bfunction\b\s*\*?\s*[\w$]*\s*\(",
        r"(?m)^[ \t]*(?:(?:static|async|get|set)[ \t]+)*(?P<name>[A-Za-z_$][\w$]*)[ \t]*\([^;{}()]*\)[ \t]*\{",
        r"\b(?:const|let|var)\s+[\w$]+\s*=\s*(?:async\s*)?(?:\([^()]*\)|[\w$]+)\s*=>",
    ],
    dependencies: JS_DEPENDENCIES,
    dependency_blocks: &[],
    path_imports: true,
    relative_imports: None,
    module: None,
    entity: Some(r"(?m)^[ \t]*(?:export[ \t]+(?:default[ \t]+)?)?class[ \t]+(?P<name>[\w$]+)(?P<parents>[^{]*)"),
    body_inheritance: None,
    parents_in_parens: false,
    span: SpanStyle::Braces,
    stopwords: JS_STOPWORDS,
};

const TYPESCRIPT: Syntax = Syntax {
    line_comments: C_LINE,
    block_comments: C_BLOCK,
    string_delimiters: &['"', '\'', '`'],
    backslash_escapes: true,
    methods: &[
        r"\bfunction\b\s*\*?\s*[\w$]*\s*(?:<[^>]*>)?\s*\(",
        r"(?m)^[ \t]*(?:(?:public|private|protected|static|async|readonly|abstract|override|get|set)[ \t]+)*(?P<name>[A-Za-z_$][\w$]*)[ \t]*(?:<[^>]*>)?\([^;{}()]*\)[ \t]*(?::[^;{}=]+)?\{",
        r"\b(?:const|let|var)\s+[\w$]+\s*(?::[^=]+)?=\s*(?:async\s*)?(?:\([^()]*\)|[\w$]+)\s*(?::[^=]+)?=>",
    ],
    dependencies: JS_DEPENDENCIES,
    dependency_blocks: &[],
    path_imports: true,
    relative_imports: None,
    module: None,
    entity: Some(r"(?m)^[ \t]*(?:export[ \t]+(?:default[ \t]+)?)?(?:declare[ \t]+)?(?:abstract[ \t]+)?(?:class|interface|enum)[ \t]+(?P<name>[\w$]+)(?P<parents>[^{]*)"),
    body_inheritance: None,
    parents_in_parens: false,
    span: SpanStyle::Braces,
    stopwords: TS_STOPWORDS,
};

const OBJC: Syntax = Syntax {
    line_comments: C_LINE,
    block_comments: C_BLOCK,
    string_delimiters: &['"', '\''],
    backslash_escapes: true,
    methods: &[r"(?m)^[ \t]*[-+][ \t]*\([^)]*\)[ \t]*\w+[^;]*\{", TYPED_BRACED_METHOD],
    dependencies: &[C_INCLUDE, r"^\s*@import\s+([\w.]+)\s*;"],
    dependency_blocks: &[],
    path_imports: true,
    relative_imports: None,
    module: None,
    entity: Some(r"(?m)^[ \t]*@(?:interface|implementation|protocol)[ \t]+(?P<name>\w+)(?P<parents>[^\n;]*)$"),
    body_inheritance: None,
    parents_in_parens: false,
    span: SpanStyle::Closing(r"^\s*@end\b"),
    stopwords: &[
        "cgfloat", "float", "cgsize", "include", "struct", "const", "new", "self", "bool",
        "object", "return", "nonatomic", "atomic", "readonly", "readwrite", "case", "null",
        "long", "nsobject", "nullable", "nonnull", "void", "yes", "no", "id", "int", "strong",
        "assign",
    ],
};

const RUBY: Syntax = Syntax {
    line_comments: &["#"],
    block_comments: &[("=begin", "=end")],
    string_delimiters: &['"', '\''],
    backslash_escapes: true,
    methods: &[r"(?m)^[ \t]*def[ \t]+"],
    dependencies: &[r#"^\s*(?:require|require_relative|load)\s*\(?\s*['"]([^'"]+)['"]"#],
    dependency_blocks: &[],
    path_imports: true,
    relative_imports: None,
    module: None,
    entity: Some(r"(?m)^[ \t]*(?:class|module)[ \t]+(?P<name>[A-Z][\w:]*)(?P<parents>[^\n;]*)"),
    body_inheritance: None,
    parents_in_parens: false,
    span: SpanStyle::IndentedEnd,
    stopwords: &[
        "true", "false", "require", "module", "class", "unless", "begin", "break", "self", "nil",
        "void", "super", "int", "bytes", "array", "string",
    ],
};

const PYTHON: Syntax = Syntax {
    line_comments: &["#"],
    block_comments: &[("\"\"\"", "\"\"\""), ("'''", "'''")],
    string_delimiters: &['"', '\''],
    backslash_escapes: true,
    methods: &[r"(?m)^[ \t]*(?:async[ \t]+)?def[ \t]+\w+"],
    dependencies: &[
        r"^\s*import\s+([\w.]+(?:\s+as\s+\w+)?(?:\s*,\s*[\w.]+(?:\s+as\s+\w+)?)*)",
        r"^\s*from\s+(\w[\w.]*)\s+import\b",
    ],
    dependency_blocks: &[],
    path_imports: false,
    relative_imports: Some(
        r"^\s*from\s+(?P<dots>\.+)(?P<module>[\w.]*)\s*import\s*\(?\s*(?P<names>[\w\s,]*)",
    ),
    module: None,
    entity: Some(r"(?m)^[ \t]*class[ \t]+(?P<name>\w+)[ \t]*(?P<parents>\([^)]*\))?[ \t]*:"),
    body_inheritance: None,
    parents_in_parens: true,
    span: SpanStyle::Indentation,
    stopwords: &[
        "return", "self", "import", "enum", "true", "false", "none", "class", "cls", "super",
        "not",
    ],
};

const GO: Syntax = Syntax {
    line_comments: C_LINE,
    block_comments: C_BLOCK,
    string_delimiters: &['"', '`', '\''],
    backslash_escapes: true,
    methods: &[r"(?m)^func\b"],
    dependencies: &[r#"^\s*import\s+(?:[\w.]+\s+)?"([^"]+)""#],
    dependency_blocks: &[(r"^\s*import\s*\(\s*$", r#"^\s*(?:[\w.]+\s+)?"([^"]+)""#)],
    path_imports: false,
    relative_imports: None,
    module: Some(r"(?m)^\s*package\s+(\w+)"),
    entity: Some(r"(?m)^type[ \t]+(?P<name>\w+)[ \t]+(?:struct|interface)\b"),
    body_inheritance: None,
    parents_in_parens: false,
    span: SpanStyle::Braces,
    stopwords: &["return", "nil", "defer", "func", "default"],
};

const CSHARP: Syntax = Syntax {
    line_comments: C_LINE,
    block_comments: C_BLOCK,
    string_delimiters: &['"', '\''],
    backslash_escapes: true,
    methods: &[
        TYPED_BRACED_METHOD,
        r"(?m)^[ \t]*(?P<prefix>(?:[\w<>\[\],.?]+[ \t]+)+)(?P<name>\w+)[ \t]*\([^;{}]*\)[ \t]*=>",
    ],
    dependencies: &[r"^\s*(?:global\s+)?using\s+(?:static\s+)?([A-Za-z_][\w.]*)\s*;"],
    dependency_blocks: &[],
    path_imports: false,
    relative_imports: None,
    module: Some(r"(?m)^\s*namespace\s+([\w.]+)"),
    entity: Some(r"(?m)^[ \t]*(?:\[[^\]\n]*\][ \t]*)*(?:(?:public|private|protected|internal|static|sealed|abstract|partial|readonly|ref|unsafe|new|file)[ \t]+)*(?:class|struct|interface|enum|record)[ \t]+(?P<name>\w+)(?P<parents>[^{;]*)"),
    body_inheritance: None,
    parents_in_parens: false,
    span: SpanStyle::Braces,
    stopwords: &[
        "return", "true", "false", "null", "void", "class", "struct", "interface", "enum",
        "namespace", "using", "public", "private", "protected", "internal", "static", "readonly",
        "virtual", "override", "abstract", "new", "this", "base", "event", "delegate", "operator",
        "implicit", "explicit",
    ],
};

const VBNET: Syntax = Syntax {
    line_comments: &["'"],
    block_comments: &[],
    string_delimiters: &['"'],
    backslash_escapes: false,
    methods: &[r"(?mi)^[ \t]*(?:(?:Public|Private|Protected|Friend|Shared|Overrides|Overridable|MustOverride|NotOverridable|Overloads|Shadows|Async|Static|Partial|Iterator)[ \t]+)*(?:Sub|Function)[ \t]+\w+"],
    dependencies: &[r"(?i)^\s*Imports\s+([\w.]+)\s*$"],
    dependency_blocks: &[],
    path_imports: false,
    relative_imports: None,
    module: Some(r"(?mi)^\s*Namespace\s+([\w.]+)"),
    entity: Some(r"(?mi)^[ \t]*(?:(?:Public|Private|Protected|Friend|Partial|MustInherit|NotInheritable|Shared|Shadows)[ \t]+)*(?:Class|Structure|Interface|Enum|Module)[ \t]+(?P<name>\w+)"),
    body_inheritance: Some(r"(?i)^\s*(?:Inherits|Implements)\s+([\w.,\s]+)$"),
    parents_in_parens: false,
    span: SpanStyle::Closing(r"(?i)^\s*End\s+(?:Class|Structure|Interface|Enum|Module)\b"),
    stopwords: &[
        "class", "structure", "interface", "enum", "namespace", "imports", "public", "private",
        "protected", "friend", "static", "readonly", "overridable", "mustoverride", "shadows",
        "new", "me", "mybase", "event", "delegate", "operator", "end", "sub", "function", "dim",
        "as", "return", "nothing", "true", "false",
    ],
};

const RUST: Syntax = Syntax {
    line_comments: C_LINE,
    block_comments: C_BLOCK,
    string_delimiters: &['"'],
    backslash_escapes: true,
    methods: &[r#"(?m)^[ \t]*(?:pub(?:\([^)]*\))?[ \t]+)?(?:(?:const|async|unsafe|extern(?:[ \t]+"[^"]*")?)[ \t]+)*fn[ \t]+\w+"#],
    dependencies: &[
        r"^\s*(?:pub(?:\([^)]*\))?\s+)?use\s+([\w:]+?)(?:::\{[^;]*\}|::\*)?\s*(?:as\s+\w+\s*)?;",
        r"^\s*(?:pub(?:\([^)]*\))?\s+)?mod\s+(\w+)\s*;",
    ],
    dependency_blocks: &[],
    path_imports: false,
    relative_imports: None,
    module: None,
    entity: Some(r"(?m)^[ \t]*(?:pub(?:\([^)]*\))?[ \t]+)?(?:unsafe[ \t]+)?(?:struct|enum|trait|union)[ \t]+(?P<name>\w+)(?P<parents>[^{;(]*)"),
    body_inheritance: None,
    parents_in_parens: false,
    span: SpanStyle::Braces,
    stopwords: &[
        "fn", "let", "mut", "pub", "use", "impl", "self", "return", "true", "false", "match",
        "ref", "crate", "super", "struct", "enum", "trait", "where", "usize", "str",
    ],
};

const CSS_STOPWORDS: &[&str] = &[
    "px", "em", "rem", "vh", "vw", "none", "auto", "inherit", "initial", "important", "solid",
    "url", "rgb", "rgba", "color", "background", "margin", "padding", "border", "width",
    "height", "display", "flex", "block", "media", "import", "screen",
];

const CSS: Syntax = Syntax {
    line_comments: &[],
    block_comments: C_BLOCK,
    string_delimiters: &['"', '\''],
    backslash_escapes: true,
    methods: &[],
    dependencies: &[r#"@import\s+(?:url\(\s*)?['"]?([^'"()\s;]+)"#],
    dependency_blocks: &[],
    path_imports: true,
    relative_imports: None,
    module: None,
    entity: None,
    body_inheritance: None,
    parents_in_parens: false,
    span: SpanStyle::Braces,
    stopwords: CSS_STOPWORDS,
};

const SCSS: Syntax = Syntax {
    line_comments: C_LINE,
    block_comments: C_BLOCK,
    string_delimiters: &['"', '\''],
    backslash_escapes: true,
    methods: &[r"(?m)^[ \t]*@(?:mixin|function)[ \t]+[\w-]+"],
    dependencies: &[
        r#"@(?:import|use|forward)\s+((?:['"][^'"]+['"]\s*,?\s*)+)"#,
        r#"@import\s+url\(\s*['"]?([^'"()\s]+)"#,
    ],
    dependency_blocks: &[],
    path_imports: true,
    relative_imports: None,
    module: None,
    entity: Some(r"(?m)^[ \t]*@mixin[ \t]+(?P<name>[A-Za-z_][\w-]*)(?:[ \t]*\([^)]*\))?"),
    body_inheritance: Some(r"@extend\s+[%.]?([\w-]+)"),
    parents_in_parens: false,
    span: SpanStyle::Braces,
    stopwords: CSS_STOPWORDS,
};

const TWIG: Syntax = Syntax {
    line_comments: &[],
    block_comments: &[("{#", "#}")],
    string_delimiters: &[],
    backslash_escapes: true,
    methods: &[r"\{%-?\s*macro\s+\w+"],
    dependencies: &[
        r#"\{%-?\s*(?:include|extends|embed|import|from|use)\s+['"]([^'"]+)['"]"#,
        r#"\{\{-?\s*(?:include|source)\s*\(\s*['"]([^'"]+)['"]"#,
    ],
    dependency_blocks: &[],
    path_imports: true,
    relative_imports: None,
    module: None,
    entity: Some(r"\{%-?\s*block\s+(?P<name>\w+)"),
    body_inheritance: None,
    parents_in_parens: false,
    span: SpanStyle::Closing(r"\{%-?\s*endblock\b"),
    stopwords: &[
        "block", "endblock", "include", "extends", "embed", "endembed", "import", "from", "use",
        "macro", "endmacro", "if", "endif", "for", "endfor", "set", "endset", "with", "only",
        "true", "false", "null", "not", "and", "or", "in", "is", "trans", "endtrans",
    ],
};

impl Language {
    pub const ALL: [Language; 18] = [
        Language::Java,
        Language::Kotlin,
        Language::Swift,
        Language::C,
        Language::Cpp,
        Language::Groovy,
        Language::JavaScript,
        Language::TypeScript,
        Language::ObjC,
        Language::Ruby,
        Language::Python,
        Language::Go,
        Language::CSharp,
        Language::VbNet,
        Language::Rust,
        Language::Css,
        Language::Scss,
        Language::Twig,
    ];

    /// Tag used in configuration files and exports.
    pub fn tag(&self) -> &'static str {
        match self {
            Language::Java => "java",
            Language::Kotlin => "kotlin",
            Language::Swift => "swift",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Groovy => "groovy",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::ObjC => "objc",
            Language::Ruby => "ruby",
            Language::Python => "py",
            Language::Go => "go",
            Language::CSharp => "cs",
            Language::VbNet => "vbnet",
            Language::Rust => "rust",
            Language::Css => "css",
            Language::Scss => "scss",
            Language::Twig => "twig",
        }
    }

    /// Extensions (with leading `.`) this language owns. `.h` is shared and
    /// therefore listed for C, C++ and Objective-C.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Language::Java => &[".java"],
            Language::Kotlin => &[".kt", ".kts"],
            Language::Swift => &[".swift"],
            Language::C => &[".c", ".h"],
            Language::Cpp => &[".cpp", ".cc", ".cxx", ".hpp", ".hh", ".h"],
            Language::Groovy => &[".groovy"],
            Language::JavaScript => &[".js", ".jsx", ".mjs", ".cjs"],
            Language::TypeScript => &[".ts", ".tsx"],
            Language::ObjC => &[".m", ".mm", ".h"],
            Language::Ruby => &[".rb"],
            Language::Python => &[".py"],
            Language::Go => &[".go"],
            Language::CSharp => &[".cs"],
            Language::VbNet => &[".vb"],
            Language::Rust => &[".rs"],
            Language::Css => &[".css"],
            Language::Scss => &[".scss"],
            Language::Twig => &[".twig"],
        }
    }

    /// Infer the language for an extension among the permitted languages.
    ///
    /// `.h` goes to Objective-C if permitted, else C, else C++.
    pub fn for_extension(extension: &str, permitted: &BTreeSet<Language>) -> Option<Language> {
        if extension == ".h" {
            return [Language::ObjC, Language::C, Language::Cpp]
                .into_iter()
                .find(|lang| permitted.contains(lang));
        }
        Language::ALL
            .into_iter()
            .find(|lang| lang.extensions().contains(&extension))
            .filter(|lang| permitted.contains(lang))
    }

    pub fn syntax(&self) -> &'static Syntax {
        match self {
            Language::Java => &JAVA,
            Language::Kotlin => &KOTLIN,
            Language::Swift => &SWIFT,
            Language::C => &C,
            Language::Cpp => &CPP,
            Language::Groovy => &GROOVY,
            Language::JavaScript => &JAVASCRIPT,
            Language::TypeScript => &TYPESCRIPT,
            Language::ObjC => &OBJC,
            Language::Ruby => &RUBY,
            Language::Python => &PYTHON,
            Language::Go => &GO,
            Language::CSharp => &CSHARP,
            Language::VbNet => &VBNET,
            Language::Rust => &RUST,
            Language::Css => &CSS,
            Language::Scss => &SCSS,
            Language::Twig => &TWIG,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Language {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "java" => Ok(Language::Java),
            "kotlin" | "kt" => Ok(Language::Kotlin),
            "swift" => Ok(Language::Swift),
            "c" => Ok(Language::C),
            "cpp" | "c++" => Ok(Language::Cpp),
            "groovy" => Ok(Language::Groovy),
            "javascript" | "js" => Ok(Language::JavaScript),
            "typescript" | "ts" => Ok(Language::TypeScript),
            "objc" | "objective-c" => Ok(Language::ObjC),
            "ruby" | "rb" => Ok(Language::Ruby),
            "py" | "python" => Ok(Language::Python),
            "go" => Ok(Language::Go),
            "cs" | "csharp" | "c#" => Ok(Language::CSharp),
            "vbnet" | "vb" => Ok(Language::VbNet),
            "rust" | "rs" => Ok(Language::Rust),
            "css" => Ok(Language::Css),
            "scss" | "sass" => Ok(Language::Scss),
            "twig" => Ok(Language::Twig),
            _ => Err(ConfigError::UnknownLanguage(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_tags_parse_back() {
        for lang in Language::ALL {
            assert_eq!(lang.tag().parse::<Language>().unwrap(), lang);
        }
        assert_eq!("python".parse::<Language>().unwrap(), Language::Python);
        assert_eq!("C#".parse::<Language>().unwrap(), Language::CSharp);
        assert!("cobol".parse::<Language>().is_err());
    }

    #[test]
    fn test_header_extension_prefers_objc_then_c() {
        let all: BTreeSet<_> = Language::ALL.into_iter().collect();
        assert_eq!(Language::for_extension(".h", &all), Some(Language::ObjC));

        let c_and_cpp: BTreeSet<_> = [Language::C, Language::Cpp].into_iter().collect();
        assert_eq!(Language::for_extension(".h", &c_and_cpp), Some(Language::C));

        let cpp: BTreeSet<_> = [Language::Cpp].into_iter().collect();
        assert_eq!(Language::for_extension(".h", &cpp), Some(Language::Cpp));

        let java: BTreeSet<_> = [Language::Java].into_iter().collect();
        assert_eq!(Language::for_extension(".h", &java), None);
    }

    #[test]
    fn test_extension_requires_permitted_language() {
        let java: BTreeSet<_> = [Language::Java].into_iter().collect();
        assert_eq!(Language::for_extension(".java", &java), Some(Language::Java));
        assert_eq!(Language::for_extension(".cs", &java), None);
        assert_eq!(Language::for_extension(".txt", &java), None);
    }

    #[test]
    fn test_stylesheet_and_template_extensions() {
        let all: BTreeSet<_> = Language::ALL.into_iter().collect();
        assert_eq!(Language::for_extension(".css", &all), Some(Language::Css));
        assert_eq!(Language::for_extension(".scss", &all), Some(Language::Scss));
        assert_eq!(Language::for_extension(".twig", &all), Some(Language::Twig));
        assert_eq!("sass".parse::<Language>().unwrap(), Language::Scss);
        assert!(Language::Twig.syntax().path_imports);
    }

    #[test]
    fn test_every_syntax_regex_compiles() {
        for lang in Language::ALL {
            let syntax = lang.syntax();
            for pattern in syntax
                .methods
                .iter()
                .chain(syntax.dependencies.iter())
                .chain(syntax.module.iter())
                .chain(syntax.entity.iter())
                .chain(syntax.body_inheritance.iter())
                .chain(syntax.relative_imports.iter())
            {
                assert!(
                    regex::Regex::new(pattern).is_ok(),
                    "{lang}: pattern does not compile: {pattern}"
                );
            }
        }
    }
}
