//! Entity model (§3): the value types flowing between the namespace
//! builder, imports manager, finder and analyzer. Pure data — no behavior
//! beyond structural equality and small constructors.

use crate::diagnostics::Range;
use std::path::{Path, PathBuf};

/// A single `Library` / `Resource` / `Variables` setting, as collected from
/// a file's setting section. Equality (used for dedup/cache-keying, §4.4.1)
/// is structural over `(variant, name, args, alias)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Import {
    Library {
        name: Option<String>,
        args: Vec<String>,
        alias: Option<String>,
        range: Range,
    },
    Resource {
        name: Option<String>,
        range: Range,
    },
    Variables {
        name: Option<String>,
        args: Vec<String>,
        range: Range,
    },
}

impl Import {
    pub fn range(&self) -> Range {
        match self {
            Import::Library { range, .. } => *range,
            Import::Resource { range, .. } => *range,
            Import::Variables { range, .. } => *range,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Import::Library { name, .. } => name.as_deref(),
            Import::Resource { name, .. } => name.as_deref(),
            Import::Variables { name, .. } => name.as_deref(),
        }
    }
}

/// How a variable definition was obtained (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Local,
    Argument,
    Own,
    Imported,
    CommandLine,
    BuiltIn,
    Environment,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableDefinition {
    pub name: String,
    pub range: Range,
    pub source: PathBuf,
    pub kind: VariableKind,
    pub resolvable: bool,
    pub value: Option<String>,
}

impl VariableDefinition {
    pub fn new(name: impl Into<String>, range: Range, source: impl Into<PathBuf>, kind: VariableKind) -> Self {
        let resolvable = matches!(
            kind,
            VariableKind::BuiltIn | VariableKind::CommandLine | VariableKind::Environment
        );
        Self {
            name: name.into(),
            range,
            source: source.into(),
            kind,
            resolvable,
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self.resolvable = true;
        self
    }

    pub fn not_found(name: impl Into<String>, range: Range, source: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            range,
            source: source.into(),
            kind: VariableKind::NotFound,
            resolvable: false,
            value: None,
        }
    }
}

/// Which `Run Keyword`-family flavor a [`KeywordDoc`] is, if any (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKeywordKind {
    /// `Run Keyword` — first arg is the sub-keyword name, rest are its args.
    RunKeyword,
    /// `Run Keyword If`/`Run Keyword Unless` — arg[0] is the condition,
    /// arg[1].. is the sub-keyword invocation, with `ELSE IF`/`ELSE`
    /// branches following.
    RunKeywordIf,
    /// `Run Keyword And Ignore Error`-style wrappers where arg[0] is the
    /// condition and arg[1] is the (possibly escaped) sub-keyword name.
    RunKeywordWithCondition,
    /// `Run Keywords` — `AND`-separated list of keyword invocations, or
    /// bare keyword names with no arguments before the first `AND`.
    RunKeywords,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeywordFlags {
    pub is_error_handler: bool,
    pub run_keyword: Option<RunKeywordKind>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordDoc {
    pub name: String,
    pub args: Vec<String>,
    pub source: Option<PathBuf>,
    pub range: Range,
    pub library_name: String,
    pub flags: KeywordFlags,
}

impl KeywordDoc {
    pub fn new(name: impl Into<String>, library_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            source: None,
            range: Range::zero(),
            library_name: library_name.into(),
            flags: KeywordFlags::default(),
        }
    }

    pub fn with_run_keyword(mut self, kind: RunKeywordKind) -> Self {
        self.flags.run_keyword = Some(kind);
        self
    }
}

/// A single error captured while loading a library/resource/variables file
/// (§4.2, §7 "Content" errors).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibDocError {
    pub message: String,
    pub source: Option<PathBuf>,
    pub line: Option<u32>,
    pub type_tag: String,
}

impl LibDocError {
    pub fn new(message: impl Into<String>, type_tag: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
            line: None,
            type_tag: type_tag.into(),
        }
    }

    pub fn at(mut self, source: impl Into<PathBuf>, line: u32) -> Self {
        self.source = Some(source.into());
        self.line = Some(line);
        self
    }
}

/// The post-load model of a library/resource/variables file (§3, §4.2).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LibraryDoc {
    pub source: Option<PathBuf>,
    pub name: String,
    /// Keyed by canonical (normalized) keyword name so finder lookups are
    /// O(1); insertion order is preserved for deterministic iteration.
    pub keywords: indexmap::IndexMap<String, KeywordDoc>,
    pub variables: Vec<VariableDefinition>,
    pub has_listener: bool,
    pub errors: Vec<LibDocError>,
    /// Own imports, populated only for the `Resource` variant so the
    /// importer can recurse (§4.4.1).
    pub imports: Vec<Import>,
}

impl LibraryDoc {
    pub fn is_empty(&self) -> bool {
        self.imports.is_empty()
            && self.variables.is_empty()
            && self.keywords.is_empty()
            && self.errors.is_empty()
    }

    pub fn insert_keyword(&mut self, doc: KeywordDoc) {
        let key = super::matcher::keyword_eq_key(&doc.name);
        self.keywords.entry(key).or_insert(doc);
    }

    pub fn find_keyword(&self, name: &str) -> Option<&KeywordDoc> {
        self.keywords.get(&super::matcher::keyword_eq_key(name))
    }
}

/// The three shapes a resolved import can take inside a [`Namespace`]
/// (§3 `LibraryEntry`). Carries provenance (`import_range`/`import_source`)
/// needed to render "already imported" related-information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryEntry {
    Library {
        name: String,
        import_name: String,
        library_doc: LibraryDoc,
        args: Vec<String>,
        alias: Option<String>,
        import_range: Range,
        import_source: PathBuf,
    },
    Resource {
        name: String,
        import_name: String,
        library_doc: LibraryDoc,
        import_range: Range,
        import_source: PathBuf,
        imports: Vec<Import>,
        variables: Vec<VariableDefinition>,
    },
    Variables {
        name: String,
        import_name: String,
        library_doc: LibraryDoc,
        args: Vec<String>,
        alias: Option<String>,
        import_range: Range,
        import_source: PathBuf,
    },
}

impl LibraryEntry {
    pub fn alias_or_name(&self) -> &str {
        match self {
            LibraryEntry::Library { alias, name, .. } | LibraryEntry::Variables { alias, name, .. } => {
                alias.as_deref().unwrap_or(name)
            }
            LibraryEntry::Resource { name, .. } => name,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            LibraryEntry::Library {
                alias,
                name,
                import_name,
                ..
            }
            | LibraryEntry::Variables {
                alias,
                name,
                import_name,
                ..
            } => alias.as_deref().unwrap_or_else(|| {
                if name.is_empty() {
                    import_name
                } else {
                    name
                }
            }),
            LibraryEntry::Resource {
                name, import_name, ..
            } => {
                if name.is_empty() {
                    import_name
                } else {
                    name
                }
            }
        }
    }

    pub fn library_doc(&self) -> &LibraryDoc {
        match self {
            LibraryEntry::Library { library_doc, .. }
            | LibraryEntry::Resource { library_doc, .. }
            | LibraryEntry::Variables { library_doc, .. } => library_doc,
        }
    }

    pub fn import_range(&self) -> Range {
        match self {
            LibraryEntry::Library { import_range, .. }
            | LibraryEntry::Resource { import_range, .. }
            | LibraryEntry::Variables { import_range, .. } => *import_range,
        }
    }

    pub fn import_source(&self) -> &Path {
        match self {
            LibraryEntry::Library { import_source, .. }
            | LibraryEntry::Resource { import_source, .. }
            | LibraryEntry::Variables { import_source, .. } => import_source,
        }
    }

    pub fn source(&self) -> Option<&Path> {
        self.library_doc().source.as_deref()
    }

    pub fn args(&self) -> &[String] {
        match self {
            LibraryEntry::Library { args, .. } | LibraryEntry::Variables { args, .. } => args,
            LibraryEntry::Resource { .. } => &[],
        }
    }

    pub fn alias(&self) -> Option<&str> {
        match self {
            LibraryEntry::Library { alias, .. } | LibraryEntry::Variables { alias, .. } => alias.as_deref(),
            LibraryEntry::Resource { .. } => None,
        }
    }
}

pub const BUILTIN_LIBRARY_NAME: &str = "BuiltIn";

/// Default libraries implicitly imported into every namespace (§4.4 step 3,
/// SPEC_FULL §10.7). Robot's own `Reserved` internal library carries no
/// user-visible keywords and has no static-analysis relevance, so it is not
/// reproduced here.
pub const DEFAULT_LIBRARIES: &[&str] = &[BUILTIN_LIBRARY_NAME];

/// The well-known Robot Framework built-in variables (SPEC_FULL §10.7,
/// Open Question resolution — the distillation left this list
/// unenumerated).
pub const BUILTIN_VARIABLES: &[&str] = &[
    "${TEMPDIR}",
    "${EXECDIR}",
    "${/}",
    "${:}",
    "${\\n}",
    "${SPACE}",
    "${True}",
    "${False}",
    "${None}",
    "${null}",
    "${OUTPUT_DIR}",
    "${OUTPUT_FILE}",
    "${LOG_FILE}",
    "${REPORT_FILE}",
    "${SUITE_NAME}",
    "${SUITE_SOURCE}",
    "${TEST_NAME}",
];
