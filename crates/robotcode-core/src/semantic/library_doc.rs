//! LibraryDoc provider (§4.2): loads and caches the post-load model of a
//! library/resource/variables file, keyed by a pure function of
//! `(kind, resolved_absolute_source, args)`.
//!
//! Loading never fails the caller — a broken library/resource/variables
//! file still produces a `LibraryDoc`, just one whose `errors` field is
//! non-empty (§7 "Content" errors). This mirrors how the finder/analyzer
//! are built to keep going in the face of partial information rather than
//! aborting a whole namespace over one bad import.

use crate::cache::{FingerprintCache, Sentinel};
use crate::parser::{NodeKind, RobotParser, TokenType};
use crate::semantic::entities::{
    BUILTIN_LIBRARY_NAME, Import, KeywordDoc, LibDocError, LibraryDoc, RunKeywordKind,
    VariableDefinition, VariableKind,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Which shape of source a `get_libdoc` call is loading (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LibDocKind {
    Library,
    Resource,
    Variables,
    /// Exposes the current file as a library-like object, for self-keyword
    /// lookup (§4.2 "from model").
    FromModel,
}

/// The resolved cache key (§4.2: "pure function of `(kind,
/// resolved_absolute_source, args)`"). `args` is joined verbatim since
/// library/variables arguments affect the loaded doc (e.g. a parameterized
/// library).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LibDocKey {
    pub kind: LibDocKind,
    pub source: PathBuf,
    pub args: Vec<String>,
}

/// Loads the keywords a code-backed library exposes. Implementations live
/// outside this crate for real libraries (reflecting into an installed
/// Robot Framework library); `StdlibRegistry` below is the small built-in
/// set used so the ambiguity/stdlib-warning scenarios (§8 scenario 3) are
/// testable without a real Python install.
pub trait LibraryLoader: Send + Sync {
    /// Returns `None` when `name` isn't a library this loader knows about,
    /// so the imports manager can fall back to path lookup (§4.3).
    fn load(&self, name: &str, args: &[String]) -> Option<LibraryDoc>;

    /// Whether `name` names a Robot Framework standard library (§4.5 step 5
    /// "member of the stdlib set minus Remote").
    fn is_standard(&self, name: &str) -> bool;
}

/// The handful of standard libraries the finder's stdlib-vs-custom warning
/// (§8 scenario 3) needs to recognize. `Remote` is excluded per §4.5 step 5.
const STANDARD_LIBRARIES: &[&str] = &[
    "BuiltIn",
    "Collections",
    "DateTime",
    "Dialogs",
    "OperatingSystem",
    "Process",
    "Screenshot",
    "String",
    "Telnet",
    "XML",
];

/// A tiny in-memory stand-in for Robot Framework's real standard library
/// reflection. Keyword sets are small and only cover what's needed to
/// exercise ambiguity/override scenarios in tests; this is not a faithful
/// reproduction of any standard library's full keyword surface.
#[derive(Debug, Default)]
pub struct StdlibRegistry {
    keywords: std::collections::HashMap<&'static str, &'static [&'static str]>,
}

impl StdlibRegistry {
    pub fn new() -> Self {
        let mut keywords = std::collections::HashMap::new();
        keywords.insert(
            "BuiltIn",
            &[
                "Log",
                "Should Be Equal",
                "Set Variable",
                "No Operation",
                "Run Keyword",
                "Run Keyword If",
                "Run Keywords",
                "Run Keyword And Ignore Error",
                "Run Keyword And Expect Error",
                "Run Keyword Unless",
                "Run Keyword And Return Status",
            ][..],
        );
        keywords.insert("Collections", &["Append To List", "Get Length"][..]);
        keywords.insert("OperatingSystem", &["Copy File", "Remove File"][..]);
        keywords.insert("String", &["Split String", "Replace String"][..]);
        Self { keywords }
    }
}

impl LibraryLoader for StdlibRegistry {
    fn load(&self, name: &str, _args: &[String]) -> Option<LibraryDoc> {
        let names = self.keywords.get(name)?;
        let mut doc = LibraryDoc {
            name: name.to_string(),
            ..LibraryDoc::default()
        };
        for kw in *names {
            let mut kw_doc = KeywordDoc::new(*kw, name);
            if let Some(kind) = run_keyword_kind_for(kw) {
                kw_doc = kw_doc.with_run_keyword(kind);
            }
            doc.insert_keyword(kw_doc);
        }
        Some(doc)
    }

    fn is_standard(&self, name: &str) -> bool {
        STANDARD_LIBRARIES.contains(&name)
    }
}

/// A loader for user-defined, code-backed libraries known ahead of time —
/// used in tests to exercise the custom-vs-standard-library disambiguation
/// (§4.5 step 5, §8 scenario 3) without a real library-reflection
/// mechanism.
#[derive(Debug, Default)]
pub struct StaticLibraryLoader {
    keywords: std::collections::HashMap<String, Vec<String>>,
}

impl StaticLibraryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_library(mut self, name: impl Into<String>, keywords: Vec<String>) -> Self {
        self.keywords.insert(name.into(), keywords);
        self
    }
}

impl LibraryLoader for StaticLibraryLoader {
    fn load(&self, name: &str, _args: &[String]) -> Option<LibraryDoc> {
        let names = self.keywords.get(name)?;
        let mut doc = LibraryDoc {
            name: name.to_string(),
            ..LibraryDoc::default()
        };
        for kw in names {
            doc.insert_keyword(KeywordDoc::new(kw.clone(), name));
        }
        Some(doc)
    }

    fn is_standard(&self, _name: &str) -> bool {
        false
    }
}

/// The LibraryDoc provider (§4.2). Owns the process-wide cache and the
/// parser collaborator; library loading is delegated to a
/// [`LibraryLoader`] chain so real library reflection can be plugged in
/// without this type knowing about it.
pub struct LibraryDocProvider {
    cache: FingerprintCache<LibDocKey, LibraryDoc>,
    parser: Arc<dyn RobotParser>,
    loaders: Vec<Arc<dyn LibraryLoader>>,
}

impl LibraryDocProvider {
    pub fn new(parser: Arc<dyn RobotParser>, loaders: Vec<Arc<dyn LibraryLoader>>) -> Self {
        Self {
            cache: FingerprintCache::new(),
            parser,
            loaders,
        }
    }

    pub fn with_stdlib(parser: Arc<dyn RobotParser>) -> Self {
        Self::new(parser, vec![Arc::new(StdlibRegistry::new())])
    }

    pub fn is_standard_library(&self, name: &str) -> bool {
        self.loaders.iter().any(|l| l.is_standard(name))
    }

    /// `get_libdoc(kind, name, args, base_dir, sentinel)` (§4.2). `name` is
    /// the already-resolved absolute path for Resource/Variables/FromModel,
    /// or a library name/path for Library (resolution is the imports
    /// manager's job, §4.3 — this provider only loads and caches).
    pub fn get_libdoc(
        &self,
        kind: LibDocKind,
        source: &Path,
        args: &[String],
        sentinel: Sentinel,
    ) -> Arc<LibraryDoc> {
        let key = LibDocKey {
            kind,
            source: source.to_path_buf(),
            args: args.to_vec(),
        };
        let parser = Arc::clone(&self.parser);
        let loaders = self.loaders.clone();
        let source = source.to_path_buf();
        let args = args.to_vec();
        self.cache.get_or_fetch(key, sentinel, move || {
            load_libdoc(kind, &source, &args, &parser, &loaders)
        })
    }

    pub fn invalidate(&self, source: &Path) {
        self.cache
            .invalidate_matching(|key| key.source == source);
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<LibDocKey> {
        self.cache.subscribe()
    }
}

fn load_libdoc(
    kind: LibDocKind,
    source: &Path,
    args: &[String],
    parser: &Arc<dyn RobotParser>,
    loaders: &[Arc<dyn LibraryLoader>],
) -> LibraryDoc {
    match kind {
        LibDocKind::Library => load_library(source, args, loaders),
        LibDocKind::Resource | LibDocKind::Variables | LibDocKind::FromModel => {
            load_from_file(kind, source, parser)
        }
    }
}

fn load_library(source: &Path, args: &[String], loaders: &[Arc<dyn LibraryLoader>]) -> LibraryDoc {
    let name = source.to_string_lossy().to_string();
    for loader in loaders {
        if let Some(mut doc) = loader.load(&name, args) {
            doc.name = name;
            return doc;
        }
    }
    let mut doc = LibraryDoc {
        name: name.clone(),
        ..LibraryDoc::default()
    };
    doc.errors.push(
        LibDocError::new(
            format!("Importing library '{name}' failed: library not found."),
            "ImportError",
        )
        .at(source, 0),
    );
    doc
}

fn load_from_file(kind: LibDocKind, source: &Path, parser: &Arc<dyn RobotParser>) -> LibraryDoc {
    let mut doc = LibraryDoc {
        source: Some(source.to_path_buf()),
        name: source
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default(),
        ..LibraryDoc::default()
    };

    let text = match std::fs::read_to_string(source) {
        Ok(text) => text,
        Err(err) => {
            doc.errors.push(
                LibDocError::new(format!("reading '{}' failed: {err}", source.display()), "IoError")
                    .at(source, 0),
            );
            return doc;
        }
    };

    let result = parser.parse(&text, source);
    for err in &result.errors {
        doc.errors.push(
            LibDocError::new(err.message.clone(), "ParseError").at(source, err.range.start.line + 1),
        );
    }

    for top in &result.model.children {
        match &top.kind {
            NodeKind::SettingSection if matches!(kind, LibDocKind::Resource) => {
                for child in &top.children {
                    if let Some(import) = import_from_node(child) {
                        doc.imports.push(import);
                    }
                }
            }
            NodeKind::VariableSection => {
                for child in &top.children {
                    if let Some(name_tok) = child.token_of_type(TokenType::Variable) {
                        let value = child
                            .tokens_of_type(TokenType::Argument)
                            .next()
                            .map(|t| t.value.clone());
                        let mut def = VariableDefinition::new(
                            name_tok.value.clone(),
                            child.range,
                            source.to_path_buf(),
                            VariableKind::Imported,
                        );
                        if let Some(value) = value {
                            def = def.with_value(value);
                        }
                        doc.variables.push(def);
                    }
                }
            }
            NodeKind::KeywordSection if matches!(kind, LibDocKind::Resource | LibDocKind::FromModel) => {
                for keyword_node in &top.children {
                    if let NodeKind::Keyword { name } = &keyword_node.kind {
                        let mut kw_doc = KeywordDoc::new(name.clone(), doc.name.clone());
                        kw_doc.source = Some(source.to_path_buf());
                        kw_doc.range = keyword_node.range;
                        kw_doc.flags.run_keyword = run_keyword_kind_for(name);
                        for body_node in &keyword_node.children {
                            if matches!(body_node.kind, NodeKind::Arguments) {
                                kw_doc.args = body_node
                                    .tokens_of_type(TokenType::Argument)
                                    .map(|t| t.value.clone())
                                    .collect();
                            }
                        }
                        doc.insert_keyword(kw_doc);
                    }
                }
            }
            _ => {}
        }
    }

    doc
}

fn import_from_node(node: &crate::parser::Node) -> Option<Import> {
    match node.kind {
        NodeKind::LibraryImport => Some(Import::Library {
            name: node.token_of_type(TokenType::Name).map(|t| t.value.clone()),
            args: node.tokens_of_type(TokenType::Argument).map(|t| t.value.clone()).collect(),
            alias: node.token_of_type(TokenType::Alias).map(|t| t.value.clone()),
            range: node.range,
        }),
        NodeKind::ResourceImport => Some(Import::Resource {
            name: node.token_of_type(TokenType::Name).map(|t| t.value.clone()),
            range: node.range,
        }),
        NodeKind::VariablesImport => Some(Import::Variables {
            name: node.token_of_type(TokenType::Name).map(|t| t.value.clone()),
            args: node.tokens_of_type(TokenType::Argument).map(|t| t.value.clone()).collect(),
            range: node.range,
        }),
        _ => None,
    }
}

/// Recognizes the any-run-keyword family by canonical name (§4.6), so the
/// analyzer can find the flag on a resolved `KeywordDoc` without
/// re-deriving it from the call site.
pub fn run_keyword_kind_for(name: &str) -> Option<RunKeywordKind> {
    use crate::semantic::matcher::keyword_eq;
    if keyword_eq(name, "Run Keyword If") {
        Some(RunKeywordKind::RunKeywordIf)
    } else if keyword_eq(name, "Run Keywords") {
        Some(RunKeywordKind::RunKeywords)
    } else if keyword_eq(name, "Run Keyword And Ignore Error")
        || keyword_eq(name, "Run Keyword And Expect Error")
        || keyword_eq(name, "Run Keyword Unless")
        || keyword_eq(name, "Run Keyword And Return Status")
    {
        Some(RunKeywordKind::RunKeywordWithCondition)
    } else if keyword_eq(name, "Run Keyword") {
        Some(RunKeywordKind::RunKeyword)
    } else {
        None
    }
}

impl Default for LibraryDocProvider {
    fn default() -> Self {
        Self::with_stdlib(Arc::new(crate::parser::LineParser::new()))
    }
}

pub const BUILTIN_NAME: &str = BUILTIN_LIBRARY_NAME;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::entities::RunKeywordKind;
    use std::io::Write;

    fn sentinel() -> Sentinel {
        crate::cache::SentinelRegistry::default().next()
    }

    #[test]
    fn loading_missing_file_captures_error_instead_of_failing() {
        let provider = LibraryDocProvider::default();
        let doc = provider.get_libdoc(
            LibDocKind::Resource,
            Path::new("/nonexistent/does_not_exist.resource"),
            &[],
            sentinel(),
        );
        assert!(!doc.errors.is_empty());
        assert!(doc.is_empty() == false || doc.keywords.is_empty());
    }

    #[test]
    fn loading_resource_extracts_keywords_and_variables() {
        let mut file = tempfile::NamedTempFile::with_suffix(".resource").unwrap();
        writeln!(
            file,
            "*** Variables ***\n${{GREETING}}    Hello\n\n*** Keywords ***\nGreet\n    [Arguments]    ${{name}}\n    Log    ${{GREETING}} ${{name}}\n"
        )
        .unwrap();

        let provider = LibraryDocProvider::default();
        let doc = provider.get_libdoc(LibDocKind::Resource, file.path(), &[], sentinel());
        assert_eq!(doc.variables.len(), 1);
        assert!(doc.find_keyword("greet").is_some());
        assert_eq!(doc.find_keyword("greet").unwrap().args, vec!["${name}"]);
    }

    #[test]
    fn stdlib_registry_flags_standard_libraries() {
        let registry = StdlibRegistry::new();
        assert!(registry.is_standard("OperatingSystem"));
        assert!(!registry.is_standard("MyOs"));
        assert!(registry.load("OperatingSystem", &[]).is_some());
        assert!(registry.load("MyOs", &[]).is_none());
    }

    #[test]
    fn run_keyword_kind_recognizes_the_family() {
        assert_eq!(run_keyword_kind_for("Run Keyword"), Some(RunKeywordKind::RunKeyword));
        assert_eq!(
            run_keyword_kind_for("run keyword if"),
            Some(RunKeywordKind::RunKeywordIf)
        );
        assert_eq!(run_keyword_kind_for("Log"), None);
    }

    #[test]
    fn get_libdoc_caches_by_key() {
        let mut file = tempfile::NamedTempFile::with_suffix(".resource").unwrap();
        writeln!(file, "*** Keywords ***\nNoop\n    No Operation\n").unwrap();

        let provider = LibraryDocProvider::default();
        let s = sentinel();
        let a = provider.get_libdoc(LibDocKind::Resource, file.path(), &[], s);
        let b = provider.get_libdoc(LibDocKind::Resource, file.path(), &[], s);
        assert!(Arc::ptr_eq(&a, &b));
    }
}
