//! Namespace builder (§4.4): the resolved scope of one Robot file — its own
//! definitions plus everything visible through its imports.
//!
//! Locking order follows §5: init → libdoc → analyze. The libdoc lock
//! itself lives inside the shared [`LibraryDocProvider`]/[`FingerprintCache`],
//! so here we only need to serialize `ensure_initialized` and
//! `get_diagnostics` against each other, which `tokio::sync::Mutex` guards
//! covering each give us directly.

use crate::cache::{Sentinel, SentinelRegistry};
use crate::diagnostics::{Diagnostic, Location, RelatedInformation};
use crate::parser::{Node, NodeKind};
use crate::result::Result;
use crate::semantic::entities::{
    BUILTIN_LIBRARY_NAME, DEFAULT_LIBRARIES, Import, KeywordDoc, LibraryEntry, VariableDefinition,
};
use crate::semantic::imports_manager::ImportsManager;
use crate::semantic::matcher::keyword_eq;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

const MAX_IMPORT_DEPTH: usize = 64;

#[derive(Default)]
struct NamespaceState {
    initialized: bool,
    analyzed: bool,
    libraries: IndexMap<String, LibraryEntry>,
    resources: IndexMap<String, LibraryEntry>,
    variables_entries: IndexMap<String, LibraryEntry>,
    own_variables: Option<Vec<VariableDefinition>>,
    import_diagnostics: Vec<Diagnostic>,
    analyzer_diagnostics: Vec<Diagnostic>,
    libraries_seen: HashSet<(PathBuf, Vec<String>, Option<String>)>,
    resources_seen: HashSet<PathBuf>,
    variables_seen: HashSet<(PathBuf, Option<String>, Vec<String>)>,
    find_keyword_cache: std::collections::HashMap<String, (Option<KeywordDoc>, Vec<Diagnostic>)>,
}

/// The resolved scope of one Robot file (§3 `Namespace`, §4.4).
///
/// Per §9 "weak back-references", a real host keeps the namespace behind a
/// handle the owning document can drop; this crate doesn't define a
/// document store (that lives in `robotcode-lsp`), so `Namespace` here
/// just owns the `Node` it was built from — callers that need the weak
/// semantics re-fetch the document's current namespace rather than holding
/// this one across an edit.
pub struct Namespace {
    source: PathBuf,
    model: Node,
    imports_manager: Arc<ImportsManager>,
    sentinel_registry: Arc<SentinelRegistry>,
    sentinel: Sentinel,
    search_order: Vec<String>,
    command_line_variables: Vec<VariableDefinition>,
    state: Mutex<NamespaceState>,
}

impl Namespace {
    pub fn new(
        source: impl Into<PathBuf>,
        model: Node,
        imports_manager: Arc<ImportsManager>,
        sentinel_registry: Arc<SentinelRegistry>,
        search_order: Vec<String>,
    ) -> Self {
        Self::with_command_line_variables(source, model, imports_manager, sentinel_registry, search_order, Vec::new())
    }

    /// Like [`Namespace::new`], additionally seeding the tier-4 (§4.7)
    /// command-line variable definitions a host plumbed in from
    /// [`crate::config::RobotCodeConfig`].
    pub fn with_command_line_variables(
        source: impl Into<PathBuf>,
        model: Node,
        imports_manager: Arc<ImportsManager>,
        sentinel_registry: Arc<SentinelRegistry>,
        search_order: Vec<String>,
        command_line_variables: Vec<VariableDefinition>,
    ) -> Self {
        let sentinel = sentinel_registry.next();
        Self {
            source: source.into(),
            model,
            imports_manager,
            sentinel_registry,
            sentinel,
            search_order,
            command_line_variables,
            state: Mutex::new(NamespaceState::default()),
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    fn base_dir(&self) -> PathBuf {
        self.source.parent().map(Path::to_path_buf).unwrap_or_default()
    }

    fn own_imports(&self) -> Vec<Import> {
        collect_imports(&self.model)
    }

    /// §4.4 `ensure_initialized`: idempotent, guarded by a per-namespace
    /// lock.
    pub async fn ensure_initialized(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.initialized {
            return Ok(());
        }

        for name in DEFAULT_LIBRARIES {
            let sentinel = self.sentinel;
            let doc = self
                .imports_manager
                .provider()
                .get_libdoc(crate::semantic::library_doc::LibDocKind::Library, Path::new(name), &[], sentinel);
            state.libraries.insert(
                (*name).to_string(),
                LibraryEntry::Library {
                    name: (*name).to_string(),
                    import_name: (*name).to_string(),
                    library_doc: (*doc).clone(),
                    args: Vec::new(),
                    alias: None,
                    import_range: crate::diagnostics::Range::zero(),
                    import_source: self.source.clone(),
                },
            );
        }

        let imports = self.own_imports();
        let base_dir = self.base_dir();
        let mut visiting = HashSet::new();
        visiting.insert(self.source.clone());

        for import in &imports {
            self.resolve_import(import, &base_dir, true, &mut visiting, &mut state, 0);
        }

        state.initialized = true;
        Ok(())
    }

    fn resolve_import(
        &self,
        import: &Import,
        base_dir: &Path,
        top_level: bool,
        visiting: &mut HashSet<PathBuf>,
        state: &mut NamespaceState,
        depth: usize,
    ) {
        if depth >= MAX_IMPORT_DEPTH {
            return;
        }
        match import {
            Import::Library { name, args, alias, range } => {
                self.resolve_library_import(name.as_deref(), args, alias.as_deref(), *range, top_level, state)
            }
            Import::Resource { name, range } => {
                self.resolve_resource_import(name.as_deref(), *range, base_dir, top_level, visiting, state, depth)
            }
            Import::Variables { name, args, range } => {
                self.resolve_variables_import(name.as_deref(), args, *range, base_dir, top_level, state)
            }
        }
    }

    fn resolve_library_import(
        &self,
        name: Option<&str>,
        args: &[String],
        alias: Option<&str>,
        range: crate::diagnostics::Range,
        top_level: bool,
        state: &mut NamespaceState,
    ) {
        let Some(name) = name.filter(|n| !n.is_empty()) else {
            state.import_diagnostics.push(Diagnostic::error(range, "Library setting requires value.").with_code("NameSpaceError"));
            return;
        };

        if top_level && alias.is_none() && keyword_eq(name, BUILTIN_LIBRARY_NAME) {
            state.import_diagnostics.push(Diagnostic::information(
                range,
                format!("Library \"{name}\" is not imported, because it would override the \"{BUILTIN_LIBRARY_NAME}\" library."),
            ));
            return;
        }

        let dedup_key = (PathBuf::from(name), args.to_vec(), alias.map(str::to_string));
        if let Some(first_range) = self.duplicate_library_range(&dedup_key, state) {
            state.import_diagnostics.push(
                Diagnostic::information(range, format!("Library \"{name}\" already imported."))
                    .with_related(vec![RelatedInformation {
                        location: Location { uri: self.source.clone(), range: first_range },
                        message: "first imported here".to_string(),
                    }]),
            );
            return;
        }

        let base_dir = self.base_dir();
        let doc = match self
            .imports_manager
            .get_libdoc_for_library_import(name, args, &base_dir, self.sentinel)
        {
            Ok(doc) => doc,
            Err(err) => {
                state
                    .import_diagnostics
                    .push(Diagnostic::error(range, err.to_string()).with_code(err.type_tag()));
                return;
            }
        };

        self.push_content_errors(&doc, range, state);

        if doc.keywords.is_empty() && !doc.has_listener {
            state
                .import_diagnostics
                .push(Diagnostic::warning(range, format!("Imported library '{name}' contains no keywords.")));
        }

        state.libraries_seen.insert(dedup_key);
        let key = alias.unwrap_or(name).to_string();
        state.libraries.insert(
            key,
            LibraryEntry::Library {
                name: name.to_string(),
                import_name: name.to_string(),
                library_doc: (*doc).clone(),
                args: args.to_vec(),
                alias: alias.map(str::to_string),
                import_range: range,
                import_source: self.source.clone(),
            },
        );
    }

    fn duplicate_library_range(
        &self,
        key: &(PathBuf, Vec<String>, Option<String>),
        state: &NamespaceState,
    ) -> Option<crate::diagnostics::Range> {
        if state.libraries_seen.contains(key) {
            state
                .libraries
                .values()
                .find_map(|e| match e {
                    LibraryEntry::Library { name, args, alias, import_range, .. }
                        if (PathBuf::from(name.as_str()), args.clone(), alias.clone()) == *key =>
                    {
                        Some(*import_range)
                    }
                    _ => None,
                })
        } else {
            None
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn resolve_resource_import(
        &self,
        name: Option<&str>,
        range: crate::diagnostics::Range,
        base_dir: &Path,
        top_level: bool,
        visiting: &mut HashSet<PathBuf>,
        state: &mut NamespaceState,
        depth: usize,
    ) {
        let Some(name) = name.filter(|n| !n.is_empty()) else {
            state.import_diagnostics.push(Diagnostic::error(range, "Resource setting requires value.").with_code("NameSpaceError"));
            return;
        };

        let resolved = self.imports_manager.resolve_resource_path(name, base_dir);
        let Some(resolved) = resolved else {
            state
                .import_diagnostics
                .push(Diagnostic::error(range, format!("Resource file '{name}' does not exist.")).with_code("ImportError"));
            return;
        };

        if visiting.contains(&resolved) {
            if top_level {
                state.import_diagnostics.push(Diagnostic::information(range, "Recursive resource import."));
            }
            return;
        }

        if state.resources_seen.contains(&resolved) {
            let first_range = state.resources.values().find_map(|e| match e {
                LibraryEntry::Resource { import_source, import_range, .. } if import_source == &resolved => Some(*import_range),
                _ => None,
            });
            if top_level {
                let mut diag = Diagnostic::information(range, "Resource already imported.");
                if let Some(first_range) = first_range {
                    diag = diag.with_related(vec![RelatedInformation {
                        location: Location { uri: resolved.clone(), range: first_range },
                        message: "first imported here".to_string(),
                    }]);
                }
                state.import_diagnostics.push(diag);
            }
            return;
        }

        let doc = match self.imports_manager.get_libdoc_for_resource_import(name, base_dir, self.sentinel) {
            Ok(doc) => doc,
            Err(err) => {
                state.import_diagnostics.push(Diagnostic::error(range, err.to_string()).with_code(err.type_tag()));
                return;
            }
        };

        self.push_content_errors(&doc, range, state);

        if doc.is_empty() {
            state
                .import_diagnostics
                .push(Diagnostic::warning(range, format!("Imported resource file '{name}' is empty.")));
        }

        state.resources_seen.insert(resolved.clone());
        state.resources.insert(
            name.to_string(),
            LibraryEntry::Resource {
                name: name.to_string(),
                import_name: name.to_string(),
                library_doc: (*doc).clone(),
                import_range: range,
                import_source: resolved.clone(),
                imports: doc.imports.clone(),
                variables: doc.variables.clone(),
            },
        );

        visiting.insert(resolved.clone());
        let child_base = resolved.parent().map(Path::to_path_buf).unwrap_or_default();
        for child_import in &doc.imports {
            self.resolve_import(child_import, &child_base, false, visiting, state, depth + 1);
        }
        visiting.remove(&resolved);
    }

    fn resolve_variables_import(
        &self,
        name: Option<&str>,
        args: &[String],
        range: crate::diagnostics::Range,
        base_dir: &Path,
        _top_level: bool,
        state: &mut NamespaceState,
    ) {
        let Some(name) = name.filter(|n| !n.is_empty()) else {
            state.import_diagnostics.push(Diagnostic::error(range, "Variables setting requires value.").with_code("NameSpaceError"));
            return;
        };

        let resolved = match self.imports_manager.resolve_resource_path(name, base_dir) {
            Some(p) => p,
            None => {
                state
                    .import_diagnostics
                    .push(Diagnostic::error(range, format!("Variables file '{name}' does not exist.")).with_code("ImportError"));
                return;
            }
        };

        let dedup_key = (resolved.clone(), None, args.to_vec());
        if state.variables_seen.contains(&dedup_key) {
            state.import_diagnostics.push(Diagnostic::information(range, format!("Variables \"{name}\" already imported.")));
            return;
        }

        let doc = match self.imports_manager.get_libdoc_for_variables_import(name, args, base_dir, self.sentinel) {
            Ok(doc) => doc,
            Err(err) => {
                state.import_diagnostics.push(Diagnostic::error(range, err.to_string()).with_code(err.type_tag()));
                return;
            }
        };

        self.push_content_errors(&doc, range, state);

        state.variables_seen.insert(dedup_key);
        state.variables_entries.insert(
            name.to_string(),
            LibraryEntry::Variables {
                name: name.to_string(),
                import_name: name.to_string(),
                library_doc: (*doc).clone(),
                args: args.to_vec(),
                alias: None,
                import_range: range,
                import_source: resolved,
            },
        );
    }

    fn push_content_errors(&self, doc: &crate::semantic::entities::LibraryDoc, range: crate::diagnostics::Range, state: &mut NamespaceState) {
        let with_source: Vec<_> = doc.errors.iter().filter(|e| e.source.is_some()).collect();
        let sourceless: Vec<_> = doc.errors.iter().filter(|e| e.source.is_none()).collect();

        if !with_source.is_empty() {
            let related = with_source
                .iter()
                .map(|e| RelatedInformation {
                    location: Location {
                        uri: e.source.clone().unwrap_or_default(),
                        range: crate::diagnostics::Range::new(
                            crate::diagnostics::Position::new(e.line.unwrap_or(0).saturating_sub(1), 0),
                            crate::diagnostics::Position::new(e.line.unwrap_or(0).saturating_sub(1), 0),
                        ),
                    },
                    message: e.message.clone(),
                })
                .collect();
            state.import_diagnostics.push(
                Diagnostic::error(range, format!("{} error(s) while loading '{}'.", with_source.len(), doc.name)).with_related(related),
            );
        }

        for err in sourceless {
            state
                .import_diagnostics
                .push(Diagnostic::error(range, err.message.clone()).with_code(err.type_tag.clone()));
        }
    }

    pub async fn get_own_variables(&self) -> Vec<VariableDefinition> {
        let mut state = self.state.lock().await;
        if let Some(vars) = &state.own_variables {
            return vars.clone();
        }
        let mut vars = Vec::new();
        for top in &self.model.children {
            if top.kind == NodeKind::VariableSection {
                for child in &top.children {
                    if let Some(name_tok) = child.token_of_type(crate::parser::TokenType::Variable) {
                        let mut def = VariableDefinition::new(
                            name_tok.value.clone(),
                            child.range,
                            self.source.clone(),
                            crate::semantic::entities::VariableKind::Own,
                        );
                        if let Some(value_tok) = child.tokens_of_type(crate::parser::TokenType::Argument).next() {
                            def = def.with_value(value_tok.value.clone());
                        }
                        vars.push(def);
                    }
                }
            }
        }
        state.own_variables = Some(vars.clone());
        vars
    }

    /// Builds the six §4.7 tiers: locals, own file, resources, command-line,
    /// variables-files, built-ins. Shared by [`Namespace::get_variables`] and
    /// [`Namespace::find_variable`] so both honor the same merge order.
    async fn variable_tiers(
        &self,
        enclosing: &[&Node],
        position: crate::diagnostics::Position,
    ) -> (
        Vec<VariableDefinition>,
        Vec<VariableDefinition>,
        Vec<VariableDefinition>,
        Vec<VariableDefinition>,
        Vec<VariableDefinition>,
        Vec<VariableDefinition>,
    ) {
        self.ensure_initialized().await.ok();
        let locals = crate::semantic::variables::locals_before(enclosing, position, &self.source);
        let own = self.get_own_variables().await;
        let state = self.state.lock().await;
        let resources: Vec<VariableDefinition> = state
            .resources
            .values()
            .flat_map(|e| match e {
                LibraryEntry::Resource { variables, .. } => variables.clone(),
                _ => Vec::new(),
            })
            .collect();
        let variables_files: Vec<VariableDefinition> = state
            .variables_entries
            .values()
            .flat_map(|e| e.library_doc().variables.clone())
            .collect();
        drop(state);
        let builtins = crate::semantic::variables::builtin_variable_definitions(&self.source);

        (locals, own, resources, self.command_line_variables.clone(), variables_files, builtins)
    }

    /// §4.4 `get_variables`: merges per §3/§4.7, restricted to locals
    /// visible before `position`.
    pub async fn get_variables(
        &self,
        enclosing: &[&Node],
        position: crate::diagnostics::Position,
    ) -> Vec<VariableDefinition> {
        let (locals, own, resources, command_line, variables_files, builtins) =
            self.variable_tiers(enclosing, position).await;

        let mut all = locals;
        all.extend(own);
        all.extend(resources);
        all.extend(command_line);
        all.extend(variables_files);
        all.extend(builtins);
        all
    }

    /// §4.7 `find_variable`: the 6-tier resolver (locals, own file,
    /// resources, command-line, variables-files, built-ins), via
    /// [`crate::semantic::variables::resolve`] rather than a separate merge.
    pub async fn find_variable(
        &self,
        name: &str,
        enclosing: &[&Node],
        position: crate::diagnostics::Position,
    ) -> Option<VariableDefinition> {
        let (locals, own, resources, command_line, variables_files, builtins) =
            self.variable_tiers(enclosing, position).await;

        crate::semantic::variables::resolve(name, &locals, &own, &resources, &command_line, &variables_files, &builtins).cloned()
    }

    /// §4.4 `get_keywords`: flat merge of (own, resources in source order,
    /// libraries in source order), first match per canonical name wins.
    pub async fn get_keywords(&self) -> Vec<KeywordDoc> {
        self.ensure_initialized().await.ok();
        let state = self.state.lock().await;
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for doc in self.own_keyword_docs() {
            if seen.insert(crate::semantic::matcher::keyword_eq_key(&doc.name)) {
                out.push(doc);
            }
        }
        for entry in state.resources.values() {
            for doc in entry.library_doc().keywords.values() {
                if seen.insert(crate::semantic::matcher::keyword_eq_key(&doc.name)) {
                    out.push(doc.clone());
                }
            }
        }
        for entry in state.libraries.values() {
            for doc in entry.library_doc().keywords.values() {
                if seen.insert(crate::semantic::matcher::keyword_eq_key(&doc.name)) {
                    out.push(doc.clone());
                }
            }
        }
        out
    }

    fn own_keyword_docs(&self) -> Vec<KeywordDoc> {
        let mut out = Vec::new();
        for top in &self.model.children {
            if top.kind == NodeKind::KeywordSection {
                for keyword_node in &top.children {
                    if let NodeKind::Keyword { name } = &keyword_node.kind {
                        let mut doc = KeywordDoc::new(name.clone(), "");
                        doc.source = Some(self.source.clone());
                        doc.range = keyword_node.range;
                        for body in &keyword_node.children {
                            if body.kind == NodeKind::Arguments {
                                doc.args = body
                                    .tokens_of_type(crate::parser::TokenType::Argument)
                                    .map(|t| t.value.clone())
                                    .collect();
                            }
                        }
                        doc.flags.run_keyword = crate::semantic::library_doc::run_keyword_kind_for(name);
                        out.push(doc);
                    }
                }
            }
        }
        out
    }

    pub async fn get_libraries(&self) -> IndexMap<String, LibraryEntry> {
        self.ensure_initialized().await.ok();
        self.state.lock().await.libraries.clone()
    }

    pub async fn get_resources(&self) -> IndexMap<String, LibraryEntry> {
        self.ensure_initialized().await.ok();
        self.state.lock().await.resources.clone()
    }

    pub async fn get_variables_entries(&self) -> IndexMap<String, LibraryEntry> {
        self.ensure_initialized().await.ok();
        self.state.lock().await.variables_entries.clone()
    }

    pub fn search_order(&self) -> &[String] {
        &self.search_order
    }

    pub fn model(&self) -> &Node {
        &self.model
    }

    pub async fn cache_find_keyword(&self, key: &str) -> Option<(Option<KeywordDoc>, Vec<Diagnostic>)> {
        self.state.lock().await.find_keyword_cache.get(key).cloned()
    }

    pub async fn store_find_keyword(&self, key: String, value: (Option<KeywordDoc>, Vec<Diagnostic>)) {
        self.state.lock().await.find_keyword_cache.insert(key, value);
    }

    /// §4.4 `get_diagnostics`: ensures initialized, runs the analyzer,
    /// returns accumulated diagnostics (import diagnostics + analyzer
    /// diagnostics, §P5 append-only within a single pass).
    pub async fn get_diagnostics(&self, cancel: &crate::cancellation::CancellationToken) -> Result<Vec<Diagnostic>> {
        self.ensure_initialized().await?;
        {
            let state = self.state.lock().await;
            if state.analyzed {
                let mut all = state.import_diagnostics.clone();
                all.extend(state.analyzer_diagnostics.clone());
                return Ok(all);
            }
        }

        let diagnostics = crate::semantic::analyzer::analyze(self, cancel).await?;

        let mut state = self.state.lock().await;
        state.analyzer_diagnostics = diagnostics;
        state.analyzed = true;
        let mut all = state.import_diagnostics.clone();
        all.extend(state.analyzer_diagnostics.clone());
        Ok(all)
    }

    /// §4.4 `invalidate`: drops all caches atomically.
    pub async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        *state = NamespaceState::default();
    }
}

fn collect_imports(model: &Node) -> Vec<Import> {
    let mut out = Vec::new();
    for top in &model.children {
        if top.kind == NodeKind::SettingSection {
            for child in &top.children {
                match child.kind {
                    NodeKind::LibraryImport => out.push(Import::Library {
                        name: child.token_of_type(crate::parser::TokenType::Name).map(|t| t.value.clone()),
                        args: child.tokens_of_type(crate::parser::TokenType::Argument).map(|t| t.value.clone()).collect(),
                        alias: child.token_of_type(crate::parser::TokenType::Alias).map(|t| t.value.clone()),
                        range: child.range,
                    }),
                    NodeKind::ResourceImport => out.push(Import::Resource {
                        name: child.token_of_type(crate::parser::TokenType::Name).map(|t| t.value.clone()),
                        range: child.range,
                    }),
                    NodeKind::VariablesImport => out.push(Import::Variables {
                        name: child.token_of_type(crate::parser::TokenType::Name).map(|t| t.value.clone()),
                        args: child.tokens_of_type(crate::parser::TokenType::Argument).map(|t| t.value.clone()).collect(),
                        range: child.range,
                    }),
                    _ => {}
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{LineParser, RobotParser};
    use crate::semantic::library_doc::LibraryDocProvider;
    use std::io::Write;

    fn build_namespace(source_text: &str, path: &Path, search_path: Vec<PathBuf>) -> Namespace {
        let model = LineParser::new().parse(source_text, path).model;
        let provider = Arc::new(LibraryDocProvider::with_stdlib(Arc::new(LineParser::new())));
        let imports_manager = Arc::new(ImportsManager::new(provider, search_path));
        Namespace::new(path, model, imports_manager, Arc::new(SentinelRegistry::default()), Vec::new())
    }

    #[tokio::test]
    async fn builtin_library_is_present_by_default() {
        let ns = build_namespace("*** Settings ***\n", Path::new("t.robot"), vec![]);
        ns.ensure_initialized().await.unwrap();
        let libs = ns.get_libraries().await;
        assert!(libs.contains_key(BUILTIN_LIBRARY_NAME));
    }

    #[tokio::test]
    async fn explicit_builtin_import_is_skipped_with_diagnostic() {
        let ns = build_namespace("*** Settings ***\nLibrary    BuiltIn\n", Path::new("t.robot"), vec![]);
        ns.ensure_initialized().await.unwrap();
        let state = ns.state.lock().await;
        assert_eq!(state.libraries.len(), 1);
        assert!(state.import_diagnostics.iter().any(|d| d.message.contains("would override")));
    }

    #[tokio::test]
    async fn missing_resource_produces_error_diagnostic() {
        let ns = build_namespace("*** Settings ***\nResource    missing.resource\n", Path::new("t.robot"), vec![]);
        ns.ensure_initialized().await.unwrap();
        let state = ns.state.lock().await;
        assert!(state.import_diagnostics.iter().any(|d| d.message.contains("does not exist")));
    }

    #[tokio::test]
    async fn self_importing_resource_is_recursive_not_infinite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.resource");
        std::fs::write(&path, "*** Settings ***\nResource    a.resource\n").unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let model = LineParser::new().parse(&text, &path).model;
        let provider = Arc::new(LibraryDocProvider::with_stdlib(Arc::new(LineParser::new())));
        let imports_manager = Arc::new(ImportsManager::new(provider, vec![]));
        let ns = Namespace::new(&path, model, imports_manager, Arc::new(SentinelRegistry::default()), Vec::new());

        ns.ensure_initialized().await.unwrap();
        let state = ns.state.lock().await;
        assert!(state.import_diagnostics.iter().any(|d| d.message.contains("Recursive resource import")));
    }

    #[tokio::test]
    async fn empty_resource_gets_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.resource");
        std::fs::write(&path, "\n").unwrap();

        let ns = build_namespace(
            "*** Settings ***\nResource    empty.resource\n",
            &dir.path().join("t.robot"),
            vec![],
        );
        ns.ensure_initialized().await.unwrap();
        let state = ns.state.lock().await;
        assert!(state.import_diagnostics.iter().any(|d| d.message.contains("is empty")));
    }

    #[tokio::test]
    async fn get_keywords_merges_own_resources_and_libraries_first_match_wins() {
        let dir = tempfile::tempdir().unwrap();
        let resource_path = dir.path().join("common.resource");
        let mut f = std::fs::File::create(&resource_path).unwrap();
        writeln!(f, "*** Keywords ***\nShared\n    No Operation\n").unwrap();

        let ns = build_namespace(
            "*** Settings ***\nResource    common.resource\n\n*** Keywords ***\nOwn Keyword\n    No Operation\n",
            &dir.path().join("t.robot"),
            vec![],
        );
        let keywords = ns.get_keywords().await;
        assert!(keywords.iter().any(|k| keyword_eq(&k.name, "Own Keyword")));
        assert!(keywords.iter().any(|k| keyword_eq(&k.name, "Shared")));
    }

    #[tokio::test]
    async fn find_variable_resolves_command_line_tier() {
        let path = Path::new("t.robot");
        let model = LineParser::new().parse("*** Test Cases ***\n", path).model;
        let provider = Arc::new(LibraryDocProvider::with_stdlib(Arc::new(LineParser::new())));
        let imports_manager = Arc::new(ImportsManager::new(provider, vec![]));
        let command_line = vec![
            VariableDefinition::new(
                "${ENV}",
                crate::diagnostics::Range::zero(),
                path,
                crate::semantic::entities::VariableKind::CommandLine,
            )
            .with_value("staging"),
        ];
        let ns = Namespace::with_command_line_variables(
            path,
            model,
            imports_manager,
            Arc::new(SentinelRegistry::default()),
            Vec::new(),
            command_line,
        );

        let def = ns.find_variable("${ENV}", &[], crate::diagnostics::Position::ZERO).await;
        assert_eq!(def.unwrap().value.as_deref(), Some("staging"));
    }
}
