//! Keyword finder (§4.5): resolves a call-site name to a `KeywordDoc`
//! following Robot's exact search order, memoizing per namespace.

use crate::diagnostics::{Diagnostic, Range};
use crate::semantic::entities::{KeywordDoc, LibraryEntry};
use crate::semantic::matcher::keyword_eq;
use crate::semantic::namespace::Namespace;

const BDD_PREFIXES: &[&str] = &["given ", "when ", "then ", "and ", "but "];

/// Internal short-circuit used when a step finds an ambiguous match — the
/// spec's "cancel by raising an internal sentinel" (§4.5), expressed as an
/// early return carrying the diagnostic already produced rather than a
/// thrown exception.
enum Step {
    Found(KeywordDoc),
    Cancel,
    Continue,
}

/// `find_keyword(name) -> Option<KeywordDoc>` (§4.5). Diagnostics produced
/// while resolving are appended to `diagnostics` and also cached alongside
/// the result on the namespace (keyed by `name`, canonical equality makes
/// re-lookup of equivalent spellings share the cache entry).
pub async fn find_keyword(namespace: &Namespace, name: &str, range: Range, diagnostics: &mut Vec<Diagnostic>) -> Option<KeywordDoc> {
    let cache_key = crate::semantic::matcher::keyword_eq_key(name);
    if let Some((doc, cached_diags)) = namespace.cache_find_keyword(&cache_key).await {
        diagnostics.extend(cached_diags);
        return doc;
    }

    let mut local_diags = Vec::new();
    let result = find_keyword_uncached(namespace, name, range, &mut local_diags).await;
    namespace.store_find_keyword(cache_key, (result.clone(), local_diags.clone())).await;
    diagnostics.extend(local_diags);
    result
}

async fn find_keyword_uncached(
    namespace: &Namespace,
    name: &str,
    range: Range,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<KeywordDoc> {
    if name.trim().is_empty() {
        diagnostics.push(Diagnostic::error(range, "Keyword name cannot be empty."));
        return None;
    }

    // Step 2: self.
    for doc in namespace.get_keywords().await {
        if doc.source.as_deref() == Some(namespace.source()) && keyword_eq(&doc.name, name) {
            return Some(doc);
        }
    }

    // Step 3: explicit owner.kw, scanning every `.` split left-to-right.
    if name.contains('.') {
        match find_explicit(namespace, name, range, diagnostics).await {
            Step::Found(doc) => return Some(doc),
            Step::Cancel => return None,
            Step::Continue => {}
        }
    }

    // Step 4: implicit resource.
    match find_implicit(namespace, name, LibraryEntry::is_resource, range, diagnostics).await {
        Step::Found(doc) => return Some(doc),
        Step::Cancel => return None,
        Step::Continue => {}
    }

    // Step 5: implicit library, with stdlib-vs-custom tie-break.
    match find_implicit_library(namespace, name, range, diagnostics).await {
        Step::Found(doc) => return Some(doc),
        Step::Cancel => return None,
        Step::Continue => {}
    }

    // Step 6: BDD prefix.
    let lower = name.to_ascii_lowercase();
    for prefix in BDD_PREFIXES {
        if lower.starts_with(prefix) {
            let rest = &name[prefix.len()..];
            return Box::pin(find_keyword(namespace, rest, range, diagnostics)).await;
        }
    }

    diagnostics.push(Diagnostic::error(range, format!("No keyword with name '{name}' found.")));
    None
}

async fn find_explicit(namespace: &Namespace, name: &str, range: Range, diagnostics: &mut Vec<Diagnostic>) -> Step {
    let libraries = namespace.get_libraries().await;
    let resources = namespace.get_resources().await;
    let mut matches: Vec<(String, KeywordDoc)> = Vec::new();

    let dot_positions: Vec<usize> = name.char_indices().filter(|(_, c)| *c == '.').map(|(i, _)| i).collect();
    for &pos in &dot_positions {
        let owner = &name[..pos];
        let kw = &name[pos + 1..];
        if kw.is_empty() {
            continue;
        }
        for entry in libraries.values().chain(resources.values()) {
            if keyword_eq(entry.alias_or_name(), owner) {
                if let Some(doc) = entry.library_doc().find_keyword(kw) {
                    let label = format!("{}.{}", entry.alias_or_name(), doc.name);
                    if !matches.iter().any(|(l, _)| l == &label) {
                        matches.push((label, doc.clone()));
                    }
                }
            }
        }
    }

    match matches.len() {
        0 => Step::Continue,
        1 => Step::Found(matches.into_iter().next().unwrap().1),
        _ => {
            let mut labels: Vec<String> = matches.into_iter().map(|(l, _)| l).collect();
            labels.sort();
            diagnostics.push(Diagnostic::error(
                range,
                format!("Multiple keywords with name '{name}' found: {}", labels.join(", ")),
            ));
            Step::Cancel
        }
    }
}

async fn find_implicit(
    namespace: &Namespace,
    name: &str,
    want: fn(&LibraryEntry) -> bool,
    range: Range,
    diagnostics: &mut Vec<Diagnostic>,
) -> Step {
    let resources = namespace.get_resources().await;
    let mut hits: Vec<(&str, KeywordDoc)> = Vec::new();
    for entry in resources.values().filter(|e| want(e)) {
        if let Some(doc) = entry.library_doc().find_keyword(name) {
            hits.push((entry.alias_or_name(), doc.clone()));
        }
    }

    match hits.len() {
        0 => Step::Continue,
        1 => Step::Found(hits.into_iter().next().unwrap().1),
        _ => {
            let order = namespace.search_order();
            for owner in order {
                if let Some((_, doc)) = hits.iter().find(|(o, _)| keyword_eq(o, owner)) {
                    return Step::Found(doc.clone());
                }
            }
            let mut labels: Vec<String> = hits.iter().map(|(o, d)| format!("{o}.{}", d.name)).collect();
            labels.sort();
            diagnostics.push(Diagnostic::error(
                range,
                format!("Multiple keywords with name '{name}' found: {}", labels.join(", ")),
            ));
            Step::Cancel
        }
    }
}

async fn find_implicit_library(namespace: &Namespace, name: &str, range: Range, diagnostics: &mut Vec<Diagnostic>) -> Step {
    let libraries = namespace.get_libraries().await;
    let mut hits: Vec<(String, KeywordDoc, bool)> = Vec::new();
    for entry in libraries.values() {
        if let Some(doc) = entry.library_doc().find_keyword(name) {
            let is_std = is_standard_entry(entry);
            hits.push((entry.alias_or_name().to_string(), doc.clone(), is_std));
        }
    }

    match hits.len() {
        0 => Step::Continue,
        1 => Step::Found(hits.into_iter().next().unwrap().1),
        2 => {
            let (custom, stdlib): (Vec<_>, Vec<_>) = hits.iter().cloned().partition(|(_, _, is_std)| !is_std);
            if custom.len() == 1 && stdlib.len() == 1 {
                let (custom_owner, custom_doc, _) = &custom[0];
                let (stdlib_owner, _, _) = &stdlib[0];
                diagnostics.push(Diagnostic::warning(
                    range,
                    format!(
                        "Keyword '{name}' found both from a custom test library '{custom_owner}' and a standard library '{stdlib_owner}'. \
The custom keyword is used."
                    ),
                ));
                Step::Found(custom_doc.clone())
            } else if let Some(doc) = search_order_pick(namespace, &hits) {
                Step::Found(doc)
            } else {
                ambiguous(name, hits.into_iter().map(|(o, d, _)| (o, d)).collect(), range, diagnostics)
            }
        }
        _ => {
            if let Some(doc) = search_order_pick(namespace, &hits) {
                Step::Found(doc)
            } else {
                ambiguous(name, hits.into_iter().map(|(o, d, _)| (o, d)).collect(), range, diagnostics)
            }
        }
    }
}

/// Search-order tie-break shared with [`find_implicit`]: the first library
/// alias appearing in `namespace.search_order()` that has a hit wins,
/// silently.
fn search_order_pick(namespace: &Namespace, hits: &[(String, KeywordDoc, bool)]) -> Option<KeywordDoc> {
    let order = namespace.search_order();
    for owner in order {
        if let Some((_, doc, _)) = hits.iter().find(|(o, _, _)| keyword_eq(o, owner)) {
            return Some(doc.clone());
        }
    }
    None
}

fn ambiguous(name: &str, hits: Vec<(String, KeywordDoc)>, range: Range, diagnostics: &mut Vec<Diagnostic>) -> Step {
    let order_found = {
        let mut labels: Vec<String> = hits.iter().map(|(o, d)| format!("{o}.{}", d.name)).collect();
        labels.sort();
        labels
    };
    diagnostics.push(Diagnostic::error(
        range,
        format!("Multiple keywords with name '{name}' found: {}", order_found.join(", ")),
    ));
    Step::Cancel
}

fn is_standard_entry(entry: &LibraryEntry) -> bool {
    crate::semantic::library_doc::StdlibRegistry::new().is_standard(entry.alias_or_name())
        || crate::semantic::library_doc::StdlibRegistry::new().is_standard(match entry {
            LibraryEntry::Library { name, .. } => name,
            _ => "",
        })
}

impl LibraryEntry {
    fn is_resource(&self) -> bool {
        matches!(self, LibraryEntry::Resource { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SentinelRegistry;
    use crate::parser::{LineParser, RobotParser};
    use crate::semantic::imports_manager::ImportsManager;
    use crate::semantic::library_doc::LibraryDocProvider;
    use std::path::Path;
    use std::sync::Arc;

    async fn namespace_from(source_text: &str) -> Namespace {
        let path = Path::new("t.robot");
        let model = LineParser::new().parse(source_text, path).model;
        let provider = Arc::new(LibraryDocProvider::with_stdlib(Arc::new(LineParser::new())));
        let imports_manager = Arc::new(ImportsManager::new(provider, vec![]));
        Namespace::new(path, model, imports_manager, Arc::new(SentinelRegistry::default()), Vec::new())
    }

    #[tokio::test]
    async fn bdd_prefix_resolves_to_stripped_keyword() {
        let ns = namespace_from("*** Keywords ***\nLog In\n    No Operation\n").await;
        let mut diags = Vec::new();
        let doc = find_keyword(&ns, "Given log in", Range::zero(), &mut diags).await;
        assert!(doc.is_some());
        assert!(diags.is_empty());
    }

    #[tokio::test]
    async fn missing_keyword_reports_not_found() {
        let ns = namespace_from("*** Keywords ***\n").await;
        let mut diags = Vec::new();
        let doc = find_keyword(&ns, "Does Not Exist", Range::zero(), &mut diags).await;
        assert!(doc.is_none());
        assert!(diags[0].message.contains("No keyword with name"));
    }

    #[tokio::test]
    async fn stdlib_vs_custom_prefers_custom_with_warning() {
        use crate::semantic::library_doc::{StaticLibraryLoader, StdlibRegistry};

        let path = Path::new("t.robot");
        let source_text = "*** Settings ***\nLibrary    OperatingSystem\nLibrary    MyOs\n";
        let model = LineParser::new().parse(source_text, path).model;
        let loaders: Vec<Arc<dyn crate::semantic::library_doc::LibraryLoader>> = vec![
            Arc::new(StdlibRegistry::new()),
            Arc::new(StaticLibraryLoader::new().with_library("MyOs", vec!["Copy File".to_string()])),
        ];
        let provider = Arc::new(LibraryDocProvider::new(Arc::new(LineParser::new()), loaders));
        let imports_manager = Arc::new(ImportsManager::new(provider, vec![]));
        let ns = Namespace::new(path, model, imports_manager, Arc::new(SentinelRegistry::default()), Vec::new());

        let mut diags = Vec::new();
        let doc = find_keyword(&ns, "Copy File", Range::zero(), &mut diags).await;
        assert!(doc.is_some());
        assert_eq!(doc.unwrap().library_name, "MyOs");
        assert!(diags.iter().any(|d| d.message.contains("custom test library")));
    }

    #[tokio::test]
    async fn two_custom_libraries_tie_break_silently_by_search_order() {
        use crate::semantic::library_doc::StaticLibraryLoader;

        let path = Path::new("t.robot");
        let source_text = "*** Settings ***\nLibrary    LibA\nLibrary    LibB\n";
        let model = LineParser::new().parse(source_text, path).model;
        let loaders: Vec<Arc<dyn crate::semantic::library_doc::LibraryLoader>> = vec![Arc::new(
            StaticLibraryLoader::new()
                .with_library("LibA", vec!["Open".to_string()])
                .with_library("LibB", vec!["Open".to_string()]),
        )];
        let provider = Arc::new(LibraryDocProvider::new(Arc::new(LineParser::new()), loaders));
        let imports_manager = Arc::new(ImportsManager::new(provider, vec![]));
        let ns = Namespace::new(
            path,
            model,
            imports_manager,
            Arc::new(SentinelRegistry::default()),
            vec!["LibB".to_string()],
        );

        let mut diags = Vec::new();
        let doc = find_keyword(&ns, "Open", Range::zero(), &mut diags).await;
        assert_eq!(doc.unwrap().library_name, "LibB");
        assert!(diags.is_empty());
    }
}
