//! Matcher primitives (§4.1).
//!
//! Two independent equality relations, both total/reflexive/symmetric/
//! transitive over well-formed input: Robot's keyword-name `eq` (ignore
//! case, spaces, underscores) and variable-name equality (strip sigil and
//! braces, drop a trailing `:type` hint, then apply the same normalization).
//! Malformed input (no extractable base name) is rejected at construction
//! time with [`InvalidNameError`] rather than silently comparing unequal —
//! callers at the namespace boundary trap it (§4.1).

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidNameError(pub String);

impl fmt::Display for InvalidNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid name: '{}'", self.0)
    }
}

impl std::error::Error for InvalidNameError {}

/// Robot's keyword-name normalization: lowercase, strip ASCII whitespace and
/// underscores entirely (not collapsed — removed).
fn normalize_keyword(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Hashable wrapper implementing Robot's keyword `eq`: case-insensitive,
/// ignoring spaces and underscores.
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    original: String,
    normalized: String,
}

impl KeywordMatcher {
    pub fn new(name: impl Into<String>) -> Self {
        let original = name.into();
        let normalized = normalize_keyword(&original);
        Self { original, normalized }
    }

    pub fn as_str(&self) -> &str {
        &self.original
    }

    pub fn matches(&self, other: &str) -> bool {
        self.normalized == normalize_keyword(other)
    }
}

impl PartialEq for KeywordMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.normalized == other.normalized
    }
}

impl Eq for KeywordMatcher {}

impl std::hash::Hash for KeywordMatcher {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.normalized.hash(state);
    }
}

impl fmt::Display for KeywordMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original)
    }
}

/// Case-insensitive, space/underscore-ignoring `eq`, exposed standalone for
/// call sites that don't need to retain a `KeywordMatcher` (e.g. owner-name
/// comparisons in the finder, §4.5).
pub fn keyword_eq(a: &str, b: &str) -> bool {
    normalize_keyword(a) == normalize_keyword(b)
}

/// Canonical map key for a keyword name, used to key `LibraryDoc::keywords`
/// so lookups are O(1) under `keyword_eq`.
pub fn keyword_eq_key(name: &str) -> String {
    normalize_keyword(name)
}

/// Variable-name normalization: lowercase, collapse runs of whitespace and
/// underscores into a single `_`.
fn normalize_variable_base(base: &str) -> String {
    let mut out = String::with_capacity(base.len());
    let mut last_was_sep = false;
    for c in base.chars() {
        if c.is_whitespace() || c == '_' {
            if !last_was_sep && !out.is_empty() {
                out.push('_');
            }
            last_was_sep = true;
        } else {
            out.extend(c.to_lowercase());
            last_was_sep = false;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

/// Extracts the base name from a variable reference: strips the sigil
/// (`$`/`@`/`&`/`%`) and surrounding braces, then drops a trailing
/// `:type-hint`. Returns `None` when `name` has no extractable base (e.g.
/// empty, or missing braces), which callers convert to
/// [`InvalidNameError`].
pub fn variable_base(name: &str) -> Option<&str> {
    let name = name.trim();
    let rest = name.strip_prefix(['$', '@', '&', '%'])?;
    let inner = rest.strip_prefix('{')?.strip_suffix('}')?;
    if inner.is_empty() {
        return None;
    }
    let base = inner.split_once(':').map(|(b, _)| b).unwrap_or(inner);
    if base.is_empty() { None } else { Some(base) }
}

/// Hashable canonical key for a variable name (§3).
#[derive(Debug, Clone)]
pub struct VariableMatcher {
    name: String,
    normalized: String,
}

impl VariableMatcher {
    pub fn new(name: impl Into<String>) -> Result<Self, InvalidNameError> {
        let name = name.into();
        let base = variable_base(&name).ok_or_else(|| InvalidNameError(name.clone()))?;
        let normalized = normalize_variable_base(base);
        Ok(Self { name, normalized })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for VariableMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.normalized == other.normalized
    }
}

impl Eq for VariableMatcher {}

impl std::hash::Hash for VariableMatcher {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.normalized.hash(state);
    }
}

impl fmt::Display for VariableMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_eq_ignores_case_space_and_underscore() {
        assert!(keyword_eq("Log In", "log_in"));
        assert!(keyword_eq("LogIn", "  L o g  I n "));
        assert!(!keyword_eq("Log In", "Log Out"));
    }

    #[test]
    fn keyword_matcher_is_an_equivalence_relation() {
        let a = KeywordMatcher::new("Copy File");
        let b = KeywordMatcher::new("copy_file");
        let c = KeywordMatcher::new("copy_file");
        assert_eq!(a, b); // symmetric / matches
        assert_eq!(b, c);
        assert_eq!(a, c); // transitive
        assert_eq!(a, a); // reflexive
    }

    #[test]
    fn variable_base_strips_sigil_braces_and_type_hint() {
        assert_eq!(variable_base("${name}"), Some("name"));
        assert_eq!(variable_base("@{list}"), Some("list"));
        assert_eq!(variable_base("&{dict: dict}"), Some("dict"));
        assert_eq!(variable_base("${count:int}"), Some("count"));
        assert_eq!(variable_base("not a variable"), None);
        assert_eq!(variable_base("${}"), None);
    }

    #[test]
    fn variable_matcher_equality_ignores_case_and_collapses_separators() {
        let a = VariableMatcher::new("${My Var}").unwrap();
        let b = VariableMatcher::new("${my_var}").unwrap();
        assert_eq!(a, b);

        let c = VariableMatcher::new("${my  var}").unwrap();
        assert_eq!(a, c);
    }

    #[test]
    fn variable_matcher_rejects_malformed_names() {
        assert!(VariableMatcher::new("no-sigil").is_err());
        assert!(VariableMatcher::new("${}").is_err());
    }
}
