//! Diagnostic and position types shared across the semantic engine.
//!
//! Positions are 0-based, UTF-16 code-unit columns; ranges are half-open.
//! This mirrors the LSP wire format directly so the host (§1, out of scope
//! here) can forward these values without translation.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub const fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }

    pub const ZERO: Position = Position::new(0, 0);
}

/// Open Question (a): the original marks `Position.__ne__` with a
/// `type: ignore`, i.e. "not equal" must mean exactly "not equal", nothing
/// fancier. `#[derive(PartialEq)]` already gives us that mechanically, so
/// there is nothing else to special-case here — recorded in DESIGN.md.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    pub const fn zero() -> Self {
        Self::new(Position::ZERO, Position::ZERO)
    }

    pub fn contains(&self, position: Position) -> bool {
        position >= self.start && position < self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Severity {
    Error = 1,
    Warning = 2,
    Information = 3,
    Hint = 4,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub uri: PathBuf,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedInformation {
    pub location: Location,
    pub message: String,
}

/// Source tag used for findings produced by the namespace/finder/analyzer
/// themselves, as opposed to errors forwarded from a `LibraryDoc`'s own
/// `type_tag`.
pub const DIAGNOSTICS_SOURCE: &str = "robotcode.namespace";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub range: Range,
    pub message: String,
    pub severity: Severity,
    pub source: String,
    pub code: Option<String>,
    pub related_information: Vec<RelatedInformation>,
}

impl Diagnostic {
    pub fn new(range: Range, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            range,
            message: message.into(),
            severity,
            source: DIAGNOSTICS_SOURCE.to_string(),
            code: None,
            related_information: Vec::new(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_related(mut self, related: Vec<RelatedInformation>) -> Self {
        self.related_information = related;
        self
    }

    pub fn error(range: Range, message: impl Into<String>) -> Self {
        Self::new(range, message, Severity::Error)
    }

    pub fn warning(range: Range, message: impl Into<String>) -> Self {
        Self::new(range, message, Severity::Warning)
    }

    pub fn information(range: Range, message: impl Into<String>) -> Self {
        Self::new(range, message, Severity::Information)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_ordering_is_by_line_then_character() {
        assert!(Position::new(1, 0) > Position::new(0, 100));
        assert!(Position::new(1, 5) < Position::new(1, 10));
    }

    #[test]
    fn position_inequality_is_exact_negation_of_equality() {
        let a = Position::new(1, 2);
        let b = Position::new(1, 2);
        let c = Position::new(1, 3);
        assert_eq!(a == b, !(a != b));
        assert_eq!(a == c, !(a != c));
    }

    #[test]
    fn range_contains_is_half_open() {
        let range = Range::new(Position::new(0, 0), Position::new(0, 5));
        assert!(range.contains(Position::new(0, 0)));
        assert!(range.contains(Position::new(0, 4)));
        assert!(!range.contains(Position::new(0, 5)));
    }
}
