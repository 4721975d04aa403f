//! The semantic analysis engine (§4): matcher primitives, the entity
//! model, the LibraryDoc provider, the imports manager, the namespace
//! builder, the keyword finder, the variable resolver, and the analyzer.

pub mod analyzer;
pub mod entities;
pub mod finder;
pub mod imports_manager;
pub mod library_doc;
pub mod matcher;
pub mod namespace;
pub mod variables;

pub use entities::{
    Import, KeywordDoc, KeywordFlags, LibDocError, LibraryDoc, LibraryEntry, RunKeywordKind, VariableDefinition,
    VariableKind,
};
pub use finder::find_keyword;
pub use imports_manager::{ImportKind, ImportsManager};
pub use library_doc::{LibDocKind, LibraryDocProvider, LibraryLoader};
pub use matcher::{InvalidNameError, KeywordMatcher, VariableMatcher, keyword_eq};
pub use namespace::Namespace;
