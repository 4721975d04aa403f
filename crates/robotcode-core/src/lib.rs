//! RobotCode Core
//!
//! The semantic analysis engine for the Robot Framework language server:
//! namespace building, import resolution, keyword finding, variable
//! resolution, and the second-pass analyzer. This crate has no LSP or CLI
//! concerns of its own; `robotcode-lsp` and `robotcode-cli` host it.

pub mod cache;
pub mod cancellation;
pub mod config;
pub mod diagnostics;
pub mod discovery;
pub mod error;
pub mod parser;
pub mod result;
pub mod semantic;

pub use cache::{FingerprintCache, Sentinel, SentinelRegistry};
pub use cancellation::CancellationToken;
pub use config::RobotCodeConfig;
pub use diagnostics::{Diagnostic, Location, Position, Range, RelatedInformation, Severity};
pub use discovery::{DefaultFileDiscovery, FileChangeEvent, FileChangeKind, FileDiscovery, FileWatcher};
pub use error::{ErrorKind, RobotCodeError};
pub use parser::{LineParser, Node, NodeKind, RobotParser, Token, TokenType};
pub use result::Result;
pub use semantic::{
    Import, ImportKind, ImportsManager, KeywordDoc, KeywordFlags, LibDocKind, LibraryDoc,
    LibraryDocProvider, LibraryEntry, LibraryLoader, Namespace, RunKeywordKind, VariableDefinition,
    VariableKind, find_keyword, keyword_eq,
};

/// Initializes the tracing subscriber used by both hosting crates.
/// `RUST_LOG` overrides the default `robotcode=info` filter.
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("robotcode=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true),
        )
        .init();
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
