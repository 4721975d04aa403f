//! RobotCode Language Server
//!
//! Hosts the semantic engine (`robotcode-core`) behind the Language Server
//! Protocol: open-document tracking, diagnostics publishing, hover,
//! go-to-definition, and document symbols.

pub mod document_store;
pub mod server;

pub use document_store::DocumentStore;
pub use server::RobotCodeLanguageServer;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
