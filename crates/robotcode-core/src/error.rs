//! Error types for the Robot Framework semantic analysis engine.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for core operations.
///
/// Per the error-handling design, most failures that happen *inside* a
/// namespace (malformed import, unresolved keyword, missing variable) never
/// reach this type — they are captured as [`crate::diagnostics::Diagnostic`]s
/// instead. `RobotCodeError` is reserved for failures that cannot be
/// attributed to a single source range: configuration problems, I/O
/// failures talking to the workspace, and cancellation.
#[derive(Debug, Error)]
pub enum RobotCodeError {
    #[error("parse error: {message}")]
    Parse { message: String },

    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("namespace error: {message}")]
    Namespace { message: String },

    #[error("import error: {message}")]
    Import { message: String },

    #[error("cache error: {message}")]
    Cache { message: String },

    #[error("lsp protocol error: {message}")]
    Lsp { message: String },

    #[error("I/O error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("internal error: {message}")]
    Internal { message: String },
}

/// Coarse error category, used to decide recoverability per the
/// structural/resolution/content/semantic/cancellation/fatal taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    Config,
    Namespace,
    Import,
    Cache,
    Lsp,
    Io,
    Cancelled,
    Internal,
}

impl RobotCodeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Parse { .. } => ErrorKind::Parse,
            Self::Config { .. } => ErrorKind::Config,
            Self::Namespace { .. } => ErrorKind::Namespace,
            Self::Import { .. } => ErrorKind::Import,
            Self::Cache { .. } => ErrorKind::Cache,
            Self::Lsp { .. } => ErrorKind::Lsp,
            Self::Io { .. } => ErrorKind::Io,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Whether processing of other files/imports may continue after this
    /// error. Cancellation and internal errors are not recoverable; the
    /// rest describe a single failed operation.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Cancelled | ErrorKind::Internal)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn namespace(message: impl Into<String>) -> Self {
        Self::Namespace {
            message: message.into(),
        }
    }

    pub fn import(message: impl Into<String>) -> Self {
        Self::Import {
            message: message.into(),
        }
    }

    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    pub fn lsp(message: impl Into<String>) -> Self {
        Self::Lsp {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The type name used as a diagnostic `code` when this error is
    /// surfaced at an import site (§7, "Structural").
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::Parse { .. } => "ParseError",
            Self::Config { .. } => "ConfigError",
            Self::Namespace { .. } => "NameSpaceError",
            Self::Import { .. } => "ImportError",
            Self::Cache { .. } => "CacheError",
            Self::Lsp { .. } => "LspError",
            Self::Io { .. } => "IoError",
            Self::Cancelled => "Cancelled",
            Self::Internal { .. } => "InternalError",
        }
    }
}

impl From<std::io::Error> for RobotCodeError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::new(),
            source: err,
        }
    }
}
