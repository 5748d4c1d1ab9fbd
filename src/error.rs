use std::path::PathBuf;
use thiserror::Error;

/// Structural problems in the engine's result document.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("malformed result document at byte {offset}: {reason}")]
    Malformed { offset: usize, reason: String },

    #[error("mismatched closing tag: expected </{expected}>, found </{found}>")]
    MismatchedTag { expected: String, found: String },

    #[error("document ended inside <{tag}>")]
    UnexpectedEof { tag: String },

    /// A query node without an id child cannot be reported on.
    #[error("query node has no id child")]
    QueryMissingId,
}

/// Harness-level failures. Configuration and discovery problems abort the
/// whole run before the engine is spawned; anything the engine does wrong
/// during a case is folded into that case's outcome instead.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("output file {} already exists; delete it or pass --ignore-exists", .0.display())]
    OutputExists(PathBuf),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("discovery error: {0}")]
    Discovery(String),

    #[error("query-set format error: {0}")]
    QuerySet(String),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl HarnessError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}
