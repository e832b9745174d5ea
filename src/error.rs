//! Typed errors for the htredirects core
//!
//! The library never panics on bad input or a bad file; every failure mode
//! a caller might want to branch on gets its own variant. In particular
//! `BlockNotFound` must stay distinguishable from `Parse`, because a
//! missing managed block is recoverable (offer to create it) while a
//! malformed file is not.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The target file is missing, unreadable, or unwritable.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file's block structure is malformed; no partial tree is usable.
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// No valid start/end marker pair exists anywhere in the tree.
    #[error("no managed redirects block found")]
    BlockNotFound,

    /// A directive's arguments don't have the expected rewrite-rule shape.
    /// Listing skips the offending rule; this is only fatal when a caller
    /// asks to decode a single rule directly.
    #[error("malformed rewrite rule argument: {argument}")]
    MalformedRule { argument: String },

    /// An update/delete edit referenced an old URL that no longer exists.
    /// Detected before any mutation, so the file is untouched and a retry
    /// after re-listing is safe.
    #[error("edit conflict: no current rule matches old URL {old_url:?}")]
    EditConflict { old_url: String },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            line,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
