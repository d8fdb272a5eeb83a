//! Error types surfaced by the pool.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, PoolError>;

/// Errors the pool can return to a caller.
///
/// `Io` wraps [`std::io::Error`], which is not `Clone`, so this type is not
/// `Clone` either — tests that need to inspect a returned error compare it
/// with `matches!` rather than cloning it.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Canonicalisation, or an underlying open/close, failed.
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `request_new` was called for a path that is currently checked out.
    #[error("cannot create new file: {0} is already in use")]
    InUse(PathBuf),

    /// `release` was called for a handle the pool did not issue, or after
    /// `reset()` already dropped its entry.
    #[error("{0} is not in the pool")]
    NotInPool(PathBuf),

    /// `release` was called for a handle that reports itself closed —
    /// someone called `close()` on a pool-issued handle directly.
    #[error("{0} was already closed outside the pool")]
    AlreadyClosed(PathBuf),

    /// The factory's backend is not file-backed.
    #[error("default backend factory is not file-backed")]
    UnsupportedBackend,

    /// A cancellable wait was cancelled via its `CancelToken`.
    #[error("request for {0} was interrupted while waiting for capacity")]
    Interrupted(PathBuf),
}

impl PoolError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PoolError::Io {
            path: path.into(),
            source,
        }
    }
}
