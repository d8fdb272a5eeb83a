//! The guard `request_*` returns: a borrow token whose `Drop` performs
//! release automatically (§9's "compile-time invariant" redesign note).

use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::backend::{BackendFactory, RrdHandle};
use crate::pool::PoolInner;

/// An owned, `Deref`-to-handle lease on one pooled entry.
///
/// Dropping it releases the lease automatically (logging, not
/// propagating, any failure — `Drop` cannot return a `Result`).
/// [`crate::Pool::release`] is the explicit, spec-literal alternative that
/// does return a `Result` and that can run before the guard goes out of
/// scope; both share one "already released" flag, so calling release
/// twice on the same guard is the literal idempotent-release-detection
/// law rather than undefined behaviour.
pub struct PooledHandle<F: BackendFactory> {
    pub(crate) canonical: PathBuf,
    pub(crate) handle: Arc<F::Handle>,
    pub(crate) pool: Arc<PoolInner<F>>,
    pub(crate) released: AtomicBool,
}

impl<F: BackendFactory> PooledHandle<F> {
    /// The canonical path this handle was issued for.
    pub fn path(&self) -> &Path {
        &self.canonical
    }

    /// Whether the underlying handle reports itself closed — true if
    /// someone violated the "never close a pool-issued handle" contract,
    /// or after the pool-wide `reset()` forced it closed.
    pub fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }

    pub(crate) fn mark_released(&self) -> bool {
        !self.released.swap(true, Ordering::AcqRel)
    }
}

impl<F: BackendFactory> Deref for PooledHandle<F> {
    type Target = F::Handle;

    fn deref(&self) -> &Self::Target {
        &self.handle
    }
}

impl<F: BackendFactory> Drop for PooledHandle<F> {
    fn drop(&mut self) {
        if self.mark_released() {
            if let Err(err) = self.pool.release_canonical(&self.canonical, &self.handle) {
                tracing::warn!(
                    path = %self.canonical.display(),
                    error = %err,
                    "automatic release on drop failed"
                );
            }
        }
    }
}
