//! Process-wide pool access for callers that want one global instance
//! rather than threading a [`crate::Pool`] value through their call graph —
//! the "legacy parity" alternative the design notes call for alongside the
//! primary, explicit `Pool::new` API.

use std::sync::OnceLock;

use crate::backend::BackendFactory;
use crate::pool::Pool;

/// A lazily-initialised, process-wide pool slot.
///
/// Typically held in a `static`:
///
/// ```ignore
/// static POOL: PoolCell<MyFactory> = PoolCell::new();
/// let pool = POOL.get_or_init(|| Pool::new(MyFactory::default()));
/// ```
///
/// `get_or_init` only ever runs its closure once; later calls (with any
/// closure) return the same instance. There is no way to replace the
/// instance once set — only to [`PoolCell::close`] it, which stops its
/// reclaimer and force-closes every entry in place.
pub struct PoolCell<F: BackendFactory> {
    cell: OnceLock<Pool<F>>,
}

impl<F: BackendFactory> PoolCell<F> {
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    /// Return the pool, initialising it with `init` on first access.
    pub fn get_or_init(&self, init: impl FnOnce() -> Pool<F>) -> &Pool<F> {
        self.cell.get_or_init(init)
    }

    /// Return the pool if it has already been initialised.
    pub fn get(&self) -> Option<&Pool<F>> {
        self.cell.get()
    }

    /// Stop the reclaimer and force-close every entry in the singleton, if
    /// it has been initialised. A no-op otherwise.
    pub fn close(&self) -> crate::error::Result<()> {
        match self.cell.get() {
            Some(pool) => pool.shutdown(),
            None => Ok(()),
        }
    }
}

impl<F: BackendFactory> Default for PoolCell<F> {
    fn default() -> Self {
        Self::new()
    }
}
