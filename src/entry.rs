//! The pool's internal per-path record: a shared handle plus its usage
//! count.

use std::sync::Arc;

use crate::backend::RrdHandle;

/// One row of the handle table.
///
/// `usage_count == 0` iff this entry is also present in the idle queue —
/// enforced by `PoolState`, not by this type alone.
pub(crate) struct Entry<H: RrdHandle> {
    pub(crate) handle: Arc<H>,
    pub(crate) usage_count: usize,
}

impl<H: RrdHandle> Entry<H> {
    pub(crate) fn new(handle: H) -> Self {
        Self {
            handle: Arc::new(handle),
            usage_count: 1,
        }
    }
}
