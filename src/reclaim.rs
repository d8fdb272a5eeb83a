//! The background reclamation worker: a dedicated daemon-style thread that
//! evicts idle entries once the table is at or above capacity.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::backend::{BackendFactory, RrdHandle};
use crate::pool::PoolInner;

/// Spawn the reclaimer. It holds only a strong reference to the pool's
/// shared state and exits as soon as `inner.stop` is observed true — there
/// is no separate shutdown channel.
pub(crate) fn spawn<F: BackendFactory>(inner: Arc<PoolInner<F>>) -> JoinHandle<()> {
    thread::Builder::new()
        .name("rrd-handle-pool-reclaimer".into())
        .spawn(move || run(inner))
        .expect("failed to spawn reclamation thread")
}

fn run<F: BackendFactory>(inner: Arc<PoolInner<F>>) {
    loop {
        let mut state = inner.state.lock().unwrap();
        loop {
            if inner.stop.load(Ordering::Acquire) {
                return;
            }
            if state.over_capacity_with_idle() {
                break;
            }
            state = inner.condvar.wait(state).unwrap();
        }

        // Re-check after waking: a racing `stop` may have fired alongside
        // the broadcast that woke us.
        if inner.stop.load(Ordering::Acquire) {
            return;
        }

        let Some((path, entry)) = state.pop_oldest_idle() else {
            continue;
        };
        drop(state);

        if let Err(e) = entry.handle.close() {
            tracing::warn!(path = %path.display(), error = %e, "reclaimer: failed to close idle entry");
        } else {
            tracing::debug!(path = %path.display(), "reclaimer: closed idle entry");
        }
        inner.condvar.notify_all();
    }
}
