//! The pool itself: one monitor (`Mutex` + `Condvar`) guarding the handle
//! table, the idle queue, and the counters, plus the request/release
//! protocol that operates on them.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::backend::{BackendFactory, BackendKind, CreationSpec, RrdHandle};
use crate::cancel::CancelToken;
use crate::canonical::canonicalize;
use crate::config::{PoolConfig, PoolStats};
use crate::error::{PoolError, Result};
use crate::handle::PooledHandle;
use crate::reclaim;
use crate::state::PoolState;

/// How long each `Condvar::wait_timeout` slice lasts while a request is
/// parked waiting for capacity. This is purely an implementation detail
/// for polling a [`CancelToken`] between waits — it is not a wall-clock
/// timeout on the request itself, which otherwise waits indefinitely.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Shared state behind every clone of a [`Pool`]'s handles — the "one
/// pool-wide monitor" of the concurrency model.
pub(crate) struct PoolInner<F: BackendFactory> {
    pub(crate) factory: F,
    pub(crate) state: Mutex<PoolState<F::Handle>>,
    pub(crate) condvar: Condvar,
    pub(crate) stop: AtomicBool,
}

impl<F: BackendFactory> PoolInner<F> {
    fn check_backend(&self) -> Result<()> {
        if self.factory.kind() != BackendKind::File {
            return Err(PoolError::UnsupportedBackend);
        }
        Ok(())
    }

    fn open_for_spec(&self, canonical: &Path, spec: &CreationSpec) -> Result<F::Handle> {
        match spec {
            CreationSpec::XmlDump(xml_path) => self.factory.open_xml(canonical, xml_path),
            CreationSpec::Definition(def) => self.factory.create_from_definition(canonical, def),
        }
    }

    /// Shared by [`PooledHandle::drop`] and [`Pool::release`].
    pub(crate) fn release_canonical(
        &self,
        canonical: &PathBuf,
        handle: &Arc<F::Handle>,
    ) -> Result<()> {
        if handle.is_closed() {
            return Err(PoolError::AlreadyClosed(canonical.clone()));
        }
        let mut state = self.state.lock().unwrap();
        if !state.table.contains_key(canonical) {
            return Err(PoolError::NotInPool(canonical.clone()));
        }
        state.mark_released(canonical);
        drop(state);
        self.condvar.notify_all();
        Ok(())
    }

    fn make_handle(self_arc: &Arc<Self>, canonical: PathBuf, handle: Arc<F::Handle>) -> PooledHandle<F> {
        PooledHandle {
            canonical,
            handle,
            pool: Arc::clone(self_arc),
            released: AtomicBool::new(false),
        }
    }
}

/// A reference-counted pool of open RRD file handles.
///
/// Generic over exactly one concrete [`BackendFactory`] — "the pool never
/// operates on mixed backends in one instance" is a compile-time property
/// here, not a runtime check.
pub struct Pool<F: BackendFactory> {
    inner: Arc<PoolInner<F>>,
    reclaimer: Mutex<Option<JoinHandle<()>>>,
}

impl<F: BackendFactory> Pool<F> {
    /// Build a pool with the default configuration (capacity 500,
    /// unlimited).
    pub fn new(factory: F) -> Self {
        Self::with_config(factory, PoolConfig::default())
    }

    /// Build a pool with an explicit configuration. Starts the background
    /// reclamation worker immediately.
    pub fn with_config(factory: F, config: PoolConfig) -> Self {
        let inner = Arc::new(PoolInner {
            factory,
            state: Mutex::new(PoolState::new(config)),
            condvar: Condvar::new(),
            stop: AtomicBool::new(false),
        });
        let reclaimer = reclaim::spawn(Arc::clone(&inner));
        Self {
            inner,
            reclaimer: Mutex::new(Some(reclaimer)),
        }
    }

    /// Request the handle for an existing file at `path`, opening it via
    /// the factory on a miss. Blocks indefinitely if `limited_capacity` is
    /// set and the table is full; never cancellable.
    pub fn request_existing(&self, path: impl AsRef<Path>) -> Result<PooledHandle<F>> {
        self.request_existing_cancellable(path, &CancelToken::new())
    }

    /// Same as [`Pool::request_existing`], but a blocked wait raises
    /// [`PoolError::Interrupted`] as soon as `cancel` is cancelled.
    pub fn request_existing_cancellable(
        &self,
        path: impl AsRef<Path>,
        cancel: &CancelToken,
    ) -> Result<PooledHandle<F>> {
        self.inner.check_backend()?;
        let canonical = canonicalize(path)?;

        let mut state = self.inner.state.lock().unwrap();
        state.requests += 1;
        loop {
            if state.table.contains_key(&canonical) {
                state.mark_in_use(&canonical);
                state.hits += 1;
                let handle = Arc::clone(&state.table.get(&canonical).unwrap().handle);
                drop(state);
                self.inner.condvar.notify_all();
                tracing::debug!(path = %canonical.display(), "request_existing: hit");
                return Ok(PoolInner::make_handle(&self.inner, canonical, handle));
            }

            if state.has_room() {
                let opened = self.inner.factory.open_existing(&canonical)?;
                state.insert_live(canonical.clone(), opened);
                let handle = Arc::clone(&state.table.get(&canonical).unwrap().handle);
                drop(state);
                self.inner.condvar.notify_all();
                tracing::debug!(path = %canonical.display(), "request_existing: opened new handle");
                return Ok(PoolInner::make_handle(&self.inner, canonical, handle));
            }

            state = self.wait_for_room(state, cancel, &canonical)?;
        }
    }

    /// Create a new file at `path` from `spec` (an XML dump or a
    /// structured definition). Fails with [`PoolError::InUse`] if the path
    /// is currently checked out; transparently closes and replaces a
    /// formerly idle entry at the same path.
    pub fn request_new(
        &self,
        path: impl AsRef<Path>,
        spec: CreationSpec,
    ) -> Result<PooledHandle<F>> {
        self.request_new_cancellable(path, spec, &CancelToken::new())
    }

    /// Same as [`Pool::request_new`], but a blocked wait raises
    /// [`PoolError::Interrupted`] as soon as `cancel` is cancelled.
    pub fn request_new_cancellable(
        &self,
        path: impl AsRef<Path>,
        spec: CreationSpec,
        cancel: &CancelToken,
    ) -> Result<PooledHandle<F>> {
        self.inner.check_backend()?;
        let canonical = canonicalize(path)?;

        let mut state = self.inner.state.lock().unwrap();
        state.requests += 1;
        loop {
            if let Some(entry) = state.table.get(&canonical) {
                if entry.usage_count > 0 {
                    return Err(PoolError::InUse(canonical));
                }
                // Idle: close and remove, then fall through to (re)open below.
                if let Some(removed) = state.remove(&canonical) {
                    if let Err(e) = removed.handle.close() {
                        tracing::warn!(
                            path = %canonical.display(),
                            error = %e,
                            "request_new: failed to close idle entry being replaced"
                        );
                    }
                }
                self.inner.condvar.notify_all();
                continue;
            }

            if state.has_room() {
                let opened = self.inner.open_for_spec(&canonical, &spec)?;
                state.insert_live(canonical.clone(), opened);
                let handle = Arc::clone(&state.table.get(&canonical).unwrap().handle);
                drop(state);
                self.inner.condvar.notify_all();
                tracing::debug!(path = %canonical.display(), "request_new: created handle");
                return Ok(PoolInner::make_handle(&self.inner, canonical, handle));
            }

            state = self.wait_for_room(state, cancel, &canonical)?;
        }
    }

    /// Explicit, spec-literal release. Borrows the guard (rather than
    /// consuming it) so that calling it twice on the same guard is
    /// observable as the idempotent-release-detection law rather than a
    /// compile error; the guard's `Drop` still performs an automatic
    /// release for callers who don't call this.
    pub fn release(&self, handle: &PooledHandle<F>) -> Result<()> {
        if handle.mark_released() {
            self.inner.release_canonical(&handle.canonical, &handle.handle)
        } else {
            Err(PoolError::NotInPool(handle.canonical.clone()))
        }
    }

    /// Close every handle in the table — live or idle — and clear both
    /// the table and the idle queue. Counters are left untouched. Logs
    /// every close failure and returns the first one, if any.
    pub fn reset(&self) -> Result<()> {
        self.close_all_entries()
    }

    /// Stop the background reclaimer and force-close every entry.
    /// Idempotent — safe to call more than once (e.g. once explicitly and
    /// once via `Drop`).
    pub fn shutdown(&self) -> Result<()> {
        self.inner.stop.store(true, Ordering::Release);
        self.inner.condvar.notify_all();
        if let Some(handle) = self.reclaimer.lock().unwrap().take() {
            let _ = handle.join();
        }
        self.close_all_entries()
    }

    fn close_all_entries(&self) -> Result<()> {
        let mut state = self.inner.state.lock().unwrap();
        let canonicals: Vec<PathBuf> = state.table.keys().cloned().collect();
        let mut first_err = None;
        for canonical in canonicals {
            if let Some(entry) = state.table.remove(&canonical) {
                if let Err(e) = entry.handle.close() {
                    tracing::warn!(path = %canonical.display(), error = %e, "failed to close entry");
                    if first_err.is_none() {
                        first_err = Some(e);
                    }
                }
            }
        }
        state.idle.clear();
        drop(state);
        self.inner.condvar.notify_all();
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn wait_for_room<'a>(
        &self,
        state: MutexGuard<'a, PoolState<F::Handle>>,
        cancel: &CancelToken,
        canonical: &Path,
    ) -> Result<MutexGuard<'a, PoolState<F::Handle>>> {
        if cancel.is_cancelled() {
            return Err(PoolError::Interrupted(canonical.to_path_buf()));
        }
        let (state, _timeout) = self
            .inner
            .condvar
            .wait_timeout(state, WAIT_POLL_INTERVAL)
            .unwrap();
        if cancel.is_cancelled() {
            return Err(PoolError::Interrupted(canonical.to_path_buf()));
        }
        Ok(state)
    }

    pub fn capacity(&self) -> usize {
        self.inner.state.lock().unwrap().capacity
    }

    pub fn set_capacity(&self, capacity: usize) {
        let mut state = self.inner.state.lock().unwrap();
        state.capacity = capacity;
        drop(state);
        self.inner.condvar.notify_all();
    }

    pub fn limited_capacity(&self) -> bool {
        self.inner.state.lock().unwrap().limited_capacity
    }

    pub fn set_limited_capacity(&self, limited: bool) {
        let mut state = self.inner.state.lock().unwrap();
        state.limited_capacity = limited;
        drop(state);
        self.inner.condvar.notify_all();
    }

    pub fn hits(&self) -> u64 {
        self.inner.state.lock().unwrap().hits
    }

    pub fn requests(&self) -> u64 {
        self.inner.state.lock().unwrap().requests
    }

    pub fn max_used_capacity(&self) -> usize {
        self.inner.state.lock().unwrap().max_used_capacity
    }

    /// `hits / requests`, rounded to three decimals; `1.0` when there have
    /// been no requests yet.
    pub fn efficiency(&self) -> f64 {
        self.stats().efficiency()
    }

    pub fn cached_paths(&self) -> Vec<PathBuf> {
        self.inner.state.lock().unwrap().cached_paths()
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.inner.state.lock().unwrap();
        PoolStats {
            hits: state.hits,
            requests: state.requests,
            max_used_capacity: state.max_used_capacity,
            table_size: state.table.len(),
            idle_size: state.idle.len(),
            capacity: state.capacity,
            limited_capacity: state.limited_capacity,
        }
    }

    /// A human-readable snapshot: counters, then (if `include_files`) one
    /// `canonical_path [usage_count]` line per entry, sorted for
    /// reproducible output.
    pub fn dump(&self, include_files: bool) -> String {
        let state = self.inner.state.lock().unwrap();
        let stats = PoolStats {
            hits: state.hits,
            requests: state.requests,
            max_used_capacity: state.max_used_capacity,
            table_size: state.table.len(),
            idle_size: state.idle.len(),
            capacity: state.capacity,
            limited_capacity: state.limited_capacity,
        };
        let mut out = format!(
            "rrd-handle-pool: {} entries ({} idle), capacity={}, limited_capacity={}, \
             requests={}, hits={}, efficiency={:.3}, max_used_capacity={}\n",
            stats.table_size,
            stats.idle_size,
            stats.capacity,
            stats.limited_capacity,
            stats.requests,
            stats.hits,
            stats.efficiency(),
            stats.max_used_capacity,
        );
        if include_files {
            let mut rows: Vec<(PathBuf, usize)> = state
                .table
                .iter()
                .map(|(path, entry)| (path.clone(), entry.usage_count))
                .collect();
            rows.sort_by(|a, b| a.0.cmp(&b.0));
            for (path, usage_count) in rows {
                out.push_str(&format!("  {} [{}]\n", path.display(), usage_count));
            }
        }
        out
    }
}

impl<F: BackendFactory> Drop for Pool<F> {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}
