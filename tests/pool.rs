//! End-to-end scenarios against a mock file-backed factory.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use rrd_handle_pool::{
    BackendFactory, BackendKind, CancelToken, CreationSpec, Pool, PoolConfig, PoolError,
    Result, RrdDefinition, RrdHandle,
};

static TRACING_INIT: Once = Once::new();

/// Bring up a `tracing` subscriber once per test binary, so the pool's own
/// `tracing::debug!`/`tracing::warn!` calls (entry creation, reclamation,
/// close failures) are visible with `RUST_LOG=rrd_handle_pool=debug cargo
/// test -- --nocapture` instead of silently going nowhere, the way the
/// teacher's own `init_logging` wires an env filter over a fmt layer.
fn init_tracing() {
    TRACING_INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init()
            .ok();
    });
}

#[derive(Debug)]
struct MockHandle {
    path: PathBuf,
    closed: AtomicBool,
}

impl RrdHandle for MockHandle {
    fn path(&self) -> &Path {
        &self.path
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

struct MockFactory {
    kind: BackendKind,
}

impl MockFactory {
    fn new() -> Self {
        Self {
            kind: BackendKind::File,
        }
    }

    fn memory() -> Self {
        Self {
            kind: BackendKind::Memory,
        }
    }
}

impl BackendFactory for MockFactory {
    type Handle = MockHandle;

    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn open_existing(&self, canonical_path: &Path) -> Result<MockHandle> {
        Ok(MockHandle {
            path: canonical_path.to_path_buf(),
            closed: AtomicBool::new(false),
        })
    }

    fn open_xml(&self, canonical_path: &Path, _xml_dump_path: &Path) -> Result<MockHandle> {
        self.open_existing(canonical_path)
    }

    fn create_from_definition(
        &self,
        canonical_path: &Path,
        _definition: &RrdDefinition,
    ) -> Result<MockHandle> {
        self.open_existing(canonical_path)
    }
}

fn temp_rrd(dir: &tempfile::TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, b"").unwrap();
    path
}

#[test]
fn basic_cache_hit() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let file = temp_rrd(&dir, "a.rrd");
    let pool = Pool::new(MockFactory::new());

    let first = pool.request_existing(&file).unwrap();
    let second = pool.request_existing(&file).unwrap();

    assert_eq!(pool.requests(), 2);
    assert_eq!(pool.hits(), 1);
    assert_eq!(pool.cached_paths().len(), 1);

    drop(first);
    drop(second);
}

#[test]
fn release_and_reclaim() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let file = temp_rrd(&dir, "a.rrd");
    let pool = Pool::with_config(
        MockFactory::new(),
        PoolConfig {
            capacity: 1,
            limited_capacity: false,
        },
    );

    let handle = pool.request_existing(&file).unwrap();
    drop(handle);

    // The entry should still be in the table, now idle, until a later
    // request pushes the table at-or-over capacity and triggers reclaim.
    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    while pool.cached_paths().contains(&std::fs::canonicalize(&file).unwrap()) {
        if std::time::Instant::now() > deadline {
            break;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn recreate_over_idle_entry_closes_and_replaces() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let file = temp_rrd(&dir, "a.rrd");
    let pool = Pool::new(MockFactory::new());

    let handle = pool.request_existing(&file).unwrap();
    drop(handle); // now idle

    let recreated = pool
        .request_new(&file, CreationSpec::Definition(RrdDefinition::new(300, 0)))
        .unwrap();
    assert!(!recreated.is_closed());
}

#[test]
fn request_new_creates_a_file_that_does_not_exist_on_disk_yet() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let brand_new = dir.path().join("never-seen-before.rrd");
    assert!(!brand_new.exists());

    let pool = Pool::new(MockFactory::new());
    let created = pool
        .request_new(&brand_new, CreationSpec::Definition(RrdDefinition::new(300, 0)))
        .unwrap();

    assert!(!created.is_closed());
    assert_eq!(
        created.path(),
        std::fs::canonicalize(dir.path()).unwrap().join("never-seen-before.rrd").as_path(),
    );
}

#[test]
fn recreate_over_live_entry_is_rejected() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let file = temp_rrd(&dir, "a.rrd");
    let pool = Pool::new(MockFactory::new());

    let _held = pool.request_existing(&file).unwrap();
    let err = pool
        .request_new(&file, CreationSpec::Definition(RrdDefinition::new(300, 0)))
        .unwrap_err();
    assert!(matches!(err, PoolError::InUse(_)));
}

#[test]
fn limited_capacity_blocks_until_release() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let a = temp_rrd(&dir, "a.rrd");
    let b = temp_rrd(&dir, "b.rrd");
    let pool = Arc::new(Pool::with_config(
        MockFactory::new(),
        PoolConfig {
            capacity: 1,
            limited_capacity: true,
        },
    ));

    let held = pool.request_existing(&a).unwrap();

    let pool2 = Arc::clone(&pool);
    let b2 = b.clone();
    let waiter = std::thread::spawn(move || pool2.request_existing(&b2).unwrap());

    // Give the waiter a moment to actually block on the condition.
    std::thread::sleep(Duration::from_millis(100));
    assert!(!waiter.is_finished());

    drop(held);
    let got_b = waiter.join().unwrap();
    assert_eq!(got_b.path(), std::fs::canonicalize(&b).unwrap().as_path());
}

#[test]
fn cancellable_request_is_interrupted() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let a = temp_rrd(&dir, "a.rrd");
    let b = temp_rrd(&dir, "b.rrd");
    let pool = Pool::with_config(
        MockFactory::new(),
        PoolConfig {
            capacity: 1,
            limited_capacity: true,
        },
    );

    let _held = pool.request_existing(&a).unwrap();

    let cancel = CancelToken::new();
    let cancel2 = cancel.clone();
    std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(75));
        cancel2.cancel();
    });

    let err = pool.request_existing_cancellable(&b, &cancel).unwrap_err();
    assert!(matches!(err, PoolError::Interrupted(_)));
}

#[test]
fn reset_closes_every_entry() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let a = temp_rrd(&dir, "a.rrd");
    let b = temp_rrd(&dir, "b.rrd");
    let pool = Pool::new(MockFactory::new());

    let held_a = pool.request_existing(&a).unwrap();
    let held_b = pool.request_existing(&b).unwrap();
    drop(held_b); // idle

    pool.reset().unwrap();

    assert!(held_a.is_closed());
    assert_eq!(pool.cached_paths().len(), 0);
}

#[test]
fn unsupported_backend_is_rejected_before_any_mutation() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let file = temp_rrd(&dir, "a.rrd");
    let pool = Pool::new(MockFactory::memory());

    let err = pool.request_existing(&file).unwrap_err();
    assert!(matches!(err, PoolError::UnsupportedBackend));
    assert_eq!(pool.cached_paths().len(), 0);
    assert_eq!(pool.requests(), 0);
}

#[test]
fn idempotent_release_is_detected() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let file = temp_rrd(&dir, "a.rrd");
    let pool = Pool::new(MockFactory::new());

    let handle = pool.request_existing(&file).unwrap();
    pool.release(&handle).unwrap();
    let second = pool.release(&handle);
    assert!(matches!(second, Err(PoolError::NotInPool(_))));
}

#[test]
fn hit_is_deterministic_for_same_canonical_path() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let sub = dir.path().join("sub");
    std::fs::create_dir(&sub).unwrap();
    let file = sub.join("a.rrd");
    std::fs::write(&file, b"").unwrap();

    let factory = MockFactory::new();
    let pool = Pool::new(factory);

    let direct = pool.request_existing(&file).unwrap();
    let via_dotdot = pool
        .request_existing(sub.join("..").join("sub").join("a.rrd"))
        .unwrap();

    assert_eq!(pool.hits(), 1);
    drop(direct);
    drop(via_dotdot);
}

#[test]
fn efficiency_tracks_hit_ratio() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let file = temp_rrd(&dir, "a.rrd");
    let pool = Pool::new(MockFactory::new());

    let h1 = pool.request_existing(&file).unwrap();
    let h2 = pool.request_existing(&file).unwrap();
    let h3 = pool.request_existing(&file).unwrap();

    // 3 requests, 2 hits (second and third).
    assert_eq!(pool.efficiency(), (2.0_f64 / 3.0 * 1000.0).round() / 1000.0);

    drop(h1);
    drop(h2);
    drop(h3);
}

#[test]
fn max_used_capacity_tracks_high_water_mark() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let a = temp_rrd(&dir, "a.rrd");
    let b = temp_rrd(&dir, "b.rrd");
    let pool = Pool::new(MockFactory::new());

    let h1 = pool.request_existing(&a).unwrap();
    let h2 = pool.request_existing(&b).unwrap();
    drop(h1);
    drop(h2);

    assert_eq!(pool.max_used_capacity(), 2);
}

#[test]
fn dump_includes_paths_when_requested() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let file = temp_rrd(&dir, "a.rrd");
    let pool = Pool::new(MockFactory::new());

    let handle = pool.request_existing(&file).unwrap();
    let summary = pool.dump(true);
    assert!(summary.contains("a.rrd"));
    drop(handle);
}

#[test]
fn global_release_via_drop_matches_explicit_release() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let file = temp_rrd(&dir, "a.rrd");
    let pool = Pool::new(MockFactory::new());

    {
        let _handle = pool.request_existing(&file).unwrap();
    } // dropped here, should auto-release without panicking or erroring

    let handle = pool.request_existing(&file).unwrap();
    assert_eq!(pool.hits(), 1);
    drop(handle);
}

#[test]
fn singleton_cell_initializes_once() {
    init_tracing();
    use rrd_handle_pool::PoolCell;

    static CELL: PoolCell<MockFactory> = PoolCell::new();
    let counter = Mutex::new(0);

    let pool1 = CELL.get_or_init(|| {
        *counter.lock().unwrap() += 1;
        Pool::new(MockFactory::new())
    });
    let pool2 = CELL.get_or_init(|| {
        *counter.lock().unwrap() += 1;
        Pool::new(MockFactory::new())
    });

    assert_eq!(*counter.lock().unwrap(), 1);
    assert_eq!(pool1.capacity(), pool2.capacity());
}
