//! rrd-handle-pool: a reference-counted pool of open round-robin-database
//! file handles, shared across concurrent workers.
//!
//! # Overview
//!
//! Opening an RRD file is comparatively expensive and a process typically
//! touches the same small set of files over and over (one per monitored
//! entity, updated on every poll cycle). This crate is the shared cache
//! that sits between callers and those open file handles:
//!
//! - **Handle table**: one entry per canonical path, reference-counted by
//!   how many callers currently hold it.
//! - **Idle queue**: a FIFO of entries with a zero usage count, in release
//!   order.
//! - **Background reclaimer**: a daemon-style thread that closes the
//!   oldest idle entry once the table is at or above capacity.
//! - **Request/release protocol**: callers get a [`PooledHandle`] guard
//!   back; dropping it releases automatically, or [`Pool::release`] does
//!   so explicitly and idempotently.
//!
//! This crate is **pure logic** with no knowledge of the RRD file format
//! itself — [`RrdHandle`] and [`BackendFactory`] are narrow traits a caller
//! implements against whatever library actually reads and writes RRD
//! files.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              Caller / worker              │
//! └─────────────┬─────────────────────────────┘
//!               │ request_existing / request_new
//!               ▼
//! ┌─────────────────────────────────────────┐
//! │                 Pool<F>                   │  ← one monitor: Mutex + Condvar
//! │   handle table · idle queue · counters    │
//! └─────────────┬─────────────────┬───────────┘
//!               │                 │ pop oldest idle, close
//!               │                 ▼
//!               │        background reclaimer thread
//!               ▼
//!      F: BackendFactory (caller-supplied)
//!               │
//!               ▼
//!         F::Handle: RrdHandle
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use rrd_handle_pool::{BackendFactory, BackendKind, Pool, PoolConfig, Result, RrdHandle};
//! use std::path::Path;
//!
//! # struct FileHandle;
//! # impl RrdHandle for FileHandle {
//! #     fn path(&self) -> &Path { Path::new("/tmp") }
//! #     fn is_closed(&self) -> bool { false }
//! #     fn close(&self) -> Result<()> { Ok(()) }
//! # }
//! # struct FileFactory;
//! # impl BackendFactory for FileFactory {
//! #     type Handle = FileHandle;
//! #     fn kind(&self) -> BackendKind { BackendKind::File }
//! #     fn open_existing(&self, _: &Path) -> Result<FileHandle> { Ok(FileHandle) }
//! #     fn open_xml(&self, _: &Path, _: &Path) -> Result<FileHandle> { Ok(FileHandle) }
//! #     fn create_from_definition(&self, _: &Path, _: &rrd_handle_pool::RrdDefinition) -> Result<FileHandle> { Ok(FileHandle) }
//! # }
//! # fn example() -> Result<()> {
//! let pool = Pool::with_config(FileFactory, PoolConfig { capacity: 64, limited_capacity: true });
//! let handle = pool.request_existing("/var/lib/rrd/host1.rrd")?;
//! // `handle` derefs to `FileHandle`; dropping it releases automatically.
//! # Ok(())
//! # }
//! ```

mod backend;
mod cancel;
mod canonical;
mod config;
mod entry;
mod error;
mod handle;
mod pool;
mod reclaim;
mod singleton;
mod state;

pub use backend::{ArchiveDef, BackendFactory, BackendKind, CreationSpec, RrdDefinition, RrdHandle};
pub use cancel::CancelToken;
pub use canonical::canonicalize;
pub use config::{PoolConfig, PoolStats};
pub use error::{PoolError, Result};
pub use handle::PooledHandle;
pub use pool::Pool;
pub use singleton::PoolCell;

/// Common imports for consumers implementing [`BackendFactory`]/[`RrdHandle`].
pub mod prelude {
    pub use crate::{
        ArchiveDef, BackendFactory, BackendKind, CancelToken, CreationSpec, Pool, PoolCell,
        PoolConfig, PoolError, PooledHandle, Result, RrdDefinition, RrdHandle,
    };
}
