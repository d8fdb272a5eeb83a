//! The pool's external collaborators: the handle, the factory that builds
//! it, and the creation inputs that drive `request_new`.
//!
//! These are narrow, opaque interfaces by design (see the crate's top-level
//! docs) — file-format parsing, graphing, and XML import all live outside
//! this crate. The `Definition` shape below carries just enough structure
//! for `request_new`'s in-memory creation path to be exercised by tests.

use std::path::{Path, PathBuf};

use crate::error::Result;

/// An opened round-robin-database file handle.
///
/// `close` takes `&self`, not `self`, so that it can be invoked through a
/// shared `Arc` even while other pool guards reference the same handle —
/// that's what lets `reset()` force-close a handle that is still checked
/// out elsewhere.
pub trait RrdHandle: Send + Sync + 'static {
    /// The canonical path this handle was opened or created against.
    fn path(&self) -> &Path;

    /// Whether this handle has already been closed.
    fn is_closed(&self) -> bool;

    /// Close the handle. Idempotent: closing an already-closed handle is
    /// not an error at this layer (the pool's `release` is what surfaces
    /// `AlreadyClosed` to a caller who finds a handle closed behind its
    /// back).
    fn close(&self) -> Result<()>;
}

/// Which kind of backend a factory produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Handles are backed by real files on disk — the only kind this pool
    /// accepts.
    File,
    /// Handles are backed by in-memory storage only.
    Memory,
}

/// A single archive definition within a structured RRD definition
/// (consolidation steps × rows retained).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveDef {
    pub steps: u32,
    pub rows: u32,
}

/// A structured, in-memory RRD definition — the "(b) structured RRD
/// definition" creation input from the request/release protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RrdDefinition {
    pub step_seconds: u64,
    pub start_unix: u64,
    pub archives: Vec<ArchiveDef>,
}

impl RrdDefinition {
    pub fn new(step_seconds: u64, start_unix: u64) -> Self {
        Self {
            step_seconds,
            start_unix,
            archives: Vec::new(),
        }
    }

    pub fn with_archive(mut self, steps: u32, rows: u32) -> Self {
        self.archives.push(ArchiveDef { steps, rows });
        self
    }
}

/// The creation input to `request_new`: either an XML dump to import, or a
/// structured definition to build the file from scratch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreationSpec {
    XmlDump(PathBuf),
    Definition(RrdDefinition),
}

/// Constructs and validates handles for the pool.
///
/// A single `Pool<F>` is generic over exactly one concrete `F`, so "the
/// pool never operates on mixed backends in one instance" is a
/// compile-time property rather than a runtime check; `kind()` alone
/// distinguishes a genuinely file-backed factory from one that isn't,
/// which is checked on every call before any table mutation (§4.3).
pub trait BackendFactory: Send + Sync + 'static {
    type Handle: RrdHandle;

    /// What kind of backend this factory produces. The pool rejects
    /// anything other than [`BackendKind::File`].
    fn kind(&self) -> BackendKind;

    /// Open an existing file at `canonical_path`.
    fn open_existing(&self, canonical_path: &Path) -> Result<Self::Handle>;

    /// Import an XML dump into a new file at `canonical_path`.
    fn open_xml(&self, canonical_path: &Path, xml_dump_path: &Path) -> Result<Self::Handle>;

    /// Create a new file at `canonical_path` from a structured definition.
    fn create_from_definition(
        &self,
        canonical_path: &Path,
        definition: &RrdDefinition,
    ) -> Result<Self::Handle>;
}
