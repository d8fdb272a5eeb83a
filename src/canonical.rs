//! Path canonicalisation — the pool's identity key.
//!
//! Two paths that canonicalise equal map to the same entry, regardless of
//! how each caller spelled them (relative, `.`/`..`, symlinks).

use std::path::{Path, PathBuf};

use crate::error::{PoolError, Result};

/// Resolve `path` to its canonical, absolute form.
///
/// Equivalent to `java.io.File.getCanonicalPath()`, not plain `realpath`:
/// the final component is allowed to not exist yet. `request_new`'s entire
/// purpose is creating a file that has never existed on disk, so requiring
/// the full path via `std::fs::canonicalize` alone would reject exactly the
/// case this pool exists to serve. When the full path doesn't resolve, fall
/// back to canonicalising the parent directory (which must exist) and
/// rejoining the file name.
pub fn canonicalize(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    match std::fs::canonicalize(path) {
        Ok(canonical) => Ok(canonical),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let file_name = path.file_name().ok_or_else(|| PoolError::io(path, e))?;
            let parent = match path.parent() {
                Some(p) if !p.as_os_str().is_empty() => p,
                _ => Path::new("."),
            };
            let canonical_parent =
                std::fs::canonicalize(parent).map_err(|e| PoolError::io(path, e))?;
            Ok(canonical_parent.join(file_name))
        }
        Err(e) => Err(PoolError::io(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalizes_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.rrd");
        std::fs::write(&file, b"").unwrap();

        let canon = canonicalize(&file).unwrap();
        assert!(canon.is_absolute());
        assert_eq!(canon, std::fs::canonicalize(&file).unwrap());
    }

    #[test]
    fn two_spellings_of_same_file_canonicalize_equal() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        let file = sub.join("a.rrd");
        std::fs::write(&file, b"").unwrap();

        let direct = canonicalize(&file).unwrap();
        let via_dotdot = canonicalize(sub.join("..").join("sub").join("a.rrd")).unwrap();
        assert_eq!(direct, via_dotdot);
    }

    #[test]
    fn missing_path_is_io_error() {
        let err = canonicalize("/nonexistent/definitely/not/here.rrd").unwrap_err();
        assert!(matches!(err, PoolError::Io { .. }));
    }

    #[test]
    fn resolves_a_file_that_does_not_exist_yet_via_its_parent() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-yet-created.rrd");

        let canon = canonicalize(&file).unwrap();
        assert!(canon.is_absolute());
        assert_eq!(canon, std::fs::canonicalize(dir.path()).unwrap().join("not-yet-created.rrd"));
    }

    #[test]
    fn missing_parent_directory_is_still_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("no-such-dir").join("a.rrd");
        let err = canonicalize(&file).unwrap_err();
        assert!(matches!(err, PoolError::Io { .. }));
    }
}
