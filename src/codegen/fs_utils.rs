//! Filesystem utilities for code generation
//!
//! All artifact and catalog writes go through [`with_permission_retry`], the
//! one place where a permission failure is repaired and retried.

use std::fs;
use std::io::{self};
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{FsFailure, FsFailureKind};

/// Write content to a file, creating parent directories if needed
pub fn write_file<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, contents: C) -> io::Result<()> {
    let path = path.as_ref();

    // Create parent directories if they don't exist
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(path, contents)
}

/// Write a UTF-8 text file with the permission repair-and-retry policy
pub fn write_text(path: &Path, contents: &str) -> Result<(), FsFailure> {
    with_permission_retry(path, || write_file(path, contents))
}

/// Read a UTF-8 text file; a missing file is `None`
pub fn read_text(path: &Path) -> Result<Option<String>, FsFailure> {
    with_permission_retry(path, || match fs::read_to_string(path) {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    })
}

/// Run `op` on `path`; on a permission error, repair the modes of the path
/// and its parent directory once and run it again.
///
/// A second failure becomes an [`FsFailure`] naming the path and a
/// remediation command.
pub fn with_permission_retry<T, F>(path: &Path, mut op: F) -> Result<T, FsFailure>
where
    F: FnMut() -> io::Result<T>,
{
    match op() {
        Ok(value) => Ok(value),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            warn!(path = %path.display(), "Permission denied, repairing modes and retrying");
            if let Err(repair) = repair_permissions(path) {
                debug!(path = %path.display(), error = %repair, "Permission repair failed");
            }
            op().map_err(|e| failure(path, &e))
        }
        Err(e) => Err(failure(path, &e)),
    }
}

fn failure(path: &Path, err: &io::Error) -> FsFailure {
    let kind = FsFailureKind::from_io(err);
    let hint = match kind {
        FsFailureKind::PermissionDenied => Some(remediation_hint(path)),
        FsFailureKind::NotFound => path
            .parent()
            .map(|p| format!("mkdir -p {}", p.display())),
        FsFailureKind::Other => None,
    };
    FsFailure {
        kind,
        path: path.to_path_buf(),
        message: err.to_string(),
        hint,
    }
}

/// Suggested command for an operator to regain write access
pub fn remediation_hint(path: &Path) -> String {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(path);
    format!("sudo chown -R $(whoami) {}", dir.display())
}

/// Make the file group-writable (0664) and its directory group-writable (0775)
#[cfg(unix)]
pub fn repair_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    if let Some(parent) = path.parent().filter(|p| p.exists()) {
        fs::set_permissions(parent, fs::Permissions::from_mode(0o775))?;
    }
    if path.is_file() {
        fs::set_permissions(path, fs::Permissions::from_mode(0o664))?;
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn repair_permissions(path: &Path) -> io::Result<()> {
    if path.is_file() {
        let mut perms = fs::metadata(path)?.permissions();
        perms.set_readonly(false);
        fs::set_permissions(path, perms)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_write_text_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/c.txt");
        write_text(&path, "hola").unwrap();
        assert_eq!(read_text(&path).unwrap().as_deref(), Some("hola"));
        assert_eq!(read_text(&dir.path().join("missing.txt")).unwrap(), None);
    }

    #[test]
    fn test_retry_happens_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.txt");
        let calls = Cell::new(0);

        let result: Result<(), FsFailure> = with_permission_retry(&path, || {
            calls.set(calls.get() + 1);
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        });
        assert_eq!(calls.get(), 2);
        let failure = result.unwrap_err();
        assert_eq!(failure.kind, FsFailureKind::PermissionDenied);
        assert_eq!(failure.path, path);
        assert!(failure.hint.unwrap().contains("chown"));
    }

    #[test]
    fn test_retry_recovers_on_second_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.txt");
        let calls = Cell::new(0);
        let result = with_permission_retry(&path, || {
            calls.set(calls.get() + 1);
            if calls.get() == 1 {
                Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
            } else {
                Ok(42)
            }
        });
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn test_other_errors_are_not_retried() {
        let path = Path::new("/nonexistent/x.txt");
        let calls = Cell::new(0);
        let result: Result<(), FsFailure> = with_permission_retry(path, || {
            calls.set(calls.get() + 1);
            Err(io::Error::new(io::ErrorKind::NotFound, "gone"))
        });
        assert_eq!(calls.get(), 1);
        assert_eq!(result.unwrap_err().kind, FsFailureKind::NotFound);
    }
}
