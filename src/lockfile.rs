//! Lock file (`spec.md` §6, §9): a single empty file at a well-known path
//! whose existence is the mutex. Created atomically (create-exclusive) at
//! startup; a second instance refuses to start.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

pub const DEFAULT_PATH: &str = "/var/run/ethersrv.lock";

/// An acquired lock file, released on drop so every clean exit path —
/// including an early `?` return — unlinks it.
pub struct LockFile {
    path: PathBuf,
}

impl LockFile {
    /// Creates the lock file exclusively. Fails with `AlreadyExists` if
    /// another instance holds it.
    pub fn acquire(path: impl Into<PathBuf>) -> io::Result<LockFile> {
        let path = path.into();
        OpenOptions::new().write(true).create_new(true).open(&path)?;
        Ok(LockFile { path })
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

pub fn default_path() -> &'static Path {
    Path::new(DEFAULT_PATH)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn second_acquire_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ethersrv.lock");
        let first = LockFile::acquire(&path).unwrap();
        let err = LockFile::acquire(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        drop(first);
    }

    #[test]
    fn drop_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ethersrv.lock");
        {
            let _lock = LockFile::acquire(&path).unwrap();
            assert!(path.exists());
        }
        assert!(!path.exists());
    }
}
