//! File lock coordinator — cross-process advisory locks keyed by path
//!
//! Writers (and reloaders) of a persisted document take an exclusive lock
//! on the document file for the duration of the I/O. The lock is fail-fast:
//! `try_lock` never waits, it returns `LockConflict` immediately and leaves
//! retry or abort to the caller.
//!
//! The lock belongs to the open file handle inside `LockHandle`, so two
//! handles in the same process exclude each other just like two processes.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::{CqlError, CqlResult};
use crate::platform;

/// An acquired exclusive lock. Released by `unlock` or on drop.
#[derive(Debug)]
pub struct LockHandle {
    file: File,
    path: PathBuf,
    released: bool,
}

impl LockHandle {
    /// Path the lock is held on.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The locked file. On Windows the byte-range lock also blocks I/O
    /// through other handles, so reads and writes go through this one.
    pub fn file(&self) -> &File {
        &self.file
    }

    /// Release the lock. Consumes the handle, so it runs at most once.
    pub fn unlock(mut self) -> CqlResult<()> {
        self.release()
    }

    fn release(&mut self) -> CqlResult<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        platform::unlock(&self.file, &self.path)
            .map_err(|e| CqlError::io_at(&self.path, &e, "Failed to unlock file"))?;
        debug!("Unlocked {}", self.path.display());
        Ok(())
    }
}

impl Drop for LockHandle {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("{}", e);
        }
    }
}

/// Take an exclusive, non-blocking lock on the whole file at `path`,
/// creating the file empty if it does not exist yet.
pub fn try_lock(path: impl AsRef<Path>) -> CqlResult<LockHandle> {
    let path = path.as_ref().to_path_buf();
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .open(&path)
        .map_err(|e| CqlError::io_at(&path, &e, "Failed to open file for locking"))?;
    lock_opened(file, path)
}

/// Same lock as `try_lock`, taken through a read-only handle on an
/// existing file. For reloads: never creates the file and works on files
/// the process may not write.
pub fn try_lock_read(path: impl AsRef<Path>) -> CqlResult<LockHandle> {
    let path = path.as_ref().to_path_buf();
    let file = File::open(&path)
        .map_err(|e| CqlError::io_at(&path, &e, "Cannot open file"))?;
    lock_opened(file, path)
}

fn lock_opened(file: File, path: PathBuf) -> CqlResult<LockHandle> {
    match platform::try_lock_exclusive(&file, &path) {
        Ok(true) => {
            debug!("Locked {}", path.display());
            Ok(LockHandle { file, path, released: false })
        }
        Ok(false) => {
            warn!("Lock conflict on {}", path.display());
            Err(CqlError::LockConflict { path })
        }
        Err(e) => Err(CqlError::io_at(&path, &e, "Failed to lock file")),
    }
}

/// Release a lock. Same as `handle.unlock()`.
pub fn unlock(handle: LockHandle) -> CqlResult<()> {
    handle.unlock()
}

/// Best-effort probe: true when some holder currently owns the lock.
///
/// Never creates the file. The answer can be stale by the time it is used.
pub fn is_locked(path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();
    let Ok(file) = File::open(path) else {
        return false;
    };
    match platform::try_lock_exclusive(&file, path) {
        Ok(true) => {
            let _ = platform::unlock(&file, path);
            false
        }
        Ok(false) => true,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use tempfile::TempDir;

    #[test]
    fn test_try_lock_creates_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fresh.cql");
        assert!(!path.exists());

        let handle = try_lock(&path).unwrap();
        assert!(path.exists());
        assert_eq!(handle.path(), path.as_path());
        handle.unlock().unwrap();
    }

    #[test]
    fn test_second_holder_gets_conflict() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.cql");

        let first = try_lock(&path).unwrap();
        match try_lock(&path) {
            Err(CqlError::LockConflict { path: p }) => assert_eq!(p, path),
            other => panic!("expected LockConflict, got {:?}", other),
        }

        unlock(first).unwrap();
        let second = try_lock(&path).unwrap();
        second.unlock().unwrap();
    }

    #[test]
    fn test_read_lock_on_read_only_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("frozen.cql");
        std::fs::write(&path, "a\t\n1\t\n").unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_readonly(true);
        std::fs::set_permissions(&path, perms).unwrap();

        let reader = try_lock_read(&path).unwrap();
        assert!(matches!(try_lock_read(&path), Err(CqlError::LockConflict { .. })));
        reader.unlock().unwrap();

        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        #[allow(clippy::permissions_set_readonly_false)]
        perms.set_readonly(false);
        std::fs::set_permissions(&path, perms).unwrap();
    }

    #[test]
    fn test_read_lock_never_creates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.cql");
        assert!(matches!(try_lock_read(&path), Err(CqlError::Io { .. })));
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_releases_lock() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.cql");
        {
            let _held = try_lock(&path).unwrap();
            assert!(is_locked(&path));
        }
        assert!(!is_locked(&path));
    }

    #[test]
    fn test_is_locked_probe() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.cql");

        assert!(!is_locked(&path));
        assert!(!path.exists(), "probe must not create the file");

        let handle = try_lock(&path).unwrap();
        assert!(is_locked(&path));
        handle.unlock().unwrap();
        assert!(!is_locked(&path));
    }

    #[test]
    fn test_concurrent_lockers_are_mutually_exclusive() {
        let dir = TempDir::new().unwrap();
        let path = Arc::new(dir.path().join("race.cql"));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let path = Arc::clone(&path);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    let attempt = try_lock(path.as_path());
                    // Hold until every thread has tried.
                    barrier.wait();
                    attempt.is_ok()
                })
            })
            .collect();

        let winners = handles.into_iter().filter_map(|h| h.join().ok()).filter(|won| *won).count();
        assert_eq!(winners, 1);
    }
}
