//! Platform primitives: whole-file advisory locks and durable sync
//!
//! The lock contract is the same everywhere: exclusive, non-blocking,
//! `Ok(false)` when another holder already owns it.
//!
//! - Unix: flock(LOCK_EX | LOCK_NB) on the open file description
//! - Windows: LockFileEx(EXCLUSIVE | FAIL_IMMEDIATELY) over the full range
//! - Other: a companion `<path>.lock` file created with create_new

use std::fs::File;
use std::io;
use std::path::Path;

/// Map a C-style `0 == success` return code.
#[cfg(unix)]
fn os_result(rc: libc::c_int) -> io::Result<()> {
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Map a Win32 `BOOL` return.
#[cfg(windows)]
fn os_result(ok: winapi::shared::minwindef::BOOL) -> io::Result<()> {
    if ok != 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Try to take an exclusive lock on `file` (opened from `path`) without
/// waiting. Returns `Ok(false)` when somebody else holds it.
///
/// Works on read-only handles too: flock ignores the access mode and
/// LockFileEx only needs read access.
pub(crate) fn try_lock_exclusive(file: &File, path: &Path) -> io::Result<bool> {
    #[cfg(unix)]
    {
        use std::os::unix::io::AsRawFd;
        let _ = path;
        // SAFETY: flock only reads the descriptor, which stays open for the
        // lifetime of `file`.
        let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        match os_result(rc) {
            Ok(()) => Ok(true),
            Err(e) if e.raw_os_error() == Some(libc::EWOULDBLOCK) => Ok(false),
            Err(e) => Err(e),
        }
    }

    #[cfg(windows)]
    {
        use std::os::windows::io::AsRawHandle;
        use winapi::shared::minwindef::DWORD;
        use winapi::shared::winerror::ERROR_LOCK_VIOLATION;
        use winapi::um::fileapi::LockFileEx;
        use winapi::um::minwinbase::{LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY, OVERLAPPED};
        let _ = path;
        // SAFETY: OVERLAPPED is plain data; all-zero means offset 0.
        let mut overlapped: OVERLAPPED = unsafe { std::mem::zeroed() };
        // SAFETY: the handle comes from a live File and `overlapped` outlives the call.
        let ok = unsafe {
            LockFileEx(
                file.as_raw_handle() as *mut _,
                LOCKFILE_EXCLUSIVE_LOCK | LOCKFILE_FAIL_IMMEDIATELY,
                0,
                DWORD::MAX,
                DWORD::MAX,
                &mut overlapped,
            )
        };
        match os_result(ok) {
            Ok(()) => Ok(true),
            Err(e) if e.raw_os_error() == Some(ERROR_LOCK_VIOLATION as i32) => Ok(false),
            Err(e) => Err(e),
        }
    }

    #[cfg(not(any(unix, windows)))]
    {
        let _ = file;
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(marker_path(path))
        {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Release a lock taken by `try_lock_exclusive`.
pub(crate) fn unlock(file: &File, path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::io::AsRawFd;
        let _ = path;
        // SAFETY: see try_lock_exclusive.
        os_result(unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_UN) })
    }

    #[cfg(windows)]
    {
        use std::os::windows::io::AsRawHandle;
        use winapi::shared::minwindef::DWORD;
        use winapi::um::fileapi::UnlockFileEx;
        use winapi::um::minwinbase::OVERLAPPED;
        let _ = path;
        // SAFETY: see try_lock_exclusive.
        let mut overlapped: OVERLAPPED = unsafe { std::mem::zeroed() };
        os_result(unsafe {
            UnlockFileEx(file.as_raw_handle() as *mut _, 0, DWORD::MAX, DWORD::MAX, &mut overlapped)
        })
    }

    #[cfg(not(any(unix, windows)))]
    {
        let _ = file;
        match std::fs::remove_file(marker_path(path)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(not(any(unix, windows)))]
fn marker_path(path: &Path) -> std::path::PathBuf {
    let mut marker = path.as_os_str().to_owned();
    marker.push(".lock");
    std::path::PathBuf::from(marker)
}

/// Push a rewritten table or log file to stable storage. Called through
/// the locked handle, before the lock is dropped, so the next holder never
/// sees a half-written file after a crash.
///
/// Apple targets need F_FULLFSYNC; plain fsync there stops at the drive
/// cache. Linux gets away with fdatasync since only the contents matter.
pub fn durable_sync(file: &File) -> io::Result<()> {
    #[cfg(target_os = "linux")]
    {
        use std::os::unix::io::AsRawFd;
        // SAFETY: see try_lock_exclusive.
        os_result(unsafe { libc::fdatasync(file.as_raw_fd()) })
    }

    #[cfg(any(target_os = "macos", target_os = "ios"))]
    {
        use std::os::unix::io::AsRawFd;
        // SAFETY: see try_lock_exclusive.
        os_result(unsafe { libc::fcntl(file.as_raw_fd(), libc::F_FULLFSYNC) }).or_else(|_| file.sync_all())
    }

    #[cfg(windows)]
    {
        use std::os::windows::io::AsRawHandle;
        use winapi::um::fileapi::FlushFileBuffers;
        // SAFETY: see try_lock_exclusive.
        os_result(unsafe { FlushFileBuffers(file.as_raw_handle() as *mut _) })
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "ios", windows)))]
    {
        file.sync_data()
    }
}
