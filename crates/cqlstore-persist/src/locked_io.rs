//! Whole-file reads and writes under the core's exclusive file lock.

use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use cqlstore_core::platform::durable_sync;
use cqlstore_core::{try_lock, try_lock_read, CqlError, CqlResult, Document};

/// `<file_path>/<file_name>.<extension>` for a document.
pub(crate) fn document_file(doc: &Document, extension: &str) -> PathBuf {
    let meta = doc.metadata();
    Path::new(&meta.file_path).join(format!("{}.{}", meta.file_name, extension))
}

/// Replace the contents of `path` while holding its lock.
///
/// Missing parent directories and the file itself are created first. The
/// data is durably synced before the lock is released.
pub(crate) fn write_locked(path: &Path, contents: &str) -> CqlResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| CqlError::io_at(parent, &e, "Failed to create directory"))?;
    }

    let lock = try_lock(path)?;
    let mut file = lock.file();
    file.set_len(0)
        .map_err(|e| CqlError::io_at(path, &e, "Failed to truncate file"))?;
    file.seek(SeekFrom::Start(0))
        .map_err(|e| CqlError::io_at(path, &e, "Failed to seek"))?;
    file.write_all(contents.as_bytes())
        .map_err(|e| CqlError::io_at(path, &e, "Write failed"))?;
    durable_sync(file).map_err(|e| CqlError::io_at(path, &e, "durable_sync failed"))?;
    lock.unlock()
}

/// Read all of an existing file while holding its lock. The file is
/// opened read-only, so a missing file stays missing.
pub(crate) fn read_locked(path: &Path) -> CqlResult<String> {
    let lock = try_lock_read(path)?;
    let mut text = String::new();
    let mut file = lock.file();
    file.read_to_string(&mut text)
        .map_err(|e| CqlError::io_at(path, &e, "Read failed"))?;
    lock.unlock()?;
    Ok(text)
}
