//! `.log` files: the document's audit log, one `[<unix-ts>] <message>` line
//! per record, in insertion order.

use std::path::PathBuf;

use log::debug;

use cqlstore_core::{CqlResult, Document};

use crate::locked_io::{document_file, write_locked};

/// Where a document's log file lives.
pub fn log_path(doc: &Document) -> PathBuf {
    document_file(doc, "log")
}

pub fn render_logs(doc: &Document) -> String {
    doc.metadata()
        .logs
        .iter()
        .map(|entry| format!("[{}] {}\n", entry.timestamp, entry.message))
        .collect()
}

/// Write every audit record of `doc` to its `.log` file under the file lock.
pub fn write_logs(doc: &Document) -> CqlResult<PathBuf> {
    let path = log_path(doc);
    write_locked(&path, &render_logs(doc))?;
    debug!("Saved {} log records to {}", doc.metadata().logs.len(), path.display());
    Ok(path)
}
