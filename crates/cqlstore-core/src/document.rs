//! Documents: one table plus metadata and snapshot history
//!
//! A Document is the unit the store activates, snapshots and persists.
//! Table snapshots and document snapshots are deep copies; nothing in a
//! snapshot aliases live state.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::table::Table;

/// Seconds since the Unix epoch.
pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// One audit log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Unix timestamp (seconds)
    pub timestamp: u64,
    pub message: String,
}

/// Document metadata: creation time, file location and audit log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    /// Unix timestamp (seconds) the document was created
    pub time_created: u64,
    /// File name without extension
    pub file_name: String,
    /// Directory the document's files live in
    pub file_path: String,
    /// Audit log, in insertion (and therefore time) order
    pub logs: Vec<LogEntry>,
}

/// A table, its metadata and its snapshot history.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub(crate) metadata: Metadata,
    pub(crate) table: Table,
    pub(crate) in_use: bool,
    pub(crate) id: u32,
    pub(crate) table_snapshots: Vec<Table>,
    pub(crate) document_snapshots: Vec<Document>,
    pub(crate) persisted_path: Option<PathBuf>,
}

impl Document {
    /// A fresh, inactive document whose table is named after the file.
    pub fn new(file_name: impl Into<String>, file_path: impl Into<String>, id: u32) -> Self {
        let file_name = file_name.into();
        Self {
            metadata: Metadata {
                time_created: unix_now(),
                file_name: file_name.clone(),
                file_path: file_path.into(),
                logs: Vec::new(),
            },
            table: Table::new(file_name),
            in_use: false,
            id,
            table_snapshots: Vec::new(),
            document_snapshots: Vec::new(),
            persisted_path: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.file_name
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut Table {
        &mut self.table
    }

    pub fn in_use(&self) -> bool {
        self.in_use
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn table_snapshots(&self) -> &[Table] {
        &self.table_snapshots
    }

    pub fn document_snapshots(&self) -> &[Document] {
        &self.document_snapshots
    }

    /// Where the table was last written or read, if anywhere.
    pub fn persisted_path(&self) -> Option<&Path> {
        self.persisted_path.as_deref()
    }

    pub fn set_persisted_path(&mut self, path: impl Into<PathBuf>) {
        self.persisted_path = Some(path.into());
    }

    /// Append a timestamped audit record.
    pub fn log(&mut self, message: impl Into<String>) {
        self.metadata.logs.push(LogEntry {
            timestamp: unix_now(),
            message: message.into(),
        });
    }

    /// Deep copy with both snapshot sequences left empty, so nested
    /// snapshots cannot grow without bound.
    pub(crate) fn history_free_copy(&self) -> Document {
        Document {
            metadata: self.metadata.clone(),
            table: self.table.clone(),
            in_use: self.in_use,
            id: self.id,
            table_snapshots: Vec::new(),
            document_snapshots: Vec::new(),
            persisted_path: self.persisted_path.clone(),
        }
    }

    /// Install a rolled-back table, keeping the live table's retired ids.
    pub(crate) fn replace_table(&mut self, mut restored: Table) {
        restored.retire_ids_of(&self.table);
        self.table = restored;
        self.log("Table rolled back");
    }

    /// Replace everything except the snapshot history with `snapshot`.
    /// Column ids retired by the live table stay retired.
    pub(crate) fn restore_from(&mut self, snapshot: &Document) {
        self.metadata = snapshot.metadata.clone();
        let mut table = snapshot.table.clone();
        table.retire_ids_of(&self.table);
        self.table = table;
        self.id = snapshot.id;
        self.persisted_path = snapshot.persisted_path.clone();
    }
}
