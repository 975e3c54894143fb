//! CQL Store Core — Embedded, File-Backed Tabular Store
//!
//! A single process holds one active document: a named table of columns,
//! each an index-ordered run of typed rows. Documents can be snapshotted and
//! rolled back, columns can be aggregated, and persisted files are guarded
//! by a cross-process advisory lock.
//!
//! # Architecture
//!
//! - **Value model**: closed set of cell kinds, numeric classification
//! - **Tabular store**: Table -> Column -> Row with collision-free random ids
//! - **Aggregates**: Count/Sum/Average/Max/Min over numeric rows
//! - **Snapshots**: deep copies of the table or document, rollback on demand
//! - **File locks**: fail-fast exclusive locks keyed by file path
//!
//! The on-disk text format lives in a separate adapter crate
//! (cqlstore-persist); this crate never formats or parses files.

pub mod aggregate;
pub mod config;
pub mod document;
pub mod error;
mod ids;
pub mod lock;
pub mod platform;
pub mod store;
pub mod table;
pub mod value;

// Re-export key types for convenience
pub use aggregate::Aggregate;
pub use config::{Config, DuplicateColumns};
pub use document::{Document, LogEntry, Metadata};
pub use error::{ColumnKey, CqlError, CqlResult, SnapshotKind};
pub use lock::{is_locked, try_lock, try_lock_read, unlock, LockHandle};
pub use store::CqlStore;
pub use table::{Column, ColumnId, Row, RowId, RowSelector, Table};
pub use value::{Value, ValueKind};
