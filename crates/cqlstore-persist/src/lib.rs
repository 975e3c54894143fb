//! CQL persistence adapter.
//!
//! Turns the active document of a `CqlStore` into files and back:
//!
//! - `.cql` table files: padded, tab-separated header and row lines
//! - `.log` files: one `[<unix-ts>] <message>` line per audit record
//! - JSON export/import: column name -> ordered list of stringified values
//!
//! Every file write and reload holds the core's exclusive file lock for its
//! whole duration. A held lock surfaces as `CqlError::LockConflict`; no
//! retry is attempted here.

pub mod export;
mod locked_io;
pub mod log_file;
pub mod table_file;

pub use export::{export_table, import_table};
pub use log_file::{log_path, render_logs, write_logs};
pub use table_file::{connect, cql_path, parse_table, read_table, render_table, write_table};
