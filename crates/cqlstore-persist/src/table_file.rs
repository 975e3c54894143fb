//! `.cql` table files
//!
//! Layout: one header line of column names, then one line per row position.
//! Line *i* holds the *i*-th row (in index order) of every column. Cells are
//! right-aligned to the configured minimum width and each is followed by a
//! tab. Columns appear in name order; a column shorter than the tallest one
//! leaves blank cells at the bottom.
//!
//! Values go through the core's row-to-string conversion on the way out and
//! `Value::infer` on the way back, so kinds are recovered from their text.

use std::path::{Path, PathBuf};

use log::info;

use rand::Rng;

use cqlstore_core::{Column, ColumnId, Config, CqlError, CqlResult, CqlStore, Document, Table, Value};

use crate::locked_io::{document_file, read_locked, write_locked};

/// Column name with its values in index order; `None` is an empty row.
pub type ParsedColumn = (String, Vec<Option<Value>>);

/// Where a document's table file lives.
pub fn cql_path(doc: &Document) -> PathBuf {
    document_file(doc, "cql")
}

fn cell(text: &str, width: usize) -> String {
    format!("{:>width$}\t", text, width = width)
}

/// Render a table in `.cql` layout. An empty table renders as "".
pub fn render_table(table: &Table, width: usize) -> String {
    let columns = table.columns_sorted();
    if columns.is_empty() {
        return String::new();
    }

    let mut out: String = columns.iter().map(|c| cell(c.name(), width)).collect();
    out.push('\n');

    let cells: Vec<Vec<String>> = columns
        .iter()
        .map(|c| {
            c.rows()
                .map(|r| r.value().map(ToString::to_string).unwrap_or_default())
                .collect()
        })
        .collect();
    let height = cells.iter().map(Vec::len).max().unwrap_or(0);

    for i in 0..height {
        for column in &cells {
            out.push_str(&cell(column.get(i).map_or("", String::as_str), width));
        }
        out.push('\n');
    }
    out
}

/// Reason `text` cannot be stored as a cell and read back unchanged.
/// Cells are tab separated and trimmed on reload; a blank cell is an
/// empty row.
fn unstorable(text: &str) -> Option<&'static str> {
    if text.contains(['\t', '\n', '\r']) {
        Some("contains a tab or newline")
    } else if text.trim().is_empty() {
        Some("is blank")
    } else if text.trim() != text {
        Some("has leading or trailing whitespace")
    } else {
        None
    }
}

/// Reject names and text cells that would not survive a reload.
fn check_cells(table: &Table, path: &Path) -> CqlResult<()> {
    for column in table.columns_sorted() {
        let offending = match unstorable(column.name()) {
            Some(reason) => Some((column.name(), reason)),
            None => column.rows().find_map(|r| match r.value() {
                Some(Value::Text(s)) => unstorable(s).map(|reason| (s.as_str(), reason)),
                _ => None,
            }),
        };
        if let Some((text, reason)) = offending {
            return Err(CqlError::Io {
                path: Some(path.to_path_buf()),
                kind: std::io::ErrorKind::InvalidData,
                message: format!("cell {:?} in column '{}' {}", text, column.name(), reason),
            });
        }
    }
    Ok(())
}

fn split_cells(line: &str) -> impl Iterator<Item = &str> {
    line.strip_suffix('\t').unwrap_or(line).split('\t').map(str::trim)
}

/// Parse `.cql` text. `path` is only used for error context.
pub fn parse_table(text: &str, path: &Path) -> CqlResult<Vec<ParsedColumn>> {
    let parse_err = |line: usize, reason: String| CqlError::Parse {
        path: path.to_path_buf(),
        line,
        reason,
    };

    let mut lines = text.lines();
    let header = match lines.next() {
        Some(h) if !h.trim().is_empty() => h,
        _ => return Ok(Vec::new()),
    };

    let mut columns: Vec<ParsedColumn> = Vec::new();
    for (pos, name) in split_cells(header).enumerate() {
        if name.is_empty() {
            return Err(parse_err(1, format!("empty column name at position {}", pos)));
        }
        if columns.iter().any(|(n, _)| n == name) {
            return Err(parse_err(1, format!("duplicate column name '{}'", name)));
        }
        columns.push((name.to_string(), Vec::new()));
    }

    for (i, line) in lines.enumerate() {
        if line.is_empty() {
            continue;
        }
        let cells: Vec<&str> = split_cells(line).collect();
        if cells.len() != columns.len() {
            return Err(parse_err(
                i + 2,
                format!("expected {} cells, found {}", columns.len(), cells.len()),
            ));
        }
        for ((_, values), text) in columns.iter_mut().zip(cells) {
            values.push((!text.is_empty()).then(|| Value::infer(text)));
        }
    }

    // Blank cells at the bottom pad shorter columns; they are not rows.
    for (_, values) in &mut columns {
        while values.last().is_some_and(Option::is_none) {
            values.pop();
        }
    }
    Ok(columns)
}

/// Read and parse a table file under its lock.
pub fn read_table(path: impl AsRef<Path>) -> CqlResult<Vec<ParsedColumn>> {
    let path = path.as_ref();
    let text = read_locked(path)?;
    parse_table(&text, path)
}

/// Write the active document's table to its `.cql` file.
///
/// Fails fast with `LockConflict` if another holder has the file locked.
/// On success the document records the path and logs the write.
pub fn write_table(store: &mut CqlStore) -> CqlResult<PathBuf> {
    let width = store.config().column_width;
    let doc = store.document()?;
    let path = cql_path(doc);
    check_cells(doc.table(), &path)?;
    let contents = render_table(doc.table(), width);

    write_locked(&path, &contents)?;

    let doc = store.document_mut()?;
    doc.set_persisted_path(&path);
    doc.log(format!("Table written to {}", path.display()));
    info!("Wrote {} columns to {}", doc.table().len(), path.display());
    Ok(path)
}

/// Insert parsed columns into `table`, in the order given.
pub(crate) fn fill_table<R: Rng + ?Sized>(
    table: &mut Table,
    rng: &mut R,
    config: &Config,
    columns: Vec<ParsedColumn>,
) -> CqlResult<Vec<ColumnId>> {
    let mut ids = Vec::with_capacity(columns.len());
    for (name, values) in columns {
        ids.push(table.insert_column(&mut *rng, config, Column::new(name.as_str()))?);
        for value in values {
            table.add_row(&mut *rng, config, &name, value)?;
        }
    }
    Ok(ids)
}

/// Load a `.cql` file into a new active document named after the file.
///
/// The document is built completely before it is activated; on any error
/// the previously active document is left in place.
pub fn connect(store: &mut CqlStore, path: impl AsRef<Path>) -> CqlResult<&Document> {
    let path = path.as_ref();
    let columns = read_table(path)?;

    let name = match path.file_stem().and_then(|s| s.to_str()) {
        Some(stem) => stem.to_string(),
        None => store.config().default_document_name.clone(),
    };
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_string_lossy().into_owned(),
        _ => store.config().default_path.clone(),
    };

    store.new_document_with(&name, &dir, |table, rng, config| {
        fill_table(table, rng, config, columns)
    })?;

    let doc = store.document_mut()?;
    doc.set_persisted_path(path);
    doc.log(format!("Connected to {}", path.display()));
    info!("Loaded {} columns from {}", doc.table().len(), path.display());
    store.document()
}
