//! CqlStore — the active document and its snapshot/rollback lifecycle.
//!
//! A store instance owns at most one active document. Creating or installing
//! another document deactivates the current one and keeps a copy of it in
//! the new document's snapshot history.
//!
//! **Column/row operations**: delegate to the active document's table
//! **Snapshots**: deep copies appended to the active document
//! **Rollback**: live state replaced by a copy of a recorded snapshot;
//! the snapshot itself stays available
//!
//! Everything here is single-threaded and in-memory. Nothing touches the
//! file lock; persistence lives in the adapter crate.

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::aggregate::Aggregate;
use crate::config::Config;
use crate::document::Document;
use crate::error::{CqlError, CqlResult, SnapshotKind};
use crate::table::{Column, ColumnId, RowId, RowSelector, Table};
use crate::value::Value;

/// Embedded tabular store holding one active document.
pub struct CqlStore {
    config: Config,
    active: Option<Document>,
    rng: StdRng,
}

impl CqlStore {
    /// Create a store with no active document.
    pub fn new(config: Config) -> Self {
        let rng = match config.id_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { config, active: None, rng }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // ---------------------------------------------------------------------
    // Document lifecycle
    // ---------------------------------------------------------------------

    /// Make a new active document, displacing the current one into the new
    /// document's snapshot history.
    pub fn new_document(&mut self, name: &str, path: &str) -> &Document {
        let id = self.rng.gen();
        let doc = Document::new(name, path, id);
        self.activate(doc, "Document created")
    }

    /// `new_document` with the configured default name and path.
    pub fn new_default_document(&mut self) -> &Document {
        let name = self.config.default_document_name.clone();
        let path = self.config.default_path.clone();
        self.new_document(&name, &path)
    }

    /// `new_document` whose table is filled by `build` before the document
    /// becomes active. If `build` fails, the current document stays active
    /// and untouched.
    pub fn new_document_with<T, F>(
        &mut self,
        name: &str,
        path: &str,
        build: F,
    ) -> CqlResult<(&Document, T)>
    where
        F: FnOnce(&mut Table, &mut StdRng, &Config) -> CqlResult<T>,
    {
        let id = self.rng.gen();
        let mut doc = Document::new(name, path, id);
        let built = build(&mut doc.table, &mut self.rng, &self.config)?;
        Ok((self.activate(doc, "Document created"), built))
    }

    /// Install an externally built document as the active one.
    pub fn set_current_document(&mut self, document: Document) -> &Document {
        self.activate(document, "Document installed")
    }

    fn activate(&mut self, mut document: Document, reason: &str) -> &Document {
        if let Some(mut previous) = self.active.take() {
            warn!(
                "Document '{}' already in use; saving a snapshot and deactivating it",
                previous.name()
            );
            previous.in_use = false;
            previous.log("Document No Longer Being Used");
            document.document_snapshots.push(previous.history_free_copy());
        }

        document.in_use = true;
        document.log(reason);
        info!("Active document is now '{}' (id {})", document.name(), document.id());
        self.active.insert(document)
    }

    pub fn has_active_document(&self) -> bool {
        self.active.is_some()
    }

    pub fn document(&self) -> CqlResult<&Document> {
        self.active.as_ref().ok_or(CqlError::NoActiveDocument)
    }

    pub fn document_mut(&mut self) -> CqlResult<&mut Document> {
        self.active.as_mut().ok_or(CqlError::NoActiveDocument)
    }

    pub fn table(&self) -> CqlResult<&Table> {
        Ok(&self.document()?.table)
    }

    /// Split borrow of the active table, the id generator and the config.
    fn table_parts(&mut self) -> CqlResult<(&mut Table, &mut StdRng, &Config)> {
        let doc = self.active.as_mut().ok_or(CqlError::NoActiveDocument)?;
        Ok((&mut doc.table, &mut self.rng, &self.config))
    }

    // ---------------------------------------------------------------------
    // Columns and rows
    // ---------------------------------------------------------------------

    /// Insert a column under a fresh id.
    pub fn insert_column(&mut self, column: Column) -> CqlResult<ColumnId> {
        let (table, rng, config) = self.table_parts()?;
        table.insert_column(rng, config, column)
    }

    /// Replace the active table with a new one holding empty `columns`.
    pub fn create_table<I, S>(&mut self, name: &str, columns: I) -> CqlResult<Vec<ColumnId>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (table, rng, config) = self.table_parts()?;
        let mut fresh = Table::new(name);
        fresh.retire_ids_of(table);
        let ids = columns
            .into_iter()
            .map(|c| fresh.insert_column(&mut *rng, config, Column::new(c)))
            .collect::<CqlResult<Vec<_>>>()?;
        *table = fresh;
        debug!("Created table '{}' with {} columns", name, ids.len());
        Ok(ids)
    }

    /// Apply `edit` to a copy of the active table and install the copy only
    /// if every step succeeds. A failed edit leaves the live table as it was.
    pub fn edit_table<T, F>(&mut self, edit: F) -> CqlResult<T>
    where
        F: FnOnce(&mut Table, &mut StdRng, &Config) -> CqlResult<T>,
    {
        let (table, rng, config) = self.table_parts()?;
        let mut staged = table.clone();
        let out = edit(&mut staged, rng, config)?;
        *table = staged;
        Ok(out)
    }

    pub fn set_table_name(&mut self, name: &str) -> CqlResult<()> {
        self.document_mut()?.table.set_name(name);
        Ok(())
    }

    pub fn remove_column(&mut self, name: &str) -> CqlResult<Column> {
        self.document_mut()?.table.remove_column(name)
    }

    pub fn remove_column_by_id(&mut self, id: ColumnId) -> CqlResult<Column> {
        self.document_mut()?.table.remove_column_by_id(id)
    }

    pub fn column(&self, name: &str) -> CqlResult<&Column> {
        self.table()?.column(name)
    }

    pub fn column_by_id(&self, id: ColumnId) -> CqlResult<&Column> {
        self.table()?.column_by_id(id)
    }

    /// Append a value (or an empty row, for `None`) to a column.
    pub fn add_row(&mut self, column: &str, value: impl Into<Option<Value>>) -> CqlResult<RowId> {
        let (table, rng, config) = self.table_parts()?;
        table.add_row(rng, config, column, value.into())
    }

    pub fn delete_row(&mut self, column: &str, selector: RowSelector) -> CqlResult<()> {
        self.document_mut()?.table.delete_row(column, selector).map(drop)
    }

    /// Remove every row in the active table whose value satisfies `predicate`.
    pub fn delete_rows_where<P>(&mut self, predicate: P) -> CqlResult<usize>
    where
        P: FnMut(&Value) -> bool,
    {
        Ok(self.document_mut()?.table.delete_rows_where(predicate))
    }

    /// Overwrite one row's value, returning the previous value.
    pub fn set_row_value(
        &mut self,
        column: &str,
        selector: RowSelector,
        value: impl Into<Option<Value>>,
    ) -> CqlResult<Option<Value>> {
        self.document_mut()?
            .table
            .set_row_value(column, selector, value.into())
    }

    /// Evaluate an aggregate over a column of the active table.
    pub fn aggregate(&self, column: &str, function: Aggregate) -> CqlResult<f64> {
        function.apply(self.column(column)?)
    }

    // ---------------------------------------------------------------------
    // Snapshots and rollback
    // ---------------------------------------------------------------------

    pub fn take_table_snapshot(&mut self) -> CqlResult<()> {
        let doc = self.document_mut()?;
        let snapshot = doc.table.clone();
        doc.table_snapshots.push(snapshot);
        debug!("Table snapshot #{} taken", doc.table_snapshots.len());
        Ok(())
    }

    /// Snapshot the whole document. The copy carries no nested history.
    pub fn take_document_snapshot(&mut self) -> CqlResult<()> {
        let doc = self.document_mut()?;
        let snapshot = doc.history_free_copy();
        doc.document_snapshots.push(snapshot);
        debug!("Document snapshot #{} taken", doc.document_snapshots.len());
        Ok(())
    }

    pub fn table_snapshots(&self) -> CqlResult<&[Table]> {
        Ok(self.document()?.table_snapshots())
    }

    pub fn document_snapshots(&self) -> CqlResult<&[Document]> {
        Ok(self.document()?.document_snapshots())
    }

    /// Replace the live table with a copy of `snapshot`, or of the latest
    /// table snapshot when `None`. An explicit snapshot must be one that was
    /// recorded in this document. Column ids allocated since the snapshot
    /// stay retired.
    pub fn rollback_table(&mut self, snapshot: Option<&Table>) -> CqlResult<()> {
        let doc = self.document_mut()?;
        let restored = match snapshot {
            None => doc
                .table_snapshots
                .last()
                .ok_or(CqlError::SnapshotHistoryEmpty { kind: SnapshotKind::Table })?,
            Some(target) => doc
                .table_snapshots
                .iter()
                .find(|s| *s == target)
                .ok_or(CqlError::UnknownSnapshot { kind: SnapshotKind::Table })?,
        }
        .clone();
        doc.replace_table(restored);
        debug!("Table of '{}' rolled back", doc.name());
        Ok(())
    }

    /// Roll back to the table snapshot at `position` in the history.
    pub fn rollback_table_to(&mut self, position: usize) -> CqlResult<()> {
        let doc = self.document_mut()?;
        let restored = doc
            .table_snapshots
            .get(position)
            .cloned()
            .ok_or(CqlError::UnknownSnapshot { kind: SnapshotKind::Table })?;
        doc.replace_table(restored);
        Ok(())
    }

    /// Replace the live document (metadata, table, id, persisted path) with
    /// a copy of `snapshot`, or of the latest document snapshot when `None`.
    /// The live snapshot history is kept so later rollbacks still work.
    pub fn rollback_document(&mut self, snapshot: Option<&Document>) -> CqlResult<()> {
        let doc = self.document_mut()?;
        let restored = match snapshot {
            None => doc
                .document_snapshots
                .last()
                .ok_or(CqlError::SnapshotHistoryEmpty { kind: SnapshotKind::Document })?,
            Some(target) => doc
                .document_snapshots
                .iter()
                .find(|s| *s == target)
                .ok_or(CqlError::UnknownSnapshot { kind: SnapshotKind::Document })?,
        }
        .clone();
        doc.restore_from(&restored);
        doc.in_use = true;
        doc.log("Document rolled back");
        info!("Document rolled back to '{}' (id {})", doc.name(), doc.id());
        Ok(())
    }
}

impl Default for CqlStore {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl std::fmt::Debug for CqlStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CqlStore")
            .field("active", &self.active.as_ref().map(Document::name))
            .field("columns", &self.active.as_ref().map(|d| d.table.len()))
            .finish()
    }
}
