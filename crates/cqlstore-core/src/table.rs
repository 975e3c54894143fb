//! Tabular store: Table -> Columns -> Rows
//!
//! A Table owns its columns through a name index and mirrors them in an id
//! index. Each Column owns its rows in a BTreeMap keyed by row index, so
//! iteration is always index order.
//!
//! Rows refer back to their column by `ColumnId`, resolved through the
//! table at access time. A row whose column has been removed no longer
//! resolves and reports `ColumnNotFound`.

use std::collections::BTreeMap;
use std::fmt;

use hashbrown::{HashMap, HashSet};
use log::debug;
use rand::Rng;

use crate::config::{Config, DuplicateColumns};
use crate::error::{ColumnKey, CqlError, CqlResult};
use crate::ids::draw_unique;
use crate::value::Value;

/// Column identifier, unique among every column allocated in a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnId(pub u32);

/// Row identifier, unique within its column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(pub u32);

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a single row is addressed inside a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowSelector {
    /// Stable position index (never renumbered)
    Index(u32),
    /// Random row id
    Id(RowId),
}

impl fmt::Display for RowSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowSelector::Index(i) => write!(f, "index {}", i),
            RowSelector::Id(id) => write!(f, "id {}", id),
        }
    }
}

/// A single cell within a column.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    value: Option<Value>,
    id: RowId,
    index: u32,
    in_use: bool,
    parent: ColumnId,
}

impl Row {
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn id(&self) -> RowId {
        self.id
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn in_use(&self) -> bool {
        self.in_use
    }

    /// Id of the owning column.
    pub fn parent_id(&self) -> ColumnId {
        self.parent
    }

    /// Resolve the owning column through `table`.
    pub fn parent_column<'t>(&self, table: &'t Table) -> CqlResult<&'t Column> {
        table.column_by_id(self.parent)
    }
}

/// Named, id-identified ordered collection of rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    id: ColumnId,
    rows: BTreeMap<u32, Row>,
    in_use: bool,
}

impl Column {
    /// A detached column. It receives an id when inserted into a table.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: ColumnId(0),
            rows: BTreeMap::new(),
            in_use: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> ColumnId {
        self.id
    }

    pub fn in_use(&self) -> bool {
        self.in_use
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows in index order.
    pub fn rows(&self) -> impl Iterator<Item = &Row> + '_ {
        self.rows.values()
    }

    pub fn row(&self, index: u32) -> Option<&Row> {
        self.rows.get(&index)
    }

    pub fn row_by_id(&self, id: RowId) -> Option<&Row> {
        self.rows.values().find(|r| r.id == id)
    }

    /// Index the next appended row will receive: max index + 1, or 0.
    pub fn next_index(&self) -> u32 {
        self.rows.keys().next_back().map_or(0, |last| last + 1)
    }

    fn resolve_index(&self, selector: RowSelector) -> Option<u32> {
        match selector {
            RowSelector::Index(i) => self.rows.contains_key(&i).then_some(i),
            RowSelector::Id(id) => self.row_by_id(id).map(|r| r.index),
        }
    }

    fn row_not_found(&self, selector: RowSelector) -> CqlError {
        CqlError::RowNotFound {
            column: self.name.clone(),
            row: selector.to_string(),
        }
    }

    fn push<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        config: &Config,
        value: Option<Value>,
    ) -> CqlResult<RowId> {
        let index = self.next_index();
        let high = config.row_id_base.saturating_add(index);
        let rows = &self.rows;
        let id = draw_unique(
            rng,
            0,
            high,
            rows.len(),
            config.max_id_attempts,
            "row id",
            |candidate| rows.values().any(|r| r.id.0 == candidate),
        )?;

        let row = Row {
            value,
            id: RowId(id),
            index,
            in_use: true,
            parent: self.id,
        };
        self.rows.insert(index, row);
        Ok(RowId(id))
    }
}

/// Named collection of columns.
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    /// Owning index, by column name
    columns: HashMap<String, Column>,
    /// Secondary index, column id -> column name
    ids: HashMap<ColumnId, String>,
    /// Every column id handed out in this table, including removed columns
    allocated: HashSet<ColumnId>,
}

// The id registry is bookkeeping: tables holding the same columns are equal
// even when one of them has retired more ids.
impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.columns == other.columns && self.ids == other.ids
    }
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: HashMap::new(),
            ids: HashMap::new(),
            allocated: HashSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Take over every id `previous` ever allocated, so a table replacing
    /// it in the same document cannot hand any of them out again.
    pub(crate) fn retire_ids_of(&mut self, previous: &Table) {
        self.allocated.extend(previous.allocated.iter().copied());
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Total rows across all columns.
    pub fn row_count(&self) -> usize {
        self.columns.values().map(Column::len).sum()
    }

    pub fn contains_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Columns in unspecified order.
    pub fn columns(&self) -> impl Iterator<Item = &Column> + '_ {
        self.columns.values()
    }

    /// Columns ordered by name.
    pub fn columns_sorted(&self) -> Vec<&Column> {
        let mut cols: Vec<&Column> = self.columns.values().collect();
        cols.sort_by(|a, b| a.name.cmp(&b.name));
        cols
    }

    /// Flattened view of every row: columns by name, rows by index.
    pub fn rows(&self) -> impl Iterator<Item = &Row> + '_ {
        self.columns_sorted().into_iter().flat_map(|c| c.rows())
    }

    pub fn column(&self, name: &str) -> CqlResult<&Column> {
        self.columns.get(name).ok_or_else(|| CqlError::ColumnNotFound {
            key: ColumnKey::Name(name.to_string()),
        })
    }

    pub fn column_by_id(&self, id: ColumnId) -> CqlResult<&Column> {
        self.ids
            .get(&id)
            .and_then(|name| self.columns.get(name))
            .ok_or(CqlError::ColumnNotFound { key: ColumnKey::Id(id.0) })
    }

    fn column_mut(&mut self, name: &str) -> CqlResult<&mut Column> {
        self.columns.get_mut(name).ok_or_else(|| CqlError::ColumnNotFound {
            key: ColumnKey::Name(name.to_string()),
        })
    }

    /// Insert `column` under a freshly drawn id.
    ///
    /// The id comes from `[1, column_id_base + column_count]` and never
    /// repeats an id allocated earlier in this table or in a table it
    /// replaced. An existing column with the same name is replaced or
    /// rejected per `config.duplicate_columns`.
    pub fn insert_column<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        config: &Config,
        mut column: Column,
    ) -> CqlResult<ColumnId> {
        if self.columns.contains_key(&column.name)
            && config.duplicate_columns == DuplicateColumns::Reject
        {
            return Err(CqlError::DuplicateColumnName { name: column.name });
        }

        let high = config
            .column_id_base
            .saturating_add(u32::try_from(self.columns.len()).unwrap_or(u32::MAX));
        let allocated = &self.allocated;
        let id = ColumnId(draw_unique(
            rng,
            1,
            high,
            allocated.iter().filter(|c| c.0 <= high).count(),
            config.max_id_attempts,
            "column id",
            |candidate| allocated.contains(&ColumnId(candidate)),
        )?);

        column.id = id;
        column.in_use = true;
        for row in column.rows.values_mut() {
            row.parent = id;
        }

        if let Some(old) = self.columns.remove(&column.name) {
            debug!("Column '{}' (id {}) overwritten", old.name, old.id);
            self.ids.remove(&old.id);
        }
        debug!("Inserted column '{}' with id {}", column.name, id);
        self.allocated.insert(id);
        self.ids.insert(id, column.name.clone());
        self.columns.insert(column.name.clone(), column);
        Ok(id)
    }

    /// Remove a column by name, handing back ownership of it and its rows.
    pub fn remove_column(&mut self, name: &str) -> CqlResult<Column> {
        let mut column = self.columns.remove(name).ok_or_else(|| CqlError::ColumnNotFound {
            key: ColumnKey::Name(name.to_string()),
        })?;
        self.ids.remove(&column.id);
        column.in_use = false;
        debug!("Removed column '{}' (id {})", column.name, column.id);
        Ok(column)
    }

    pub fn remove_column_by_id(&mut self, id: ColumnId) -> CqlResult<Column> {
        let name = self
            .ids
            .get(&id)
            .cloned()
            .ok_or(CqlError::ColumnNotFound { key: ColumnKey::Id(id.0) })?;
        self.remove_column(&name)
    }

    /// Append a row at the column's next index.
    pub fn add_row<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        config: &Config,
        column: &str,
        value: Option<Value>,
    ) -> CqlResult<RowId> {
        self.column_mut(column)?.push(rng, config, value)
    }

    /// Remove one row. Later rows keep their indices.
    pub fn delete_row(&mut self, column: &str, selector: RowSelector) -> CqlResult<Row> {
        let col = self.column_mut(column)?;
        let index = col
            .resolve_index(selector)
            .ok_or_else(|| col.row_not_found(selector))?;
        let mut row = col
            .rows
            .remove(&index)
            .ok_or_else(|| col.row_not_found(selector))?;
        row.in_use = false;
        debug!("Deleted row {} from column '{}'", selector, column);
        Ok(row)
    }

    /// Replace one row's value, returning the previous one.
    pub fn set_row_value(
        &mut self,
        column: &str,
        selector: RowSelector,
        value: Option<Value>,
    ) -> CqlResult<Option<Value>> {
        let col = self.column_mut(column)?;
        let index = col
            .resolve_index(selector)
            .ok_or_else(|| col.row_not_found(selector))?;
        match col.rows.get_mut(&index) {
            Some(row) => Ok(std::mem::replace(&mut row.value, value)),
            None => Err(col.row_not_found(selector)),
        }
    }

    /// Remove every row whose value satisfies `predicate`; rows without a
    /// value are kept. Columns are visited by name, rows by index. Returns
    /// the number of rows removed.
    pub fn delete_rows_where<P>(&mut self, mut predicate: P) -> usize
    where
        P: FnMut(&Value) -> bool,
    {
        let mut names: Vec<String> = self.columns.keys().cloned().collect();
        names.sort();

        let mut removed = 0;
        for name in names {
            if let Some(col) = self.columns.get_mut(&name) {
                let before = col.rows.len();
                col.rows.retain(|_, row| !row.value.as_ref().is_some_and(&mut predicate));
                removed += before - col.rows.len();
            }
        }
        if removed > 0 {
            debug!("Deleted {} rows from table '{}'", removed, self.name);
        }
        removed
    }
}
