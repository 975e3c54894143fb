//! Configuration management for the CQL store
//!
//! Provides presets for the duplicate-column policy and deterministic
//! identifier generation, plus validation.

/// What `insert_column` does when the name is already taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateColumns {
    /// Replace the existing column (last write wins)
    Overwrite,
    /// Fail with `DuplicateColumnName`
    Reject,
}

/// CQL store configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Column ids are drawn from `[1, column_id_base + column_count]`
    pub column_id_base: u32,
    /// Row ids are drawn from `[0, row_id_base + row_index]`
    pub row_id_base: u32,
    /// Draws attempted before an allocation fails with `ResourceExhausted`
    pub max_id_attempts: u32,
    /// Policy for inserting a column whose name already exists
    pub duplicate_columns: DuplicateColumns,
    /// Minimum width of each cell in the `.cql` text file
    pub column_width: usize,
    /// Seed for the id generator; `None` seeds from OS entropy
    pub id_seed: Option<u64>,
    /// Name used when a document is created without one
    pub default_document_name: String,
    /// Directory used when a document is created without one
    pub default_path: String,
}

impl Config {
    /// Strict naming: duplicate column names are rejected instead of overwritten.
    pub fn strict() -> Self {
        Self {
            duplicate_columns: DuplicateColumns::Reject,
            ..Self::default()
        }
    }

    /// Default settings with a fixed id seed, for reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self {
            id_seed: Some(seed),
            ..Self::default()
        }
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.column_id_base == 0 {
            return Err("column_id_base must be > 0".into());
        }
        if self.row_id_base == 0 {
            return Err("row_id_base must be > 0".into());
        }
        if self.max_id_attempts == 0 {
            return Err("max_id_attempts must be > 0".into());
        }
        if self.column_width == 0 || self.column_width > 256 {
            return Err("column_width must be in [1, 256]".into());
        }
        if self.default_document_name.trim().is_empty() {
            return Err("default_document_name must not be blank".into());
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            column_id_base: 10_000,
            row_id_base: 10_000,
            max_id_attempts: 1_000,
            duplicate_columns: DuplicateColumns::Overwrite,
            column_width: 10,
            id_seed: None,
            default_document_name: "Untitled Document".to_string(),
            default_path: "./".to_string(),
        }
    }
}
