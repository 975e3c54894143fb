//! Integration tests: `.cql` and `.log` files on disk, under the file lock.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use cqlstore_core::{try_lock, Column, Config, CqlError, CqlStore, Value};
use cqlstore_persist::{connect, cql_path, export_table, read_table, write_logs, write_table};

// ---- Helpers ----

fn people_store(dir: &Path) -> CqlStore {
    let mut store = CqlStore::new(Config::seeded(11));
    store.new_document("people", &dir.to_string_lossy());
    store.create_table("people", ["name", "age", "score"]).unwrap();
    store.add_row("name", Value::from("ann")).unwrap();
    store.add_row("name", Value::from("bo")).unwrap();
    store.add_row("age", Value::Integer(30)).unwrap();
    store.add_row("age", Value::BigInteger(5_000_000_000)).unwrap();
    store.add_row("score", Value::Decimal(2.5)).unwrap();
    store.add_row("score", None::<Value>).unwrap();
    store.add_row("score", Value::Boolean(true)).unwrap();
    store
}

// ---- Round trip ----

#[test]
fn test_write_then_connect_round_trip() {
    let dir = TempDir::new().unwrap();
    let mut store = people_store(dir.path());
    let path = write_table(&mut store).unwrap();
    assert_eq!(path, dir.path().join("people.cql"));
    assert_eq!(store.document().unwrap().persisted_path(), Some(path.as_path()));

    let exported = export_table(store.table().unwrap());

    let mut reloaded = CqlStore::new(Config::seeded(12));
    let doc = connect(&mut reloaded, &path).unwrap();
    assert_eq!(doc.name(), "people");
    assert_eq!(doc.persisted_path(), Some(path.as_path()));
    assert_eq!(export_table(doc.table()), exported);

    let age: Vec<Option<&Value>> = reloaded.column("age").unwrap().rows().map(|r| r.value()).collect();
    assert_eq!(age, vec![Some(&Value::Integer(30)), Some(&Value::BigInteger(5_000_000_000))]);
    let score = reloaded.column("score").unwrap();
    assert_eq!(score.row(1).unwrap().value(), None);
    assert_eq!(score.row(2).unwrap().value(), Some(&Value::Boolean(true)));
}

#[test]
fn test_connect_displaces_active_document() {
    let dir = TempDir::new().unwrap();
    let mut store = people_store(dir.path());
    let path = write_table(&mut store).unwrap();

    store.new_document("scratch", "/tmp");
    connect(&mut store, &path).unwrap();

    let doc = store.document().unwrap();
    assert_eq!(doc.name(), "people");
    assert_eq!(doc.document_snapshots().last().unwrap().name(), "scratch");
}

#[test]
fn test_write_creates_missing_directory() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("a").join("b");
    let mut store = people_store(&nested);
    let path = write_table(&mut store).unwrap();
    assert!(path.exists());
    assert_eq!(read_table(&path).unwrap().len(), 3);
}

#[test]
fn test_empty_table_round_trip() {
    let dir = TempDir::new().unwrap();
    let mut store = CqlStore::new(Config::seeded(13));
    store.new_document("empty", &dir.path().to_string_lossy());
    let path = write_table(&mut store).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "");
    let doc = connect(&mut store, &path).unwrap();
    assert!(doc.table().is_empty());
}

#[test]
fn test_decimals_survive_round_trip_exactly() {
    let dir = TempDir::new().unwrap();
    let mut store = CqlStore::new(Config::seeded(14));
    store.new_document("measures", &dir.path().to_string_lossy());
    store.insert_column(Column::new("x")).unwrap();
    let values = [0.000_000_1, 123.456_789_1, 2.0, -7.25];
    for v in values {
        store.add_row("x", Value::Decimal(v)).unwrap();
    }
    let path = write_table(&mut store).unwrap();

    let mut reloaded = CqlStore::default();
    connect(&mut reloaded, &path).unwrap();
    let got: Vec<Option<&Value>> = reloaded.column("x").unwrap().rows().map(|r| r.value()).collect();
    let want: Vec<Value> = values.iter().map(|v| Value::Decimal(*v)).collect();
    assert_eq!(got, want.iter().map(Some).collect::<Vec<_>>());
}

#[test]
fn test_blank_text_is_refused_instead_of_dropped() {
    let dir = TempDir::new().unwrap();
    let mut store = CqlStore::new(Config::seeded(15));
    store.new_document("blank", &dir.path().to_string_lossy());
    store.insert_column(Column::new("t")).unwrap();
    store.add_row("t", Value::Integer(1)).unwrap();
    store.add_row("t", Value::from("")).unwrap();

    assert!(matches!(write_table(&mut store), Err(CqlError::Io { .. })));
    assert!(!dir.path().join("blank.cql").exists());
    assert_eq!(store.column("t").unwrap().len(), 2);
}

#[test]
fn test_failed_connect_keeps_active_document() {
    let dir = TempDir::new().unwrap();
    let mut writer = people_store(dir.path());
    let path = write_table(&mut writer).unwrap();

    // An empty column id range makes the first insert fail.
    let mut config = Config::seeded(16);
    config.column_id_base = 0;
    let mut store = CqlStore::new(config);
    store.new_document("current", "/tmp");

    assert!(matches!(connect(&mut store, &path), Err(CqlError::ResourceExhausted { .. })));
    let doc = store.document().unwrap();
    assert_eq!(doc.name(), "current");
    assert!(doc.document_snapshots().is_empty());
}

#[test]
fn test_connect_read_only_file() {
    let dir = TempDir::new().unwrap();
    let mut store = people_store(dir.path());
    let path = write_table(&mut store).unwrap();

    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_readonly(true);
    fs::set_permissions(&path, perms).unwrap();

    let mut reloaded = CqlStore::default();
    assert_eq!(connect(&mut reloaded, &path).unwrap().table().len(), 3);

    let mut perms = fs::metadata(&path).unwrap().permissions();
    #[allow(clippy::permissions_set_readonly_false)]
    perms.set_readonly(false);
    fs::set_permissions(&path, perms).unwrap();
}

// ---- Locking ----

#[test]
fn test_write_while_locked_is_conflict() {
    let dir = TempDir::new().unwrap();
    let mut store = people_store(dir.path());
    let path = cql_path(store.document().unwrap());

    let held = try_lock(&path).unwrap();
    match write_table(&mut store) {
        Err(CqlError::LockConflict { path: p }) => assert_eq!(p, path),
        other => panic!("expected LockConflict, got {:?}", other),
    }
    assert!(store.document().unwrap().persisted_path().is_none());
    assert!(matches!(connect(&mut store, &path), Err(CqlError::LockConflict { .. })));

    held.unlock().unwrap();
    write_table(&mut store).unwrap();
}

#[test]
fn test_connect_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.cql");
    let mut store = CqlStore::default();

    assert!(matches!(connect(&mut store, &missing), Err(CqlError::Io { .. })));
    assert!(!missing.exists());
    assert!(!store.has_active_document());
}

#[test]
fn test_write_rejects_tab_in_text() {
    let dir = TempDir::new().unwrap();
    let mut store = people_store(dir.path());
    store.add_row("name", Value::from("a\tb")).unwrap();
    assert!(matches!(write_table(&mut store), Err(CqlError::Io { .. })));
}

// ---- Logs ----

#[test]
fn test_log_file_records_lifecycle() {
    let dir = TempDir::new().unwrap();
    let mut store = people_store(dir.path());
    write_table(&mut store).unwrap();

    let path = write_logs(store.document().unwrap()).unwrap();
    assert_eq!(path, dir.path().join("people.log"));

    let text = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), store.document().unwrap().metadata().logs.len());
    assert!(lines.iter().all(|l| l.starts_with('[')));
    assert!(lines.last().unwrap().contains("Table written to"));
}
