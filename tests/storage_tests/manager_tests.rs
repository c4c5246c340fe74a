//! Tests for StorageManager and TableFile
//!
//! These tests verify:
//! - Opening/creating the data directory
//! - Sweeping temp files left by interrupted writes
//! - Persist/load of whole tables
//! - Atomic replacement (an aborted write leaves the old file intact)
//! - Recovery from missing, empty, and corrupt files
//! - Table discovery and removal

use std::fs;
use std::path::PathBuf;

use serde_json::json;
use shelfdb::dictionary::{DictionaryRegistry, DictionarySpec};
use shelfdb::memtable::Table;
use shelfdb::record::Record;
use shelfdb::storage::{StorageManager, TableFile};
use shelfdb::SyncMode;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_storage() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().to_path_buf();
    (temp_dir, path)
}

fn table_with(entries: &[(&str, serde_json::Value)]) -> Table {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), Record::new(v.clone(), 1, 1_000, None, None)))
        .collect()
}

fn temp_files_in(path: &PathBuf) -> Vec<String> {
    fs::read_dir(path)
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .filter(|name| name.contains(".tmp."))
        .collect()
}

// =============================================================================
// Open/Create Tests
// =============================================================================

#[test]
fn test_open_creates_nested_directory() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("a").join("b").join("db");

    assert!(!path.exists());

    let _manager = StorageManager::open(&path, SyncMode::Fast).unwrap();

    assert!(path.is_dir());
}

#[test]
fn test_open_sweeps_stale_temp_files() {
    let (_temp, path) = setup_temp_storage();
    fs::write(path.join("users.tmp.1700000000000.deadbeef"), b"[[\"half").unwrap();
    fs::write(path.join("users"), b"[]").unwrap();

    let manager = StorageManager::open(&path, SyncMode::Fast).unwrap();

    assert!(temp_files_in(&path).is_empty());
    assert_eq!(manager.table_names().unwrap(), vec!["users".to_string()]);
}

// =============================================================================
// Persist/Load Tests
// =============================================================================

#[test]
fn test_persist_and_load() {
    let (_temp, path) = setup_temp_storage();
    let manager = StorageManager::open(&path, SyncMode::Fast).unwrap();
    let registry = DictionaryRegistry::new();

    let table = table_with(&[("a", json!(1)), ("b", json!({"x": [1, 2]}))]);
    manager.persist("t", &table, &registry).unwrap();

    let loaded = manager.load("t", &registry).unwrap();
    assert_eq!(loaded, table);
}

#[test]
fn test_persist_durable_mode() {
    let (_temp, path) = setup_temp_storage();
    let manager = StorageManager::open(&path, SyncMode::Durable).unwrap();
    let registry = DictionaryRegistry::new();

    let table = table_with(&[("k", json!("v"))]);
    manager.persist("t", &table, &registry).unwrap();

    assert_eq!(manager.load("t", &registry).unwrap(), table);
    assert!(temp_files_in(&path).is_empty());
}

#[test]
fn test_persist_leaves_no_temp_files() {
    let (_temp, path) = setup_temp_storage();
    let manager = StorageManager::open(&path, SyncMode::Fast).unwrap();
    let registry = DictionaryRegistry::new();

    for i in 0..20 {
        let table = table_with(&[("k", json!(i))]);
        manager.persist("t", &table, &registry).unwrap();
    }

    assert!(temp_files_in(&path).is_empty());
}

#[test]
fn test_file_is_json_array_of_pairs() {
    let (_temp, path) = setup_temp_storage();
    let manager = StorageManager::open(&path, SyncMode::Fast).unwrap();

    let mut table = Table::new();
    table.insert(
        "k".to_string(),
        Record::new(json!({"a": 1}), 2, 500, Some(900), None),
    );
    manager.persist("t", &table, &DictionaryRegistry::new()).unwrap();

    let raw: serde_json::Value = serde_json::from_slice(&fs::read(path.join("t")).unwrap()).unwrap();
    assert_eq!(
        raw,
        json!([["k", {"v": {"a": 1}, "ver": 2, "ts": 500, "exp": 900}]])
    );
}

#[test]
fn test_dictionary_compresses_on_disk_and_restores_on_load() {
    let (_temp, path) = setup_temp_storage();
    let manager = StorageManager::open(&path, SyncMode::Fast).unwrap();
    let mut registry = DictionaryRegistry::new();
    registry
        .add("sensors", DictionarySpec::deflate([("sensor", "s")]))
        .unwrap();

    let mut table = Table::new();
    table.insert(
        "dev1".to_string(),
        Record::new(json!({"sensor": "DHT22"}), 1, 1, None, Some("sensors".to_string())),
    );
    manager.persist("t", &table, &registry).unwrap();

    let raw = fs::read_to_string(path.join("t")).unwrap();
    assert!(raw.contains(r#""s":"DHT22""#));
    assert!(!raw.contains("sensor\""));

    let loaded = manager.load("t", &registry).unwrap();
    assert_eq!(loaded.get("dev1").unwrap().value, json!({"sensor": "DHT22"}));
}

#[test]
fn test_unregistered_dictionary_round_trips_verbatim() {
    let (_temp, path) = setup_temp_storage();
    let manager = StorageManager::open(&path, SyncMode::Fast).unwrap();
    let mut registry = DictionaryRegistry::new();
    registry
        .add("sensors", DictionarySpec::deflate([("sensor", "s")]))
        .unwrap();

    let mut table = Table::new();
    table.insert(
        "dev1".to_string(),
        Record::new(json!({"sensor": "DHT22"}), 1, 1, None, Some("sensors".to_string())),
    );
    manager.persist("t", &table, &registry).unwrap();
    let first = fs::read(path.join("t")).unwrap();

    // Load and re-persist without the dictionary
    let empty = DictionaryRegistry::new();
    let loaded = manager.load("t", &empty).unwrap();
    let record = loaded.get("dev1").unwrap();
    assert!(record.is_compressed());
    assert_eq!(record.value, json!({"s": "DHT22"}));

    manager.persist("t", &loaded, &empty).unwrap();
    assert_eq!(fs::read(path.join("t")).unwrap(), first);

    // Registering it again restores the value
    let restored = manager.load("t", &registry).unwrap();
    assert_eq!(restored.get("dev1").unwrap().value, json!({"sensor": "DHT22"}));
}

// =============================================================================
// Recovery Tests
// =============================================================================

#[test]
fn test_load_missing_file_is_empty() {
    let (_temp, path) = setup_temp_storage();
    let manager = StorageManager::open(&path, SyncMode::Fast).unwrap();

    let table = manager.load("nope", &DictionaryRegistry::new()).unwrap();
    assert!(table.is_empty());
    assert!(!path.join("nope").exists());
}

#[test]
fn test_load_empty_file_is_empty() {
    let (_temp, path) = setup_temp_storage();
    fs::write(path.join("t"), b"").unwrap();
    let manager = StorageManager::open(&path, SyncMode::Fast).unwrap();

    assert!(manager.load("t", &DictionaryRegistry::new()).unwrap().is_empty());
}

#[test]
fn test_load_corrupt_file_is_empty() {
    let (_temp, path) = setup_temp_storage();
    let manager = StorageManager::open(&path, SyncMode::Fast).unwrap();

    for garbage in [&b"not json"[..], b"[[\"k\", {\"v\": 1", b"{\"k\": 1}", b"[[\"k\", 7]]"] {
        fs::write(path.join("t"), garbage).unwrap();
        assert!(manager.load("t", &DictionaryRegistry::new()).unwrap().is_empty());
    }
}

#[test]
fn test_corrupt_file_replaced_by_next_persist() {
    let (_temp, path) = setup_temp_storage();
    fs::write(path.join("t"), b"\x00\x01garbage").unwrap();
    let manager = StorageManager::open(&path, SyncMode::Fast).unwrap();
    let registry = DictionaryRegistry::new();

    let mut table = manager.load("t", &registry).unwrap();
    table.insert("k".to_string(), Record::new(json!(true), 1, 1, None, None));
    manager.persist("t", &table, &registry).unwrap();

    assert_eq!(manager.load("t", &registry).unwrap(), table);
}

// =============================================================================
// Atomicity Tests
// =============================================================================

#[test]
fn test_aborted_write_keeps_old_file_intact() {
    let (_temp, path) = setup_temp_storage();
    let file = TableFile::new(path.join("t"));

    file.write_atomic(br#"[["k",{"v":1,"ver":1,"ts":1,"exp":null}]]"#, SyncMode::Fast)
        .unwrap();
    let before = fs::read(path.join("t")).unwrap();

    let staged = file
        .stage(br#"[["k",{"v":2,"ver":2,"ts":2,"exp":null}]]"#, SyncMode::Fast)
        .unwrap();

    // Mid-flight: temp file exists, table file unchanged and still parseable
    assert!(staged.temp_path().exists());
    let during = fs::read(path.join("t")).unwrap();
    assert_eq!(during, before);
    serde_json::from_slice::<serde_json::Value>(&during).unwrap();

    // Abort before rename
    let temp_path = staged.temp_path().to_path_buf();
    drop(staged);

    assert!(!temp_path.exists());
    assert_eq!(fs::read(path.join("t")).unwrap(), before);
}

#[test]
fn test_committed_write_replaces_file() {
    let (_temp, path) = setup_temp_storage();
    let file = TableFile::new(path.join("t"));

    file.write_atomic(b"[]", SyncMode::Fast).unwrap();
    let staged = file.stage(b"[[\"k\",{\"v\":1,\"ver\":1,\"ts\":1,\"exp\":null}]]", SyncMode::Durable).unwrap();
    staged.commit().unwrap();

    assert_eq!(
        fs::read(path.join("t")).unwrap(),
        b"[[\"k\",{\"v\":1,\"ver\":1,\"ts\":1,\"exp\":null}]]".to_vec()
    );
    assert!(temp_files_in(&path).is_empty());
}

#[test]
fn test_failed_write_cleans_up_and_reports() {
    let (_temp, path) = setup_temp_storage();
    // The target is a non-empty directory, so the rename must fail
    let target = path.join("t");
    fs::create_dir(&target).unwrap();
    fs::write(target.join("inner"), b"x").unwrap();

    let file = TableFile::new(&target);
    assert!(file.write_atomic(b"[]", SyncMode::Fast).is_err());
    assert!(temp_files_in(&path).is_empty());
    assert!(target.join("inner").exists());
}

// =============================================================================
// Discovery/Removal Tests
// =============================================================================

#[test]
fn test_table_names_sorted_and_filtered() {
    let (_temp, path) = setup_temp_storage();
    let manager = StorageManager::open(&path, SyncMode::Fast).unwrap();
    let registry = DictionaryRegistry::new();

    for name in ["zeta", "alpha", "mid"] {
        manager.persist(name, &Table::new(), &registry).unwrap();
    }
    fs::create_dir(path.join("subdir")).unwrap();
    fs::write(path.join(".hidden"), b"").unwrap();

    assert_eq!(
        manager.table_names().unwrap(),
        vec!["alpha".to_string(), "mid".to_string(), "zeta".to_string()]
    );
}

#[test]
fn test_remove_table_file() {
    let (_temp, path) = setup_temp_storage();
    let manager = StorageManager::open(&path, SyncMode::Fast).unwrap();

    manager.persist("t", &Table::new(), &DictionaryRegistry::new()).unwrap();
    assert!(manager.contains("t"));

    assert!(manager.remove("t").unwrap());
    assert!(!manager.contains("t"));
    assert!(!manager.remove("t").unwrap());
}
