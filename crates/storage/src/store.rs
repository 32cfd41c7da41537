//! Record store
//!
//! Per-logical-type tables behind a single `parking_lot::RwLock`.
//!
//! # Design
//!
//! - Table: FxHashMap id → row for O(1) lookups, BTreeMap sequence → id for
//!   insertion-order scans, one [`KeyIndex`] per declared alternate key
//! - Tables: every table plus the global version and sequence counters
//! - RecordStore: the lock; `read`/`write` run a closure under it so a
//!   multi-step operation (a business rule, a whole batch) is atomic with
//!   respect to concurrent readers
//!
//! # Isolation
//!
//! Records handed out by the public API are clones. Borrowed access
//! (`iter`, `get_ref`) is only available inside a `read`/`write` closure.

use std::collections::BTreeMap;

use memcrm_core::{AlternateKey, Catalog, CrmError, CrmResult, Record, Value};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::trace;
use uuid::Uuid;

use crate::index::KeyIndex;

/// Stored row: record plus its insertion sequence.
#[derive(Debug, Clone)]
struct Row {
    seq: u64,
    record: Record,
}

/// One logical type's records.
#[derive(Debug, Clone, Default)]
pub struct Table {
    rows: FxHashMap<Uuid, Row>,
    order: BTreeMap<u64, Uuid>,
    indexes: Vec<KeyIndex>,
}

impl Table {
    fn with_keys(keys: &[AlternateKey]) -> Self {
        Self {
            rows: FxHashMap::default(),
            order: BTreeMap::new(),
            indexes: keys.iter().cloned().map(KeyIndex::new).collect(),
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.order
            .values()
            .filter_map(move |id| self.rows.get(id).map(|row| &row.record))
    }
}

/// All tables plus the store counters.
#[derive(Debug, Default)]
pub struct Tables {
    tables: FxHashMap<String, Table>,
    keys: FxHashMap<String, Vec<AlternateKey>>,
    version: u64,
    sequence: u64,
}

impl Tables {
    /// Empty tables with the given alternate-key declarations.
    pub fn with_keys(keys: impl IntoIterator<Item = (String, Vec<AlternateKey>)>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Current store version (incremented on every write).
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Drop every record, keeping key declarations and the version counter.
    pub fn clear(&mut self) {
        self.tables.clear();
        self.version += 1;
        trace!(version = self.version, "cleared");
    }

    fn table_mut(&mut self, logical_name: &str) -> &mut Table {
        let keys = &self.keys;
        self.tables
            .entry(logical_name.to_string())
            .or_insert_with(|| {
                Table::with_keys(keys.get(logical_name).map(Vec::as_slice).unwrap_or(&[]))
            })
    }

    /// Borrow a table.
    pub fn table(&self, logical_name: &str) -> Option<&Table> {
        self.tables.get(logical_name)
    }

    /// Clone of a record.
    pub fn get(&self, logical_name: &str, id: Uuid) -> Option<Record> {
        self.get_ref(logical_name, id).cloned()
    }

    /// Borrow a record.
    pub fn get_ref(&self, logical_name: &str, id: Uuid) -> Option<&Record> {
        self.tables
            .get(logical_name)
            .and_then(|t| t.rows.get(&id))
            .map(|row| &row.record)
    }

    /// True when the record exists.
    pub fn contains(&self, logical_name: &str, id: Uuid) -> bool {
        self.get_ref(logical_name, id).is_some()
    }

    /// Insert a new record; fails when the id already exists.
    pub fn insert(&mut self, record: Record) -> CrmResult<u64> {
        if self.contains(&record.logical_name, record.id) {
            return Err(CrmError::DuplicateId);
        }
        self.put(record)
    }

    /// Insert or replace a record, enforcing alternate-key uniqueness.
    ///
    /// A replaced record keeps its scan position. Returns the assigned
    /// version.
    pub fn put(&mut self, mut record: Record) -> CrmResult<u64> {
        let logical_name = record.logical_name.clone();
        {
            let table = self.table_mut(&logical_name);
            for index in &table.indexes {
                index.check(&record)?;
            }
        }
        self.version += 1;
        record.version = self.version;
        let version = self.version;
        let next_seq = self.sequence + 1;

        let table = self.table_mut(&logical_name);
        let seq = match table.rows.remove(&record.id) {
            Some(old) => {
                for index in &mut table.indexes {
                    index.remove(&old.record);
                }
                old.seq
            }
            None => {
                table.order.insert(next_seq, record.id);
                next_seq
            }
        };
        for index in &mut table.indexes {
            index.insert(&record);
        }
        trace!(entity = %logical_name, id = %record.id, version, "put");
        table.rows.insert(record.id, Row { seq, record });
        if seq == next_seq {
            self.sequence = next_seq;
        }
        Ok(version)
    }

    /// Remove a record, returning it.
    pub fn delete(&mut self, logical_name: &str, id: Uuid) -> Option<Record> {
        let table = self.tables.get_mut(logical_name)?;
        let row = table.rows.remove(&id)?;
        table.order.remove(&row.seq);
        for index in &mut table.indexes {
            index.remove(&row.record);
        }
        self.version += 1;
        trace!(entity = %logical_name, id = %id, "delete");
        Some(row.record)
    }

    /// Clones of every record of a type, in insertion order.
    pub fn scan(&self, logical_name: &str) -> Vec<Record> {
        self.iter(logical_name).cloned().collect()
    }

    /// Borrowed records of a type, in insertion order.
    pub fn iter<'a>(&'a self, logical_name: &str) -> Box<dyn Iterator<Item = &'a Record> + 'a> {
        match self.tables.get(logical_name) {
            Some(table) => Box::new(table.iter()),
            None => Box::new(std::iter::empty()),
        }
    }

    /// Number of records of a type.
    pub fn count(&self, logical_name: &str) -> usize {
        self.tables.get(logical_name).map(Table::len).unwrap_or(0)
    }

    /// Logical types that currently hold records.
    pub fn logical_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tables
            .iter()
            .filter(|(_, t)| !t.is_empty())
            .map(|(n, _)| n.clone())
            .collect();
        names.sort();
        names
    }

    /// Look up a record id by alternate-key values.
    ///
    /// `Ok(None)` when the key is declared but no record matches.
    pub fn find_by_key(
        &self,
        logical_name: &str,
        key: &BTreeMap<String, Value>,
    ) -> CrmResult<Option<Uuid>> {
        let declared = self.keys.get(logical_name).map(Vec::as_slice).unwrap_or(&[]);
        let Some(decl) = declared.iter().find(|k| {
            k.attributes.len() == key.len() && k.attributes.iter().all(|a| key.contains_key(a))
        }) else {
            return Err(CrmError::KeyNotDeclared {
                entity: logical_name.to_string(),
            });
        };
        let Some(table) = self.tables.get(logical_name) else {
            return Ok(None);
        };
        let Some(index) = table.indexes.iter().find(|i| i.name() == decl.name) else {
            return Ok(None);
        };
        Ok(index.tuple_from(key).and_then(|t| index.lookup(&t)))
    }

    /// Resolve alternate-key values to an id.
    pub fn resolve_alternate_key(
        &self,
        logical_name: &str,
        key: &BTreeMap<String, Value>,
    ) -> CrmResult<Uuid> {
        self.find_by_key(logical_name, key)?
            .ok_or_else(|| CrmError::KeyValuesNotFound {
                entity: logical_name.to_string(),
            })
    }
}

/// Thread-safe record store.
///
/// # Example
///
/// ```ignore
/// use memcrm_storage::RecordStore;
///
/// let store = RecordStore::from_catalog(&Catalog::standard());
/// let id = store.write(|t| t.insert(record))?;
/// let copy = store.get("account", id);
/// ```
#[derive(Debug, Default)]
pub struct RecordStore {
    inner: RwLock<Tables>,
}

impl RecordStore {
    /// Empty store without alternate keys.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty store with the alternate keys declared in a catalog.
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let keys = catalog
            .entities()
            .filter(|e| !e.alternate_keys.is_empty())
            .map(|e| (e.logical_name.clone(), e.alternate_keys.clone()));
        Self {
            inner: RwLock::new(Tables::with_keys(keys)),
        }
    }

    /// Run a closure under the shared lock.
    pub fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> R {
        let guard = self.inner.read();
        f(&guard)
    }

    /// Run a closure under the exclusive lock.
    pub fn write<R>(&self, f: impl FnOnce(&mut Tables) -> R) -> R {
        let mut guard = self.inner.write();
        f(&mut guard)
    }

    /// Clone of a record.
    pub fn get(&self, logical_name: &str, id: Uuid) -> Option<Record> {
        self.read(|t| t.get(logical_name, id))
    }

    /// Insert or replace a record.
    pub fn put(&self, record: Record) -> CrmResult<u64> {
        self.write(|t| t.put(record))
    }

    /// Insert a new record.
    pub fn insert(&self, record: Record) -> CrmResult<u64> {
        self.write(|t| t.insert(record))
    }

    /// Remove a record.
    pub fn delete(&self, logical_name: &str, id: Uuid) -> Option<Record> {
        self.write(|t| t.delete(logical_name, id))
    }

    /// Clones of every record of a type.
    pub fn scan(&self, logical_name: &str) -> Vec<Record> {
        self.read(|t| t.scan(logical_name))
    }

    /// Number of records of a type.
    pub fn count(&self, logical_name: &str) -> usize {
        self.read(|t| t.count(logical_name))
    }

    /// Resolve alternate-key values to an id.
    pub fn resolve_alternate_key(
        &self,
        logical_name: &str,
        key: &BTreeMap<String, Value>,
    ) -> CrmResult<Uuid> {
        self.read(|t| t.resolve_alternate_key(logical_name, key))
    }

    /// Current store version.
    pub fn version(&self) -> u64 {
        self.read(Tables::version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn setup() -> RecordStore {
        RecordStore::from_catalog(&Catalog::standard())
    }

    fn account(name: &str) -> Record {
        Record::with_id("account", Uuid::new_v4()).with("name", name)
    }

    #[test]
    fn test_insert_and_get() {
        let store = setup();
        let record = account("Contoso");
        let id = record.id;
        store.insert(record).unwrap();

        let copy = store.get("account", id).unwrap();
        assert_eq!(copy.string("name"), Some("Contoso"));
        assert_eq!(copy.version, 1);
    }

    #[test]
    fn test_clear_keeps_keys() {
        let store = setup();
        store.insert(account("Gone").with("accountnumber", "A1")).unwrap();
        store.write(Tables::clear);
        assert_eq!(store.count("account"), 0);

        let again = account("Back").with("accountnumber", "A1");
        store.insert(again.clone()).unwrap();
        let err = store.insert(account("Clash").with("accountnumber", "a1")).unwrap_err();
        assert!(matches!(err, CrmError::DuplicateKeyValues { .. }));
    }

    #[test]
    fn test_insert_duplicate_id_fails() {
        let store = setup();
        let record = account("Contoso");
        store.insert(record.clone()).unwrap();
        let err = store.insert(record).unwrap_err();
        assert_eq!(err.to_string(), "Cannot insert duplicate key.");
    }

    #[test]
    fn test_returned_records_are_copies() {
        let store = setup();
        let record = account("Contoso");
        let id = record.id;
        store.insert(record).unwrap();

        let mut copy = store.get("account", id).unwrap();
        copy.set("name", "Changed");
        assert_eq!(
            store.get("account", id).unwrap().string("name"),
            Some("Contoso")
        );
    }

    #[test]
    fn test_scan_keeps_insertion_order() {
        let store = setup();
        let names = ["c", "a", "b"];
        let mut ids = Vec::new();
        for n in names {
            let r = account(n);
            ids.push(r.id);
            store.insert(r).unwrap();
        }
        // Replacing keeps the original position
        let mut first = store.get("account", ids[0]).unwrap();
        first.set("name", "z");
        store.put(first).unwrap();

        let scanned: Vec<Uuid> = store.scan("account").iter().map(|r| r.id).collect();
        assert_eq!(scanned, ids);
        assert_eq!(store.count("account"), 3);
    }

    #[test]
    fn test_delete() {
        let store = setup();
        let record = account("Contoso");
        let id = record.id;
        store.insert(record).unwrap();
        assert!(store.delete("account", id).is_some());
        assert!(store.get("account", id).is_none());
        assert!(store.delete("account", id).is_none());
        assert_eq!(store.count("account"), 0);
    }

    #[test]
    fn test_resolve_alternate_key() {
        let store = setup();
        let record = account("Contoso").with("accountnumber", "ACC-1");
        let id = record.id;
        store.insert(record).unwrap();

        let mut key = BTreeMap::new();
        key.insert("accountnumber".to_string(), Value::from("acc-1"));
        assert_eq!(store.resolve_alternate_key("account", &key).unwrap(), id);

        key.insert("accountnumber".to_string(), Value::from("missing"));
        assert_eq!(
            store.resolve_alternate_key("account", &key).unwrap_err().to_string(),
            "A record with the specified key values does not exist in account entity"
        );

        let mut bad = BTreeMap::new();
        bad.insert("name".to_string(), Value::from("Contoso"));
        assert_eq!(
            store.resolve_alternate_key("account", &bad).unwrap_err().to_string(),
            "The requested key attributes do not exist for the entity account"
        );
    }

    #[test]
    fn test_key_follows_updates() {
        let store = setup();
        let record = account("Contoso").with("accountnumber", "OLD");
        let id = record.id;
        store.insert(record).unwrap();

        let mut updated = store.get("account", id).unwrap();
        updated.set("accountnumber", "NEW");
        store.put(updated).unwrap();

        let mut key = BTreeMap::new();
        key.insert("accountnumber".to_string(), Value::from("old"));
        assert!(store.read(|t| t.find_by_key("account", &key)).unwrap().is_none());
        key.insert("accountnumber".to_string(), Value::from("new"));
        assert_eq!(store.resolve_alternate_key("account", &key).unwrap(), id);
    }

    #[test]
    fn test_duplicate_key_rejected_without_side_effects() {
        let store = setup();
        store
            .insert(account("A").with("accountnumber", "K1"))
            .unwrap();
        let version = store.version();
        let err = store
            .insert(account("B").with("accountnumber", "k1"))
            .unwrap_err();
        assert!(matches!(err, CrmError::DuplicateKeyValues { .. }));
        assert_eq!(store.count("account"), 1);
        assert_eq!(store.version(), version);
    }

    #[test]
    fn test_concurrent_writers_and_readers() {
        use std::thread;

        let store = Arc::new(setup());
        let writers: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..50 {
                        store.insert(account(&format!("a{}", i))).unwrap();
                    }
                })
            })
            .collect();
        let reader = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..50 {
                    // A scan never observes a half-applied write
                    store.read(|t| assert_eq!(t.scan("account").len(), t.count("account")));
                }
            })
        };

        for h in writers {
            h.join().unwrap();
        }
        reader.join().unwrap();
        assert_eq!(store.count("account"), 400);
    }
}
