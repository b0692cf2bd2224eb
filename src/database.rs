//! Database initialization, table definitions and record access
//!
//! This module handles the setup of the embedded redb database and wraps every
//! read and write of QR records. redb allows a single write transaction at a
//! time, so each mutating method here is atomic with respect to the others.

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::sync::Arc;

use crate::model::QrRecord;

/// Main table for storing QR records
///
/// Key: record id
/// Value: JSON-serialized QrRecord
pub const TABLE_QRS: TableDefinition<&str, &str> = TableDefinition::new("qr_records_v1");

/// Index from short id to record id, consulted on every scan
///
/// Key: short id (e.g. "aZ3kP9qL")
/// Value: record id
pub const TABLE_SHORT_INDEX: TableDefinition<&str, &str> = TableDefinition::new("short_index_v1");

/// Index for listing the records of one owner
///
/// Key: (owner_id, created_at_micros, record_id)
/// Value: record id
///
/// The timestamp in the key keeps entries in creation order. Owner ids are
/// opaque token claims, so they are kept as a separate tuple element rather
/// than joined into a delimited string.
pub const TABLE_OWNER_INDEX: TableDefinition<(&str, i64, &str), &str> =
    TableDefinition::new("owner_index_v2");

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] redb::DatabaseError),

    #[error(transparent)]
    Transaction(#[from] redb::TransactionError),

    #[error(transparent)]
    Table(#[from] redb::TableError),

    #[error(transparent)]
    Storage(#[from] redb::StorageError),

    #[error(transparent)]
    Commit(#[from] redb::CommitError),

    #[error("corrupt record: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("dangling index entry for record {0}")]
    DanglingIndex(String),

    #[error("could not allocate a unique short id")]
    ShortIdExhausted,
}

/// Result of trying to insert a new record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The record id or short id is already in use; nothing was written
    Conflict,
}

/// Initializes the embedded database and creates required tables
///
/// # Arguments
///
/// * `db_path` - File path where the database should be stored (e.g., "qr_studio.db")
///
/// # Example
///
/// ```no_run
/// # use qr_studio::database::init_db;
/// let db = init_db("qr_studio.db").expect("Failed to initialize database");
/// ```
pub fn init_db(db_path: &str) -> Result<Database, StoreError> {
    let db = Database::create(db_path)?;

    let write_txn = db.begin_write()?;
    {
        write_txn.open_table(TABLE_QRS)?;
        write_txn.open_table(TABLE_SHORT_INDEX)?;
        write_txn.open_table(TABLE_OWNER_INDEX)?;
    }
    write_txn.commit()?;

    Ok(db)
}

fn owner_index_key<'a>(
    owner_id: &'a str,
    created_at: DateTime<Utc>,
    id: &'a str,
) -> (&'a str, i64, &'a str) {
    (owner_id, created_at.timestamp_micros(), id)
}

/// Handle to the QR record tables, cheap to clone
#[derive(Clone)]
pub struct QrStore {
    db: Arc<Database>,
}

impl QrStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Inserts a new record together with its index entries.
    ///
    /// Returns [`InsertOutcome::Conflict`] without writing anything if the
    /// record id or short id is already taken.
    pub fn insert(&self, record: &QrRecord) -> Result<InsertOutcome, StoreError> {
        let record_json = serde_json::to_string(record)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table_main = write_txn.open_table(TABLE_QRS)?;
            let mut table_short = write_txn.open_table(TABLE_SHORT_INDEX)?;

            if table_main.get(record.id.as_str())?.is_some()
                || table_short.get(record.short_id.as_str())?.is_some()
            {
                // Dropping the transaction without commit aborts it
                return Ok(InsertOutcome::Conflict);
            }

            table_main.insert(record.id.as_str(), record_json.as_str())?;
            table_short.insert(record.short_id.as_str(), record.id.as_str())?;

            if let Some(owner_id) = &record.owner_id {
                let index_key = owner_index_key(owner_id, record.created_at, &record.id);
                let mut table_owner = write_txn.open_table(TABLE_OWNER_INDEX)?;
                table_owner.insert(index_key, record.id.as_str())?;
            }
        }
        write_txn.commit()?;

        Ok(InsertOutcome::Inserted)
    }

    pub fn short_id_exists(&self, short_id: &str) -> Result<bool, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_SHORT_INDEX)?;
        Ok(table.get(short_id)?.is_some())
    }

    pub fn get(&self, id: &str) -> Result<Option<QrRecord>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_QRS)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_str(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn find_by_short_id(&self, short_id: &str) -> Result<Option<QrRecord>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table_short = read_txn.open_table(TABLE_SHORT_INDEX)?;
        let Some(id) = table_short.get(short_id)?.map(|v| v.value().to_string()) else {
            return Ok(None);
        };

        let table_main = read_txn.open_table(TABLE_QRS)?;
        match table_main.get(id.as_str())? {
            Some(value) => Ok(Some(serde_json::from_str(value.value())?)),
            None => Err(StoreError::DanglingIndex(id)),
        }
    }

    /// Records one scan of `short_id` at `at`.
    ///
    /// Lookup, increment, history append and write all happen inside one write
    /// transaction, so concurrent scans of the same code cannot lose updates.
    /// Returns the updated record, or `None` if the short id is unknown.
    pub fn record_scan(
        &self,
        short_id: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<QrRecord>, StoreError> {
        let write_txn = self.db.begin_write()?;
        let updated = {
            let table_short = write_txn.open_table(TABLE_SHORT_INDEX)?;
            let Some(id) = table_short.get(short_id)?.map(|v| v.value().to_string()) else {
                return Ok(None);
            };

            let mut table_main = write_txn.open_table(TABLE_QRS)?;
            let Some(current) = table_main.get(id.as_str())?.map(|v| v.value().to_string())
            else {
                return Err(StoreError::DanglingIndex(id));
            };

            let mut record: QrRecord = serde_json::from_str(&current)?;
            record.scans += 1;
            record.scan_history.push(at);
            record.updated_at = at;

            let record_json = serde_json::to_string(&record)?;
            table_main.insert(id.as_str(), record_json.as_str())?;
            record
        };
        write_txn.commit()?;

        Ok(Some(updated))
    }

    /// Lists every record owned by `owner_id`, newest first.
    pub fn list_by_owner(&self, owner_id: &str) -> Result<Vec<QrRecord>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table_owner = read_txn.open_table(TABLE_OWNER_INDEX)?;
        let table_main = read_txn.open_table(TABLE_QRS)?;

        // Record ids are ASCII, so every id sorts below U+10FFFF
        let start_key = (owner_id, i64::MIN, "");
        let end_key = (owner_id, i64::MAX, "\u{10FFFF}");

        let mut records = Vec::new();
        for entry in table_owner.range(start_key..=end_key)?.rev() {
            let (_, id) = entry?;
            let id = id.value();
            match table_main.get(id)? {
                Some(value) => records.push(serde_json::from_str::<QrRecord>(value.value())?),
                None => return Err(StoreError::DanglingIndex(id.to_string())),
            }
        }

        Ok(records)
    }

    /// Deletes the record `id` if it belongs to `owner_id`.
    ///
    /// Returns `false` both when the record does not exist and when it is
    /// owned by someone else.
    pub fn delete_owned(&self, id: &str, owner_id: &str) -> Result<bool, StoreError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table_main = write_txn.open_table(TABLE_QRS)?;
            let record = match table_main.get(id)? {
                Some(guard) => serde_json::from_str::<QrRecord>(guard.value())?,
                None => return Ok(false),
            };

            if record.owner_id.as_deref() != Some(owner_id) {
                return Ok(false);
            }

            table_main.remove(id)?;

            let mut table_short = write_txn.open_table(TABLE_SHORT_INDEX)?;
            table_short.remove(record.short_id.as_str())?;

            let index_key = owner_index_key(owner_id, record.created_at, &record.id);
            let mut table_owner = write_txn.open_table(TABLE_OWNER_INDEX)?;
            table_owner.remove(index_key)?;
        }
        write_txn.commit()?;

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::NamedTempFile;

    fn temp_store() -> (QrStore, NamedTempFile) {
        let temp_db = NamedTempFile::new().unwrap();
        let db = init_db(temp_db.path().to_str().unwrap()).unwrap();
        (QrStore::new(Arc::new(db)), temp_db)
    }

    fn record(id: &str, short_id: &str, owner: &str, created_at: DateTime<Utc>) -> QrRecord {
        QrRecord {
            id: id.to_string(),
            owner_id: Some(owner.to_string()),
            title: "Untitled".to_string(),
            target_url: format!("https://example.com/{id}"),
            short_id: short_id.to_string(),
            qr_image: String::new(),
            scans: 0,
            scan_history: vec![],
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn insert_then_find_by_short_id() {
        let (store, _temp) = temp_store();
        let rec = record("r1", "s1", "alice", Utc::now());

        assert_eq!(store.insert(&rec).unwrap(), InsertOutcome::Inserted);
        assert_eq!(store.find_by_short_id("s1").unwrap(), Some(rec.clone()));
        assert_eq!(store.get("r1").unwrap(), Some(rec));
        assert!(store.short_id_exists("s1").unwrap());
        assert!(!store.short_id_exists("s2").unwrap());
    }

    #[test]
    fn duplicate_short_id_is_a_conflict() {
        let (store, _temp) = temp_store();
        store.insert(&record("r1", "same", "alice", Utc::now())).unwrap();

        let outcome = store.insert(&record("r2", "same", "bob", Utc::now())).unwrap();
        assert_eq!(outcome, InsertOutcome::Conflict);
        assert_eq!(store.get("r2").unwrap(), None);
        assert!(store.list_by_owner("bob").unwrap().is_empty());
    }

    #[test]
    fn record_scan_keeps_counter_and_history_in_step() {
        let (store, _temp) = temp_store();
        store.insert(&record("r1", "s1", "alice", Utc::now())).unwrap();

        for expected in 1..=3 {
            let updated = store.record_scan("s1", Utc::now()).unwrap().unwrap();
            assert_eq!(updated.scans, expected);
            assert_eq!(updated.scan_history.len() as u64, expected);
        }

        assert_eq!(store.record_scan("missing", Utc::now()).unwrap(), None);
    }

    #[test]
    fn list_by_owner_is_newest_first_and_scoped() {
        let (store, _temp) = temp_store();
        let now = Utc::now();
        store.insert(&record("old", "s1", "alice", now - Duration::hours(2))).unwrap();
        store.insert(&record("new", "s2", "alice", now)).unwrap();
        store.insert(&record("other", "s3", "alice2", now)).unwrap();

        let ids: Vec<_> = store
            .list_by_owner("alice")
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["new", "old"]);
    }

    #[test]
    fn list_by_owner_ignores_owners_sharing_a_prefix() {
        let (store, _temp) = temp_store();
        let now = Utc::now();
        store.insert(&record("mine", "s1", "alice", now)).unwrap();
        store.insert(&record("theirs", "s2", "alice:x", now)).unwrap();
        store.insert(&record("later", "s3", "alice:x", now + Duration::seconds(1))).unwrap();

        let alice = store.list_by_owner("alice").unwrap();
        assert_eq!(alice.len(), 1);
        assert_eq!(alice[0].id, "mine");

        let ids: Vec<_> = store
            .list_by_owner("alice:x")
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["later", "theirs"]);

        assert!(store.delete_owned("mine", "alice").unwrap());
        assert_eq!(store.list_by_owner("alice:x").unwrap().len(), 2);
    }

    #[test]
    fn delete_owned_checks_owner() {
        let (store, _temp) = temp_store();
        store.insert(&record("r1", "s1", "alice", Utc::now())).unwrap();

        assert!(!store.delete_owned("r1", "mallory").unwrap());
        assert!(!store.delete_owned("nope", "alice").unwrap());
        assert!(store.get("r1").unwrap().is_some());

        assert!(store.delete_owned("r1", "alice").unwrap());
        assert_eq!(store.get("r1").unwrap(), None);
        assert_eq!(store.find_by_short_id("s1").unwrap(), None);
        assert!(store.list_by_owner("alice").unwrap().is_empty());
    }
}
