//! Series store backed by redb.
//!
//! One store per tier process. Writes are single-row puts; reads are bounded
//! reverse range scans that page backwards through one entity's rows. The
//! store is the point of truth for "a post exists", so writes are buffered
//! for latency but every Nth commit is forced durable, bounding the loss
//! window after a crash to N-1 acknowledged writes.

use crate::tables;
use fanline_common::config::StoreConfig;
use fanline_common::Error;
use fanline_shard::{RowKey, RowKeyError};
use parking_lot::Mutex;
use redb::{Database, Durability, ReadableTable};
use std::path::Path;
use tracing::debug;

/// Error type for series store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::DatabaseError),
    #[error("redb storage error: {0}")]
    Storage(#[from] redb::StorageError),
    #[error("redb table error: {0}")]
    Table(#[from] redb::TableError),
    #[error("redb transaction error: {0}")]
    Transaction(Box<redb::TransactionError>),
    #[error("redb commit error: {0}")]
    Commit(#[from] redb::CommitError),
    #[error("row key error: {0}")]
    RowKey(#[from] RowKeyError),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<redb::TransactionError> for StoreError {
    fn from(e: redb::TransactionError) -> Self {
        Self::Transaction(Box::new(e))
    }
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InvalidArgument(msg) => Self::InvalidArgument(msg),
            other => Self::Storage(other.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Default)]
struct WriteCounters {
    written: u64,
    synced: u64,
}

/// Ordered post storage for one tier node.
pub struct SeriesStore {
    db: Database,
    writes: Mutex<WriteCounters>,
    // Reads keep their own lock so query throughput never serializes
    // behind the write path.
    reads: Mutex<u64>,
    sync_every: u64,
}

impl SeriesStore {
    /// Open (or create) the store at the given path.
    pub fn open(path: impl AsRef<Path>, config: &StoreConfig) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut builder = Database::builder();
        if let Some(cache_mb) = config.cache_mb {
            builder.set_cache_size(cache_mb * 1024 * 1024);
        }
        let db = builder.create(path)?;

        // Create the table eagerly so later read txns don't fail
        let write_txn = db.begin_write()?;
        {
            let _t = write_txn.open_table(tables::SERIES)?;
        }
        write_txn.commit()?;

        Ok(Self {
            db,
            writes: Mutex::new(WriteCounters::default()),
            reads: Mutex::new(0),
            sync_every: config.sync_every.max(1),
        })
    }

    /// Record that a post exists: one row under `{entity_id, sequence_id}`,
    /// empty value.
    ///
    /// Most writes commit unsynced; every `sync_every`-th write commits with
    /// a forced sync before it is acknowledged.
    pub fn create(&self, entity_id: i64, sequence_id: i64) -> StoreResult<()> {
        let key = RowKey::new(entity_id, sequence_id).encode();

        let durability = {
            let mut writes = self.writes.lock();
            writes.written += 1;
            if writes.written % self.sync_every == 0 {
                writes.synced += 1;
                Durability::Immediate
            } else {
                Durability::None
            }
        };

        let mut txn = self.db.begin_write()?;
        txn.set_durability(durability);
        {
            let mut table = txn.open_table(tables::SERIES)?;
            table.insert(key.as_slice(), b"".as_slice())?;
        }
        txn.commit()?;
        if matches!(durability, Durability::Immediate) {
            debug!(entity_id, sequence_id, "synced write batch");
        }
        Ok(())
    }

    /// Collect up to `limit` of `entity_id`'s sequence ids strictly before
    /// `before_sequence_id`, newest first.
    ///
    /// The scan starts at `{entity_id, before_sequence_id - 1}` and walks
    /// toward older rows, stopping at the first row of a different entity;
    /// entity-major key order keeps each entity's rows contiguous, so
    /// nothing past that row can match.
    pub fn query(
        &self,
        entity_id: i64,
        before_sequence_id: i64,
        limit: usize,
    ) -> StoreResult<Vec<i64>> {
        if before_sequence_id <= 0 {
            return Err(StoreError::InvalidArgument(
                "non-positive post id is not a valid post".to_string(),
            ));
        }
        let pivot = RowKey::new(entity_id, before_sequence_id - 1).encode();

        let txn = self.db.begin_read()?;
        let table = txn.open_table(tables::SERIES)?;
        let mut posts = Vec::with_capacity(limit.min(128));
        for entry in table.range(..=pivot.as_slice())?.rev() {
            if posts.len() >= limit {
                break;
            }
            let (raw, _) = entry?;
            let row = RowKey::decode(raw.value())?;
            if row.entity_id != entity_id {
                break;
            }
            posts.push(row.sequence_id);
        }

        *self.reads.lock() += 1;
        Ok(posts)
    }

    /// Total writes accepted since open
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.writes.lock().written
    }

    /// Writes committed with a forced sync since open
    #[must_use]
    pub fn synced_count(&self) -> u64 {
        self.writes.lock().synced
    }

    /// Successful queries since open
    #[must_use]
    pub fn read_count(&self) -> u64 {
        *self.reads.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store(dir: &TempDir, sync_every: u64) -> SeriesStore {
        let config = StoreConfig {
            sync_every,
            cache_mb: None,
        };
        SeriesStore::open(dir.path().join("series.redb"), &config).unwrap()
    }

    #[test]
    fn test_create_then_query() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, 100);

        for post in [51, 52, 53, 54] {
            store.create(5, post).unwrap();
        }

        let posts = store.query(5, 56, 10).unwrap();
        assert_eq!(posts, vec![54, 53, 52, 51]);
    }

    #[test]
    fn test_query_rejects_non_positive_pivot() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, 100);
        store.create(5, 54).unwrap();

        assert!(matches!(
            store.query(5, 0, 10),
            Err(StoreError::InvalidArgument(_))
        ));
        assert!(matches!(
            store.query(5, -3, 10),
            Err(StoreError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_query_never_crosses_entities() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, 100);

        for post in [51, 52, 53, 54] {
            store.create(5, post).unwrap();
        }
        store.create(7, 99).unwrap();

        let posts = store.query(5, 56, 10).unwrap();
        assert_eq!(posts, vec![54, 53, 52, 51]);

        // Entity 7 sees only its own row even when the scan pivot is far
        // above anything stored for it.
        let posts = store.query(7, 1000, 10).unwrap();
        assert_eq!(posts, vec![99]);
    }

    #[test]
    fn test_query_respects_limit_and_pivot() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, 100);

        for post in [51, 52, 53, 54] {
            store.create(5, post).unwrap();
        }

        assert_eq!(store.query(5, 56, 2).unwrap(), vec![54, 53]);
        // Pivot excludes the pivot post itself
        assert_eq!(store.query(5, 54, 10).unwrap(), vec![53, 52, 51]);
        // Nothing strictly before post 51
        assert_eq!(store.query(5, 1, 10).unwrap(), Vec::<i64>::new());
    }

    #[test]
    fn test_query_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, 100);
        assert_eq!(store.query(5, 56, 10).unwrap(), Vec::<i64>::new());
    }

    #[test]
    fn test_sync_cadence() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, 100);

        for post in 1..=250 {
            store.create(1, post).unwrap();
        }

        // Writes 100 and 200 force a sync; the other 248 stay buffered.
        assert_eq!(store.write_count(), 250);
        assert_eq!(store.synced_count(), 2);
    }

    #[test]
    fn test_read_counter() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, 100);
        store.create(5, 54).unwrap();

        store.query(5, 56, 10).unwrap();
        store.query(5, 56, 10).unwrap();
        // Failed validation does not count as a read
        let _ = store.query(5, 0, 10);

        assert_eq!(store.read_count(), 2);
    }

    #[test]
    fn test_rows_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("series.redb");
        let config = StoreConfig {
            sync_every: 1,
            cache_mb: None,
        };
        {
            let store = SeriesStore::open(&path, &config).unwrap();
            store.create(5, 54).unwrap();
        }
        let store = SeriesStore::open(&path, &config).unwrap();
        assert_eq!(store.query(5, 56, 10).unwrap(), vec![54]);
    }
}
