//! Persistent key-value backend on an embedded redb database.
//!
//! Sets are stored as two tables: members keyed by `(set, seq)` for ordered
//! scanning, and a reverse index `(set, member) -> seq` for membership checks.
//! Each set's last assigned sequence number lives in `set_sequences` and is
//! never reused.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableTable, Table, TableDefinition, WriteTransaction};
use tracing::debug;

use super::kv::{
    Batch, BatchOutcome, KvError, KvResult, KvStore, Op, ScanStep, pattern_matches,
};

const TABLE_STRINGS: TableDefinition<&str, &str> = TableDefinition::new("strings");
const TABLE_SET_MEMBERS: TableDefinition<(&str, u64), &str> = TableDefinition::new("set_members");
const TABLE_SET_INDEX: TableDefinition<(&str, &str), u64> = TableDefinition::new("set_index");
const TABLE_SET_SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("set_sequences");

impl From<redb::Error> for KvError {
    fn from(e: redb::Error) -> Self {
        KvError::Backend(e.to_string())
    }
}

/// Tables of one write transaction.
struct Tables<'txn> {
    strings: Table<'txn, &'static str, &'static str>,
    members: Table<'txn, (&'static str, u64), &'static str>,
    index: Table<'txn, (&'static str, &'static str), u64>,
    sequences: Table<'txn, &'static str, u64>,
}

impl<'txn> Tables<'txn> {
    fn open(txn: &'txn WriteTransaction) -> Result<Self, redb::Error> {
        Ok(Self {
            strings: txn.open_table(TABLE_STRINGS)?,
            members: txn.open_table(TABLE_SET_MEMBERS)?,
            index: txn.open_table(TABLE_SET_INDEX)?,
            sequences: txn.open_table(TABLE_SET_SEQUENCES)?,
        })
    }

    /// Apply one op. Returns whether its condition held (guards) or whether it
    /// changed anything (set ops).
    fn apply(&mut self, op: &Op) -> Result<bool, redb::Error> {
        match op {
            Op::SetNx { key, value } => {
                if self.strings.get(key.as_str())?.is_some() {
                    return Ok(false);
                }
                self.strings.insert(key.as_str(), value.as_str())?;
                Ok(true)
            }
            Op::SetXx { key, value } => {
                if self.strings.get(key.as_str())?.is_none() {
                    return Ok(false);
                }
                self.strings.insert(key.as_str(), value.as_str())?;
                Ok(true)
            }
            Op::Del { key } => Ok(self.strings.remove(key.as_str())?.is_some()),
            Op::SAdd { set, member } => self.sadd(set, member),
            Op::SRem { set, member } => self.srem(set, member),
        }
    }

    fn sadd(&mut self, set: &str, member: &str) -> Result<bool, redb::Error> {
        if self.index.get((set, member))?.is_some() {
            return Ok(false);
        }
        let seq = self.sequences.get(set)?.map(|g| g.value()).unwrap_or(0) + 1;
        self.sequences.insert(set, seq)?;
        self.members.insert((set, seq), member)?;
        self.index.insert((set, member), seq)?;
        Ok(true)
    }

    fn srem(&mut self, set: &str, member: &str) -> Result<bool, redb::Error> {
        let seq = match self.index.remove((set, member))? {
            Some(guard) => guard.value(),
            None => return Ok(false),
        };
        self.members.remove((set, seq))?;
        Ok(true)
    }
}

/// Key-value store persisted in `<data_dir>/orders.redb`.
#[derive(Clone)]
pub struct RedbKv {
    db: Arc<Database>,
}

impl RedbKv {
    pub fn open(data_dir: impl AsRef<Path>) -> KvResult<Self> {
        let db_path = data_dir.as_ref().join("orders.redb");
        let db = Database::create(&db_path).map_err(redb::Error::from)?;

        let txn = db.begin_write().map_err(redb::Error::from)?;
        Tables::open(&txn)?;
        txn.commit().map_err(redb::Error::from)?;

        debug!("Opened redb store at {}", db_path.display());
        Ok(Self { db: Arc::new(db) })
    }

    /// Run `f` against the database on the blocking pool.
    async fn blocking<T, F>(&self, f: F) -> KvResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T, redb::Error> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| KvError::Task(e.to_string()))?
            .map_err(KvError::from)
    }

    /// Apply a single op in its own transaction.
    async fn write_one(&self, op: Op) -> KvResult<bool> {
        self.blocking(move |db| {
            let txn = db.begin_write()?;
            let applied = Tables::open(&txn)?.apply(&op)?;
            txn.commit()?;
            Ok(applied)
        })
        .await
    }
}

#[async_trait]
impl KvStore for RedbKv {
    async fn get(&self, key: &str) -> KvResult<Option<String>> {
        let key = key.to_string();
        self.blocking(move |db| {
            let txn = db.begin_read()?;
            let strings = txn.open_table(TABLE_STRINGS)?;
            Ok(strings.get(key.as_str())?.map(|v| v.value().to_string()))
        })
        .await
    }

    async fn set_nx(&self, key: &str, value: &str) -> KvResult<bool> {
        self.write_one(Op::SetNx {
            key: key.to_string(),
            value: value.to_string(),
        })
        .await
    }

    async fn set_xx(&self, key: &str, value: &str) -> KvResult<bool> {
        self.write_one(Op::SetXx {
            key: key.to_string(),
            value: value.to_string(),
        })
        .await
    }

    async fn del(&self, key: &str) -> KvResult<bool> {
        self.write_one(Op::Del {
            key: key.to_string(),
        })
        .await
    }

    async fn sadd(&self, set: &str, member: &str) -> KvResult<bool> {
        self.write_one(Op::SAdd {
            set: set.to_string(),
            member: member.to_string(),
        })
        .await
    }

    async fn srem(&self, set: &str, member: &str) -> KvResult<bool> {
        self.write_one(Op::SRem {
            set: set.to_string(),
            member: member.to_string(),
        })
        .await
    }

    async fn sscan(
        &self,
        set: &str,
        cursor: u64,
        pattern: Option<&str>,
        count: usize,
    ) -> KvResult<ScanStep> {
        let set = set.to_string();
        let pattern = pattern.map(str::to_string);
        let count = count.max(1);

        self.blocking(move |db| {
            let txn = db.begin_read()?;
            let members = txn.open_table(TABLE_SET_MEMBERS)?;
            let mut step = ScanStep::default();
            let mut visited = 0;

            for item in members.range((set.as_str(), cursor)..=(set.as_str(), u64::MAX))? {
                let (key, member) = item?;
                if visited == count {
                    step.cursor = key.value().1;
                    break;
                }
                visited += 1;
                let member = member.value();
                if pattern_matches(pattern.as_deref(), member) {
                    step.members.push(member.to_string());
                }
            }
            Ok(step)
        })
        .await
    }

    async fn mget(&self, keys: &[String]) -> KvResult<Vec<Option<String>>> {
        let keys = keys.to_vec();
        self.blocking(move |db| {
            let txn = db.begin_read()?;
            let strings = txn.open_table(TABLE_STRINGS)?;
            let mut values = Vec::with_capacity(keys.len());
            for key in &keys {
                values.push(strings.get(key.as_str())?.map(|v| v.value().to_string()));
            }
            Ok(values)
        })
        .await
    }

    async fn exec(&self, batch: Batch) -> KvResult<BatchOutcome> {
        let ops = batch.into_ops();
        self.blocking(move |db| {
            let txn = db.begin_write()?;
            let failed = {
                let mut tables = Tables::open(&txn)?;
                let mut failed = None;
                for (index, op) in ops.iter().enumerate() {
                    if !tables.apply(op)? && op.is_guard() {
                        failed = Some(index);
                        break;
                    }
                }
                failed
            };

            match failed {
                Some(index) => {
                    txn.abort()?;
                    Ok(BatchOutcome::Aborted { index })
                }
                None => {
                    txn.commit()?;
                    Ok(BatchOutcome::Committed)
                }
            }
        })
        .await
    }
}
