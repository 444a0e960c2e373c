//! In-process key-value backend.
//!
//! Nothing is persisted. Used by `--dev` mode and by tests.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::kv::{Batch, BatchOutcome, KvResult, KvStore, Op, ScanStep, pattern_matches};

/// Members of one set, numbered in insertion order.
#[derive(Debug, Default)]
struct MemberSet {
    last_seq: u64,
    by_seq: BTreeMap<u64, String>,
    by_member: HashMap<String, u64>,
}

impl MemberSet {
    fn insert(&mut self, member: &str) -> bool {
        if self.by_member.contains_key(member) {
            return false;
        }
        self.last_seq += 1;
        self.by_seq.insert(self.last_seq, member.to_string());
        self.by_member.insert(member.to_string(), self.last_seq);
        true
    }

    fn remove(&mut self, member: &str) -> bool {
        match self.by_member.remove(member) {
            Some(seq) => {
                self.by_seq.remove(&seq);
                true
            }
            None => false,
        }
    }

    fn scan(&self, cursor: u64, pattern: Option<&str>, count: usize) -> ScanStep {
        let count = count.max(1);
        let mut step = ScanStep::default();
        let mut visited = 0;

        for (seq, member) in self.by_seq.range(cursor..) {
            if visited == count {
                step.cursor = *seq;
                break;
            }
            visited += 1;
            if pattern_matches(pattern, member) {
                step.members.push(member.clone());
            }
        }
        step
    }
}

#[derive(Debug, Default)]
struct Inner {
    strings: HashMap<String, String>,
    sets: HashMap<String, MemberSet>,
}

impl Inner {
    fn sadd(&mut self, set: &str, member: &str) -> bool {
        self.sets.entry(set.to_string()).or_default().insert(member)
    }

    fn srem(&mut self, set: &str, member: &str) -> bool {
        let Some(members) = self.sets.get_mut(set) else {
            return false;
        };
        let removed = members.remove(member);
        if members.by_member.is_empty() {
            self.sets.remove(set);
        }
        removed
    }

    /// Index of the first guard in `ops` whose condition fails, replaying
    /// earlier ops' effect on key existence.
    fn failed_guard(&self, ops: &[Op]) -> Option<usize> {
        let mut overlay: HashMap<&str, bool> = HashMap::new();
        for (index, op) in ops.iter().enumerate() {
            let key = match op {
                Op::SetNx { key, .. } | Op::SetXx { key, .. } | Op::Del { key } => key.as_str(),
                Op::SAdd { .. } | Op::SRem { .. } => continue,
            };
            let exists = overlay
                .get(key)
                .copied()
                .unwrap_or_else(|| self.strings.contains_key(key));
            match op {
                Op::SetNx { .. } if exists => return Some(index),
                Op::SetNx { .. } => {
                    overlay.insert(key, true);
                }
                Op::SetXx { .. } if !exists => return Some(index),
                Op::Del { .. } if !exists => return Some(index),
                Op::Del { .. } => {
                    overlay.insert(key, false);
                }
                _ => {}
            }
        }
        None
    }

    fn apply(&mut self, op: Op) {
        match op {
            Op::SetNx { key, value } | Op::SetXx { key, value } => {
                self.strings.insert(key, value);
            }
            Op::Del { key } => {
                self.strings.remove(&key);
            }
            Op::SAdd { set, member } => {
                self.sadd(&set, &member);
            }
            Op::SRem { set, member } => {
                self.srem(&set, &member);
            }
        }
    }
}

/// Key-value store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryKv {
    inner: RwLock<Inner>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> KvResult<Option<String>> {
        Ok(self.inner.read().await.strings.get(key).cloned())
    }

    async fn set_nx(&self, key: &str, value: &str) -> KvResult<bool> {
        let mut inner = self.inner.write().await;
        if inner.strings.contains_key(key) {
            return Ok(false);
        }
        inner.strings.insert(key.to_string(), value.to_string());
        Ok(true)
    }

    async fn set_xx(&self, key: &str, value: &str) -> KvResult<bool> {
        let mut inner = self.inner.write().await;
        match inner.strings.get_mut(key) {
            Some(existing) => {
                *existing = value.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn del(&self, key: &str) -> KvResult<bool> {
        Ok(self.inner.write().await.strings.remove(key).is_some())
    }

    async fn sadd(&self, set: &str, member: &str) -> KvResult<bool> {
        Ok(self.inner.write().await.sadd(set, member))
    }

    async fn srem(&self, set: &str, member: &str) -> KvResult<bool> {
        Ok(self.inner.write().await.srem(set, member))
    }

    async fn sscan(
        &self,
        set: &str,
        cursor: u64,
        pattern: Option<&str>,
        count: usize,
    ) -> KvResult<ScanStep> {
        let inner = self.inner.read().await;
        Ok(inner
            .sets
            .get(set)
            .map(|members| members.scan(cursor, pattern, count))
            .unwrap_or_default())
    }

    async fn mget(&self, keys: &[String]) -> KvResult<Vec<Option<String>>> {
        let inner = self.inner.read().await;
        Ok(keys.iter().map(|k| inner.strings.get(k).cloned()).collect())
    }

    async fn exec(&self, batch: Batch) -> KvResult<BatchOutcome> {
        let mut inner = self.inner.write().await;
        if let Some(index) = inner.failed_guard(batch.ops()) {
            return Ok(BatchOutcome::Aborted { index });
        }
        for op in batch.into_ops() {
            inner.apply(op);
        }
        Ok(BatchOutcome::Committed)
    }
}
