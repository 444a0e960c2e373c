//! Key-value protocol consumed by the order repository.
//!
//! The repository needs string keys with conditional writes, named sets of
//! strings with incremental scanning, and an atomic batch primitive. Any
//! backend that can offer these implements [`KvStore`]; two ship with the
//! crate: [`MemoryKv`](super::MemoryKv) and [`RedbKv`](super::RedbKv).
//!
//! # Batches
//!
//! A [`Batch`] commits all-or-nothing. `SetNx`, `SetXx` and `Del` act as
//! guards: when the existence condition of any guard fails, no op of the batch
//! is applied and [`BatchOutcome::Aborted`] names the first failing op. Guards
//! see the effects of earlier ops in the same batch.
//!
//! # Scanning
//!
//! Set members are numbered in the order they were added. A scan cursor is the
//! next number to visit; `0` starts a scan and a returned `0` ends it. One step
//! visits at most `count` members and only then applies the pattern, so a step
//! may legitimately return no members while the scan is still running.

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by a key-value backend.
///
/// Logical misses (absent key, existing key) are not errors; they are reported
/// through return values.
#[derive(Debug, Error)]
pub enum KvError {
    #[error("backend error: {0}")]
    Backend(String),

    #[error("backend task failed: {0}")]
    Task(String),
}

pub type KvResult<T> = std::result::Result<T, KvError>;

/// A single write inside a [`Batch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// Write `value` only if `key` is absent. Guard.
    SetNx { key: String, value: String },
    /// Write `value` only if `key` is present. Guard.
    SetXx { key: String, value: String },
    /// Remove `key`, which must exist. Guard.
    Del { key: String },
    /// Add `member` to `set`.
    SAdd { set: String, member: String },
    /// Remove `member` from `set`.
    SRem { set: String, member: String },
}

impl Op {
    pub fn is_guard(&self) -> bool {
        matches!(self, Op::SetNx { .. } | Op::SetXx { .. } | Op::Del { .. })
    }
}

/// An ordered group of writes committed atomically by [`KvStore::exec`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    ops: Vec<Op>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_nx(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.ops.push(Op::SetNx {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn set_xx(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.ops.push(Op::SetXx {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn del(mut self, key: impl Into<String>) -> Self {
        self.ops.push(Op::Del { key: key.into() });
        self
    }

    pub fn sadd(mut self, set: impl Into<String>, member: impl Into<String>) -> Self {
        self.ops.push(Op::SAdd {
            set: set.into(),
            member: member.into(),
        });
        self
    }

    pub fn srem(mut self, set: impl Into<String>, member: impl Into<String>) -> Self {
        self.ops.push(Op::SRem {
            set: set.into(),
            member: member.into(),
        });
        self
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<Op> {
        self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Result of [`KvStore::exec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Every op was applied.
    Committed,
    /// The guard at `index` failed; nothing was applied.
    Aborted { index: usize },
}

/// One step of an incremental set scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStep {
    pub members: Vec<String>,
    /// Cursor for the next step, `0` once the scan is complete.
    pub cursor: u64,
}

/// Key-value and set store.
///
/// Implementations are shared process-wide behind an `Arc` and must be safe to
/// call concurrently. Single-key operations are atomic.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a string key.
    async fn get(&self, key: &str) -> KvResult<Option<String>>;

    /// Write `key` if absent. Returns whether the write happened.
    async fn set_nx(&self, key: &str, value: &str) -> KvResult<bool>;

    /// Write `key` if present. Returns whether the write happened.
    async fn set_xx(&self, key: &str, value: &str) -> KvResult<bool>;

    /// Remove `key`. Returns whether a key was removed.
    async fn del(&self, key: &str) -> KvResult<bool>;

    /// Add `member` to `set`. Returns whether it was newly added.
    async fn sadd(&self, set: &str, member: &str) -> KvResult<bool>;

    /// Remove `member` from `set`. Returns whether it was present.
    async fn srem(&self, set: &str, member: &str) -> KvResult<bool>;

    /// Scan one step of `set` starting at `cursor`.
    ///
    /// Visits at most `count` members (a `count` of 0 is treated as 1) and
    /// returns those matching `pattern`. `None` matches everything.
    async fn sscan(
        &self,
        set: &str,
        cursor: u64,
        pattern: Option<&str>,
        count: usize,
    ) -> KvResult<ScanStep>;

    /// Read many string keys; the result is aligned with `keys`.
    async fn mget(&self, keys: &[String]) -> KvResult<Vec<Option<String>>>;

    /// Apply `batch` atomically.
    async fn exec(&self, batch: Batch) -> KvResult<BatchOutcome>;
}

/// Whether `member` passes an optional scan pattern.
pub(crate) fn pattern_matches(pattern: Option<&str>, member: &str) -> bool {
    match pattern {
        None | Some("*") => true,
        Some(p) => glob_match(p, member),
    }
}

/// Glob matching with `*` (any run) and `?` (any single char).
pub fn glob_match(pattern: &str, candidate: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let s: Vec<char> = candidate.chars().collect();
    let (mut pi, mut si) = (0, 0);
    // Position of the last `*` and the candidate index it is currently absorbing up to.
    let mut star: Option<(usize, usize)> = None;

    while si < s.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == s[si]) {
            pi += 1;
            si += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, si));
            pi += 1;
        } else if let Some((star_pi, star_si)) = star {
            pi = star_pi + 1;
            si = star_si + 1;
            star = Some((star_pi, star_si + 1));
        } else {
            return false;
        }
    }

    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}
