//! KvOrderStore implementation - maps orders onto a KvStore.
//!
//! Insert and delete are single conditional batches: the existence guard on
//! the primary key and the index mutation commit together or not at all, so a
//! primary record never exists without its index entry and vice versa.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::model::Order;

use super::cancel::cancellable;
use super::codec::{ORDER_INDEX, decode, encode, key_of};
use super::error::{Result, StoreError};
use super::kv::{Batch, BatchOutcome, KvStore};
use super::traits::{FindAllPage, FindResults, OrderStore};

/// KvOrderStore wraps a shared KvStore handle and implements OrderStore.
pub struct KvOrderStore {
    kv: Arc<dyn KvStore>,
}

impl KvOrderStore {
    /// Create a repository over the process-wide store handle.
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    fn encode_record(op: &'static str, key: &str, order: &Order) -> Result<String> {
        encode(order).map_err(|source| StoreError::Encoding {
            op,
            key: key.to_string(),
            source,
        })
    }

    fn decode_record(op: &'static str, key: &str, value: &str) -> Result<Order> {
        decode(value).map_err(|e| StoreError::CorruptRecord {
            op,
            key: key.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl OrderStore for KvOrderStore {
    async fn insert(&self, order: &Order, cancel: &CancellationToken) -> Result<()> {
        const OP: &str = "insert";
        let key = key_of(order.order_id);
        let data = Self::encode_record(OP, &key, order)?;
        debug!(%key, "Inserting order");

        let batch = Batch::new()
            .set_nx(key.as_str(), data)
            .sadd(ORDER_INDEX, key.as_str());
        let outcome = cancellable(cancel, OP, async {
            self.kv.exec(batch).await.map_err(StoreError::unavailable(OP))
        })
        .await?;

        match outcome {
            BatchOutcome::Committed => Ok(()),
            BatchOutcome::Aborted { .. } => Err(StoreError::AlreadyExists { op: OP, key }),
        }
    }

    async fn find_by_id(&self, id: u64, cancel: &CancellationToken) -> Result<Order> {
        const OP: &str = "find_by_id";
        let key = key_of(id);

        let value = cancellable(cancel, OP, async {
            self.kv.get(&key).await.map_err(StoreError::unavailable(OP))
        })
        .await?;

        match value {
            Some(value) => Self::decode_record(OP, &key, &value),
            None => Err(StoreError::NotFound { op: OP, key }),
        }
    }

    async fn update(&self, order: &Order, cancel: &CancellationToken) -> Result<()> {
        const OP: &str = "update";
        let key = key_of(order.order_id);
        let data = Self::encode_record(OP, &key, order)?;
        debug!(%key, "Updating order");

        let written = cancellable(cancel, OP, async {
            self.kv
                .set_xx(&key, &data)
                .await
                .map_err(StoreError::unavailable(OP))
        })
        .await?;

        if !written {
            return Err(StoreError::NotFound { op: OP, key });
        }
        Ok(())
    }

    async fn delete_by_id(&self, id: u64, cancel: &CancellationToken) -> Result<()> {
        const OP: &str = "delete_by_id";
        let key = key_of(id);
        debug!(%key, "Deleting order");

        // Primary delete is the guard; the index entry goes in the same commit.
        let batch = Batch::new()
            .del(key.as_str())
            .srem(ORDER_INDEX, key.as_str());
        let outcome = cancellable(cancel, OP, async {
            self.kv.exec(batch).await.map_err(StoreError::unavailable(OP))
        })
        .await?;

        match outcome {
            BatchOutcome::Committed => Ok(()),
            BatchOutcome::Aborted { .. } => Err(StoreError::NotFound { op: OP, key }),
        }
    }

    async fn find_all(
        &self,
        page: FindAllPage,
        cancel: &CancellationToken,
    ) -> Result<FindResults> {
        const OP: &str = "find_all";
        let count = usize::try_from(page.size).unwrap_or(usize::MAX).max(1);

        let step = cancellable(cancel, OP, async {
            self.kv
                .sscan(ORDER_INDEX, page.offset, None, count)
                .await
                .map_err(StoreError::unavailable(OP))
        })
        .await?;
        debug!(
            offset = page.offset,
            keys = step.members.len(),
            next = step.cursor,
            "Scanned order index"
        );

        if step.members.is_empty() {
            return Ok(FindResults {
                orders: Vec::new(),
                cursor: step.cursor,
            });
        }

        let values = cancellable(cancel, OP, async {
            self.kv
                .mget(&step.members)
                .await
                .map_err(StoreError::unavailable(OP))
        })
        .await?;

        let mut orders = Vec::with_capacity(values.len());
        for (key, value) in step.members.iter().zip(values) {
            let Some(value) = value else {
                error!(%key, "Order index references a missing record");
                return Err(StoreError::CorruptRecord {
                    op: OP,
                    key: key.clone(),
                    reason: "indexed record is missing".to_string(),
                });
            };
            orders.push(Self::decode_record(OP, key, &value)?);
        }

        Ok(FindResults {
            orders,
            cursor: step.cursor,
        })
    }
}
