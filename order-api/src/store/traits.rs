//! OrderStore trait definition.
//!
//! Handlers work against this trait; [`KvOrderStore`](super::KvOrderStore)
//! implements it over any [`KvStore`](super::KvStore).

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::model::Order;

use super::error::Result;

/// One page request for [`OrderStore::find_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FindAllPage {
    /// Maximum number of index entries to visit in this step.
    pub size: u64,
    /// Cursor returned by the previous call, `0` for the first page.
    pub offset: u64,
}

/// One page of orders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindResults {
    pub orders: Vec<Order>,
    /// Cursor for the next call, `0` once every order has been visited.
    pub cursor: u64,
}

/// Repository for orders.
///
/// Every operation takes a cancellation token; once it fires the operation
/// returns [`StoreError::Cancelled`](super::StoreError::Cancelled) instead of
/// a result.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Store a new order. Fails with `AlreadyExists` if its id is taken.
    async fn insert(&self, order: &Order, cancel: &CancellationToken) -> Result<()>;

    /// Fetch an order. Fails with `NotFound` if absent.
    async fn find_by_id(&self, id: u64, cancel: &CancellationToken) -> Result<Order>;

    /// Replace an existing order. Fails with `NotFound` if absent; never creates.
    async fn update(&self, order: &Order, cancel: &CancellationToken) -> Result<()>;

    /// Remove an order. Fails with `NotFound` if absent.
    async fn delete_by_id(&self, id: u64, cancel: &CancellationToken) -> Result<()>;

    /// Fetch one page of orders in index scan order.
    ///
    /// A page may be empty while the cursor is still non-zero; callers loop
    /// until the cursor is `0`.
    async fn find_all(&self, page: FindAllPage, cancel: &CancellationToken)
    -> Result<FindResults>;
}
