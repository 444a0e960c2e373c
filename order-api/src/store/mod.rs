//! Order repository over a key-value store.
//!
//! This module maps the `Order` entity onto key-value primitives, allowing
//! handlers to work with domain objects instead of keys, sets and cursors.
//!
//! # Architecture
//!
//! ```text
//! handlers.rs → Arc<dyn OrderStore>
//!                     ↓
//!               KvOrderStore                      // codec, guards, pagination
//!                     ↓
//!               Arc<dyn KvStore>                  // MemoryKv | RedbKv
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use order_api::store::{KvOrderStore, MemoryKv, OrderStore, FindAllPage};
//! use tokio_util::sync::CancellationToken;
//!
//! let store = KvOrderStore::new(Arc::new(MemoryKv::new()));
//! let cancel = CancellationToken::new();
//!
//! store.insert(&order, &cancel).await?;
//! let page = store.find_all(FindAllPage { size: 50, offset: 0 }, &cancel).await?;
//! ```

pub mod cancel;
pub mod codec;
mod error;
pub mod kv;
mod kv_store;
mod memory;
mod redb_kv;
mod traits;

pub use cancel::Deadline;
pub use error::{Result, StoreError};
pub use kv::{Batch, BatchOutcome, KvError, KvStore, ScanStep};
pub use kv_store::KvOrderStore;
pub use memory::MemoryKv;
pub use redb_kv::RedbKv;
pub use traits::*;
