pub mod audit;
pub mod ids;
pub mod model;
pub mod rest;
pub mod store;

pub use audit::{OrderAuditLogger, create_audit_logger};
pub use ids::{IdGenerator, RandomIds, SequentialIds};
pub use model::{LineItem, Order};
pub use store::{KvOrderStore, KvStore, MemoryKv, OrderStore, RedbKv, StoreError};
