use std::sync::Arc;
use tracing::info;

/// Order lifecycle audit logger.
///
/// Emits structured events on the `audit` target so they can be routed
/// separately from operational logs.
pub struct OrderAuditLogger {
    enabled: bool,
}

impl OrderAuditLogger {
    pub fn new() -> Self {
        Self { enabled: true }
    }

    pub fn new_noop() -> Self {
        Self { enabled: false }
    }

    pub fn order_created(&self, order_id: u64, customer_id: &str, line_items: usize) {
        if self.enabled {
            info!(
                target: "audit",
                order_id,
                customer_id,
                line_items,
                "Order created"
            );
        }
    }

    pub fn order_updated(&self, order_id: u64) {
        if self.enabled {
            info!(target: "audit", order_id, "Order updated");
        }
    }

    pub fn order_deleted(&self, order_id: u64) {
        if self.enabled {
            info!(target: "audit", order_id, "Order deleted");
        }
    }
}

impl Default for OrderAuditLogger {
    fn default() -> Self {
        Self::new()
    }
}

pub fn create_audit_logger() -> Arc<OrderAuditLogger> {
    Arc::new(OrderAuditLogger::new())
}
