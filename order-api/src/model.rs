//! Order domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub item_id: String,
    pub quantity: u32,
    /// Unit price in minor currency units.
    #[serde(default)]
    pub price: u64,
}

/// The persisted order entity.
///
/// `order_id` is assigned by the caller before insertion; the store never
/// generates identifiers. `created_at` is set once when the order is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: u64,
    pub customer_id: Uuid,
    pub line_items: Vec<LineItem>,
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_defaults_to_zero() {
        let item: LineItem = serde_json::from_str(r#"{"item_id":"A","quantity":3}"#).unwrap();
        assert_eq!(item.price, 0);
        assert_eq!(item.quantity, 3);
    }
}
