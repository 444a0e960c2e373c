//! Order key derivation and record encoding.
//!
//! Primary records live at `order:<id>` as JSON. The `orders` set holds the
//! primary key of every stored order.

use crate::model::Order;

/// Name of the set indexing every stored order key.
pub const ORDER_INDEX: &str = "orders";

/// Primary key of an order.
pub fn key_of(id: u64) -> String {
    format!("order:{}", id)
}

pub fn encode(order: &Order) -> Result<String, serde_json::Error> {
    serde_json::to_string(order)
}

pub fn decode(value: &str) -> Result<Order, serde_json::Error> {
    serde_json::from_str(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LineItem;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn sample(created: bool) -> Order {
        Order {
            order_id: u64::MAX,
            customer_id: Uuid::new_v4(),
            line_items: vec![
                LineItem {
                    item_id: "A".to_string(),
                    quantity: 2,
                    price: 1250,
                },
                LineItem {
                    item_id: "B".to_string(),
                    quantity: 1,
                    price: 0,
                },
            ],
            created_at: created
                .then(|| Utc.with_ymd_and_hms(2024, 1, 1, 12, 30, 0).unwrap()),
        }
    }

    #[test]
    fn key_is_decimal_id() {
        assert_eq!(key_of(0), "order:0");
        assert_eq!(key_of(42), "order:42");
        assert_eq!(key_of(u64::MAX), "order:18446744073709551615");
    }

    #[test]
    fn round_trip_preserves_all_fields() {
        for order in [sample(true), sample(false)] {
            let encoded = encode(&order).unwrap();
            assert_eq!(decode(&encoded).unwrap(), order);
        }
    }

    #[test]
    fn null_timestamp_is_explicit() {
        let encoded = encode(&sample(false)).unwrap();
        assert!(encoded.contains(r#""created_at":null"#));
    }

    #[test]
    fn sub_second_timestamps_survive() {
        let mut order = sample(false);
        order.created_at = Some(Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap());
        assert_eq!(decode(&encode(&order).unwrap()).unwrap(), order);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode("not json").is_err());
        assert!(decode(r#"{"order_id":1}"#).is_err());
    }
}
