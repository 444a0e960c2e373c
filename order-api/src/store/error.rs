//! Store error types.

use thiserror::Error;

use super::kv::KvError;

/// Errors that can occur during repository operations.
///
/// Every variant names the operation that failed and, where one exists, the
/// primary key it was working on.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The primary key is already taken.
    #[error("{op} {key}: already exists")]
    AlreadyExists { op: &'static str, key: String },

    /// The primary key does not exist.
    #[error("{op} {key}: not found")]
    NotFound { op: &'static str, key: String },

    /// The order could not be serialized.
    #[error("{op} {key}: failed to encode order: {source}")]
    Encoding {
        op: &'static str,
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A stored record is missing or cannot be decoded.
    #[error("{op} {key}: corrupt record: {reason}")]
    CorruptRecord {
        op: &'static str,
        key: String,
        reason: String,
    },

    /// The backing store failed or could not be reached.
    #[error("{op}: store unavailable: {source}")]
    Unavailable {
        op: &'static str,
        #[source]
        source: KvError,
    },

    /// The caller cancelled the operation or its deadline passed.
    #[error("{op}: cancelled")]
    Cancelled { op: &'static str },
}

impl StoreError {
    /// Whether retrying the same call may succeed.
    ///
    /// Logical outcomes (`NotFound`, `AlreadyExists`) and bad data never
    /// change on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::Unavailable { .. } | StoreError::Cancelled { .. }
        )
    }

    pub(crate) fn unavailable(op: &'static str) -> impl FnOnce(KvError) -> StoreError {
        move |source| StoreError::Unavailable { op, source }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_operation_and_key() {
        let err = StoreError::NotFound {
            op: "update",
            key: "order:7".to_string(),
        };
        assert_eq!(err.to_string(), "update order:7: not found");

        let err = StoreError::Unavailable {
            op: "find_all",
            source: KvError::Backend("connection reset".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "find_all: store unavailable: backend error: connection reset"
        );
    }

    #[test]
    fn only_transient_errors_are_retryable() {
        assert!(StoreError::Cancelled { op: "insert" }.is_retryable());
        assert!(
            StoreError::Unavailable {
                op: "insert",
                source: KvError::Backend("down".to_string()),
            }
            .is_retryable()
        );
        assert!(
            !StoreError::AlreadyExists {
                op: "insert",
                key: "order:1".to_string(),
            }
            .is_retryable()
        );
        assert!(
            !StoreError::CorruptRecord {
                op: "find_by_id",
                key: "order:1".to_string(),
                reason: "expected value".to_string(),
            }
            .is_retryable()
        );
    }
}
