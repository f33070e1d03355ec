//! Correlation types for transaction tracking and tracing
//!
//! Every relation transaction carries a `TransactionId`; log events and
//! structured errors raised while it runs can be correlated through it.
//! A `TraceId` links the transaction to whatever outer request started it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! correlation_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Fresh time-ordered id (UUIDv7)
            pub fn new() -> Self {
                Self(Uuid::now_v7().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Adopt an id minted elsewhere
            pub fn from_string(s: String) -> Self {
                Self(s)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

correlation_id! {
    /// Unique identifier of one relation transaction
    TransactionId
}

correlation_id! {
    /// Identifier of the outer request a transaction belongs to
    TraceId
}

/// Correlation ids carried by a transaction
#[derive(Debug, Clone, Default)]
pub struct CorrelationIds {
    pub transaction_id: TransactionId,
    pub trace_id: Option<TraceId>,
}

impl CorrelationIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_transactions_get_distinct_ids() {
        let first = CorrelationIds::new();
        let second = CorrelationIds::new();

        assert_ne!(first.transaction_id, second.transaction_id);
        assert!(first.trace_id.is_none());
    }

    #[test]
    fn test_trace_id_is_attached() {
        let trace_id = TraceId::from_string("req-42".to_string());
        let ids = CorrelationIds::new().with_trace_id(trace_id);

        assert_eq!(ids.trace_id.as_ref().map(TraceId::as_str), Some("req-42"));
        assert_eq!(ids.transaction_id.to_string(), ids.transaction_id.as_str());
    }

    #[test]
    fn test_ids_serialize_as_plain_strings() {
        let id = TransactionId::from_string("tx-1".to_string());

        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"tx-1\"");
        let back: TransactionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
