//! Core types shared across Tether facilities
//!
//! This crate provides foundational types used by the relation engine,
//! its error facility and its logging facility:
//!
//! - **Identity types**: EntityId
//! - **Correlation types**: TransactionId, TraceId, CorrelationIds
//! - **Schema constants**: Canonical field keys and event names

pub mod correlation;
pub mod identity;
pub mod schema;

pub use correlation::{CorrelationIds, TraceId, TransactionId};
pub use identity::EntityId;
