//! Tether Core - bidirectional relation-consistency command engine
//!
//! This crate keeps both ends of object-to-object relations consistent in
//! an in-memory persistence layer:
//! - Relation mapping configuration (one-to-one, one-to-many, unidirectional)
//! - In-memory relation graph with original/current tracking, commit and rollback
//! - Five-phase relation commands and their consistency expansion
//! - Entity-level and transaction-level change notifications
//! - Fetched-data registration and owner deletion
//!
//! The engine performs no I/O. Entities are owned externally and only their
//! relation state lives here.

pub mod change;
pub mod command;
pub mod config;
pub mod deletion;
pub mod diff;
pub mod end_point;
pub mod errors;
pub mod expanded;
pub mod graph;
pub mod logging_facility;
pub mod model;
pub mod observer;
pub mod recording;
pub mod registration;
pub mod transaction;

// Used by the exported logging macros
pub use tether_core_types;

// Re-export commonly used types
pub use change::{build_command, RelationChange};
pub use command::{Command, RelationChangeEvent};
pub use config::MappingConfiguration;
pub use diff::CollectionDiff;
pub use end_point::EndPoint;
pub use errors::{ExError, ExErrorKind, RelationError, Result};
pub use expanded::ExpandedCommand;
pub use graph::{CollectionId, RelationGraph};
pub use model::{Cardinality, EndPointDefinition, RelationDefinition, RelationEndPointId, RelationKind};
pub use observer::{EndPointStateListener, EntityHooks, ExecutionContext, NoopObserver, TransactionListener};
pub use recording::{EventRecorder, RecordedEvent};
pub use tether_core_types::EntityId;
pub use transaction::RelationTransaction;
