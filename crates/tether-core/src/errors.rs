use tether_core_types::{TraceId, TransactionId};
use thiserror::Error;

/// Result type alias using RelationError
pub type Result<T> = std::result::Result<T, RelationError>;

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code usable for programmatic handling,
/// testing and structured log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Construction-time
    InvalidArgument,
    OutOfRange,

    // Lookup
    NotFound,
    Deleted,
    AlreadyExists,

    // Type/identity
    TypeMismatch,
    DuplicateReference,

    // Configuration
    InvalidMapping,
    Serialization,

    // Execution-time
    HandlerFailed,

    // Internal
    Internal,
}

impl ExErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidArgument => "ERR_INVALID_ARGUMENT",
            ExErrorKind::OutOfRange => "ERR_OUT_OF_RANGE",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::Deleted => "ERR_DELETED",
            ExErrorKind::AlreadyExists => "ERR_ALREADY_EXISTS",
            ExErrorKind::TypeMismatch => "ERR_TYPE_MISMATCH",
            ExErrorKind::DuplicateReference => "ERR_DUPLICATE_REFERENCE",
            ExErrorKind::InvalidMapping => "ERR_INVALID_MAPPING",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::HandlerFailed => "ERR_HANDLER_FAILED",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries a classification for programmatic handling plus the context
/// (operation, entity, property, correlation ids) used by the logging facility.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    property: Option<String>,
    transaction_id: Option<TransactionId>,
    trace_id: Option<TraceId>,
    message: String,
}

impl ExError {
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            property: None,
            transaction_id: None,
            trace_id: None,
            message: String::new(),
        }
    }

    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        self.property = Some(property.into());
        self
    }

    pub fn with_transaction_id(mut self, transaction_id: TransactionId) -> Self {
        self.transaction_id = Some(transaction_id);
        self
    }

    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    pub fn property(&self) -> Option<&str> {
        self.property.as_deref()
    }

    pub fn transaction_id(&self) -> Option<&TransactionId> {
        self.transaction_id.as_ref()
    }

    pub fn trace_id(&self) -> Option<&TraceId> {
        self.trace_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        if let Some(property) = &self.property {
            write!(f, " (property: {})", property)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

/// Error taxonomy for relation commands
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RelationError {
    // ===== Construction-time Errors =====
    /// A command was requested with an argument it cannot accept
    #[error("Invalid argument '{param}': {message}")]
    InvalidArgument { param: String, message: String },

    /// Collection index outside the current bounds
    #[error("Index {index} is out of range for end point {end_point} (len {len})")]
    IndexOutOfRange {
        end_point: String,
        index: usize,
        len: usize,
    },

    /// Element is not a member of the collection end point
    #[error("Entity {item_id} is not part of the collection {end_point}")]
    ItemNotInCollection { end_point: String, item_id: String },

    /// Object end point does not currently reference the given entity
    #[error("End point {end_point} does not reference {related_id}")]
    RelatedObjectMismatch {
        end_point: String,
        related_id: String,
    },

    // ===== Lookup Errors =====
    /// Entity is not registered in the relation graph
    #[error("Entity not found: {entity_id}")]
    EntityNotFound { entity_id: String },

    /// Entity was removed from the graph
    #[error("Entity was deleted: {entity_id}")]
    EntityDeleted { entity_id: String },

    /// Entity id is already registered
    #[error("Entity already registered: {entity_id}")]
    EntityAlreadyRegistered { entity_id: String },

    /// Entity type is not declared in the mapping
    #[error("Unknown entity type: {type_name}")]
    UnknownEntityType { type_name: String },

    /// Property is not a relation end point of the entity type
    #[error("Type {entity_type} has no relation property '{property}'")]
    UnknownProperty {
        entity_type: String,
        property: String,
    },

    /// Collection handle is not known to the graph
    #[error("Collection not found: {collection_id}")]
    UnknownCollection { collection_id: String },

    // ===== Type/Identity Errors =====
    /// End point definition belongs to a different entity type than the owner
    #[error("End point {entity_type}.{property} cannot be registered for entity {entity_id} of type {actual_type}")]
    EndPointTypeMismatch {
        entity_type: String,
        property: String,
        entity_id: String,
        actual_type: String,
    },

    /// Related object is not of the type declared by the property
    #[error("Property {property} expects type {expected_type}, but related entity {related_id} is of type {actual_type}")]
    RelatedTypeMismatch {
        property: String,
        related_id: String,
        expected_type: String,
        actual_type: String,
    },

    /// Two entities claim the same unique back-reference of a one-to-one relation
    #[error("Entities {first_id} and {second_id} both reference {owner_id} through unique property {property}")]
    DuplicateUniqueReference {
        property: String,
        owner_id: String,
        first_id: String,
        second_id: String,
    },

    /// Item already belongs to another owner's collection
    #[error("Entity {item_id} is already related to {current_owner_id} through {property}, cannot relate it to {new_owner_id}")]
    ConflictingBackReference {
        property: String,
        item_id: String,
        current_owner_id: String,
        new_owner_id: String,
    },

    // ===== Configuration Errors =====
    /// Relation mapping is malformed
    #[error("Invalid mapping: {reason}")]
    InvalidMapping { reason: String },

    /// Serialization error (JSON encoding/decoding)
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    // ===== Execution-time Errors =====
    /// A relation event handler rejected the change
    #[error("Handler failed for {entity_id}.{property}: {message}")]
    HandlerFailed {
        entity_id: String,
        property: String,
        message: String,
    },

    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl RelationError {
    /// Shorthand for an `InvalidArgument` error
    pub fn invalid_argument(param: impl Into<String>, message: impl Into<String>) -> Self {
        RelationError::InvalidArgument {
            param: param.into(),
            message: message.into(),
        }
    }
}

/// Conversion from RelationError to ExError
impl From<RelationError> for ExError {
    fn from(err: RelationError) -> Self {
        let message = err.to_string();
        match err {
            RelationError::InvalidArgument { .. } => {
                ExError::new(ExErrorKind::InvalidArgument).with_message(message)
            }

            RelationError::IndexOutOfRange { end_point, .. } => {
                ExError::new(ExErrorKind::OutOfRange)
                    .with_entity_id(end_point)
                    .with_message(message)
            }

            RelationError::ItemNotInCollection { end_point, .. }
            | RelationError::RelatedObjectMismatch { end_point, .. } => {
                ExError::new(ExErrorKind::InvalidArgument)
                    .with_entity_id(end_point)
                    .with_message(message)
            }

            RelationError::EntityNotFound { entity_id } => ExError::new(ExErrorKind::NotFound)
                .with_entity_id(entity_id)
                .with_message(message),

            RelationError::EntityDeleted { entity_id } => ExError::new(ExErrorKind::Deleted)
                .with_entity_id(entity_id)
                .with_message(message),

            RelationError::EntityAlreadyRegistered { entity_id } => {
                ExError::new(ExErrorKind::AlreadyExists)
                    .with_entity_id(entity_id)
                    .with_message(message)
            }

            RelationError::UnknownEntityType { .. } => {
                ExError::new(ExErrorKind::NotFound).with_message(message)
            }

            RelationError::UnknownProperty { property, .. } => ExError::new(ExErrorKind::NotFound)
                .with_property(property)
                .with_message(message),

            RelationError::UnknownCollection { collection_id } => {
                ExError::new(ExErrorKind::NotFound)
                    .with_entity_id(collection_id)
                    .with_message(message)
            }

            RelationError::EndPointTypeMismatch {
                property,
                entity_id,
                ..
            } => ExError::new(ExErrorKind::TypeMismatch)
                .with_entity_id(entity_id)
                .with_property(property)
                .with_message(message),

            RelationError::RelatedTypeMismatch {
                property,
                related_id,
                ..
            } => ExError::new(ExErrorKind::TypeMismatch)
                .with_entity_id(related_id)
                .with_property(property)
                .with_message(message),

            RelationError::DuplicateUniqueReference {
                property, owner_id, ..
            } => ExError::new(ExErrorKind::DuplicateReference)
                .with_entity_id(owner_id)
                .with_property(property)
                .with_message(message),

            RelationError::ConflictingBackReference {
                property, item_id, ..
            } => ExError::new(ExErrorKind::DuplicateReference)
                .with_entity_id(item_id)
                .with_property(property)
                .with_message(message),

            RelationError::InvalidMapping { .. } => {
                ExError::new(ExErrorKind::InvalidMapping).with_message(message)
            }

            RelationError::Serialization { .. } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }

            RelationError::HandlerFailed {
                entity_id,
                property,
                ..
            } => ExError::new(ExErrorKind::HandlerFailed)
                .with_entity_id(entity_id)
                .with_property(property)
                .with_message(message),

            RelationError::Internal { .. } => {
                ExError::new(ExErrorKind::Internal).with_message(message)
            }
        }
    }
}

impl From<serde_json::Error> for RelationError {
    fn from(err: serde_json::Error) -> Self {
        RelationError::Serialization {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_argument_maps_to_kind() {
        let err = RelationError::invalid_argument("new_related_object", "use the self-replace command");
        let ex: ExError = err.into();

        assert_eq!(ex.kind(), ExErrorKind::InvalidArgument);
        assert_eq!(ex.code(), "ERR_INVALID_ARGUMENT");
        assert_eq!(ex.op(), None);
        assert!(ex.message().contains("'new_related_object'"));
        assert!(ex.message().contains("self-replace"));
    }

    #[test]
    fn test_duplicate_unique_reference_carries_property() {
        let err = RelationError::DuplicateUniqueReference {
            property: "Order".to_string(),
            owner_id: "order1".to_string(),
            first_id: "ticketA".to_string(),
            second_id: "ticketB".to_string(),
        };
        let ex: ExError = err.into();

        assert_eq!(ex.kind(), ExErrorKind::DuplicateReference);
        assert_eq!(ex.entity_id(), Some("order1"));
        assert_eq!(ex.property(), Some("Order"));
        assert!(ex.message().contains("ticketA"));
        assert!(ex.message().contains("ticketB"));
    }

    #[test]
    fn test_display_includes_code_and_context() {
        let ex = ExError::new(ExErrorKind::NotFound)
            .with_op("execute")
            .with_entity_id("order1")
            .with_message("Entity not found");

        let text = ex.to_string();
        assert!(text.starts_with("[ERR_NOT_FOUND]"));
        assert!(text.contains("'execute'"));
        assert!(text.contains("order1"));
    }

    #[test]
    fn test_serde_json_error_converts() {
        let err = serde_json::from_str::<serde_json::Value>("{ nope").unwrap_err();
        let rel: RelationError = err.into();
        assert!(matches!(rel, RelationError::Serialization { .. }));
    }
}
