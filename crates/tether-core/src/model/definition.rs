use serde::{Deserialize, Serialize};

/// Number of related entities one end point can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// Object-valued end point
    One,
    /// Collection-valued end point
    Many,
}

/// Shape of a relation as a whole
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    OneToOne,
    OneToMany,
    /// Only one end is navigable; the other end is anonymous
    Unidirectional,
}

/// Static declaration of one side of a relation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndPointDefinition {
    /// Entity type owning this end point
    pub entity_type: String,

    /// Property name on `entity_type`; `None` for an anonymous end
    #[serde(default)]
    pub property: Option<String>,

    pub cardinality: Cardinality,

    /// Virtual end points hold no foreign key, only a view of the opposite end
    #[serde(default)]
    pub is_virtual: bool,
}

impl EndPointDefinition {
    /// Declare a navigable end point
    pub fn new(
        entity_type: impl Into<String>,
        property: impl Into<String>,
        cardinality: Cardinality,
        is_virtual: bool,
    ) -> Self {
        Self {
            entity_type: entity_type.into(),
            property: Some(property.into()),
            cardinality,
            is_virtual,
        }
    }

    /// Declare the anonymous end of a unidirectional relation
    pub fn anonymous(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            property: None,
            cardinality: Cardinality::Many,
            is_virtual: true,
        }
    }

    /// Whether this end has no property (no back-reference)
    pub fn is_anonymous(&self) -> bool {
        self.property.is_none()
    }

    /// Property name, or empty for an anonymous end
    pub fn property_name(&self) -> &str {
        self.property.as_deref().unwrap_or_default()
    }
}

/// Static declaration of a relation between two entity types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDefinition {
    /// Unique relation id within the mapping
    pub id: String,
    pub kind: RelationKind,
    pub ends: [EndPointDefinition; 2],
}

impl RelationDefinition {
    /// Get the end opposite to `(entity_type, property)`
    pub fn opposite_of(&self, entity_type: &str, property: &str) -> Option<&EndPointDefinition> {
        let [first, second] = &self.ends;
        if first.entity_type == entity_type && first.property.as_deref() == Some(property) {
            Some(second)
        } else if second.entity_type == entity_type && second.property.as_deref() == Some(property) {
            Some(first)
        } else {
            None
        }
    }

    /// Get the end matching `(entity_type, property)`
    pub fn end_of(&self, entity_type: &str, property: &str) -> Option<&EndPointDefinition> {
        self.ends
            .iter()
            .find(|end| end.entity_type == entity_type && end.property.as_deref() == Some(property))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_customer() -> RelationDefinition {
        RelationDefinition {
            id: "Order:Customer".to_string(),
            kind: RelationKind::OneToMany,
            ends: [
                EndPointDefinition::new("Order", "Customer", Cardinality::One, false),
                EndPointDefinition::new("Customer", "Orders", Cardinality::Many, true),
            ],
        }
    }

    #[test]
    fn test_opposite_of() {
        let rel = order_customer();
        let opposite = rel.opposite_of("Order", "Customer").unwrap();
        assert_eq!(opposite.entity_type, "Customer");
        assert_eq!(opposite.property_name(), "Orders");

        assert!(rel.opposite_of("Order", "Ticket").is_none());
    }

    #[test]
    fn test_anonymous_end() {
        let end = EndPointDefinition::anonymous("Location");
        assert!(end.is_anonymous());
        assert_eq!(end.property_name(), "");
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&RelationKind::OneToMany).unwrap();
        assert_eq!(json, "\"one_to_many\"");
    }
}
