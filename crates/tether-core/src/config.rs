//! Relation mapping configuration
//!
//! The mapping declares which entity types exist and which relations connect
//! them. It is built once at startup, either through [`MappingBuilder`] or by
//! loading a JSON document, and validated before the graph uses it.
//!
//! ## Example
//!
//! ```
//! use tether_core::config::MappingConfiguration;
//!
//! let mapping = MappingConfiguration::builder()
//!     .entity_type("Order")
//!     .entity_type("Customer")
//!     .one_to_many("Order:Customer", ("Order", "Customer"), ("Customer", "Orders"))
//!     .build()
//!     .unwrap();
//!
//! assert!(mapping.end_point_definition("Customer", "Orders").is_ok());
//! ```

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::errors::{RelationError, Result};
use crate::model::{Cardinality, EndPointDefinition, RelationDefinition, RelationKind};

/// Serialized shape of a mapping document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct MappingDocument {
    entity_types: Vec<String>,
    relations: Vec<RelationDefinition>,
}

/// Validated relation mapping with an end point lookup index
#[derive(Debug, Clone, Default)]
pub struct MappingConfiguration {
    entity_types: BTreeSet<String>,
    relations: Vec<RelationDefinition>,
    /// (entity type, property) -> index into `relations`
    index: HashMap<(String, String), usize>,
}

impl MappingConfiguration {
    /// Start building a mapping in code
    pub fn builder() -> MappingBuilder {
        MappingBuilder::default()
    }

    /// Load and validate a mapping from its JSON representation
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if the document is not valid JSON, or
    /// `InvalidMapping` if the declared relations are inconsistent.
    pub fn from_json(json: &str) -> Result<Self> {
        let doc: MappingDocument = serde_json::from_str(json)?;
        Self::from_document(doc)
    }

    /// Serialize the mapping back to JSON
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if encoding fails.
    pub fn to_json(&self) -> Result<String> {
        let doc = MappingDocument {
            entity_types: self.entity_types.iter().cloned().collect(),
            relations: self.relations.clone(),
        };
        Ok(serde_json::to_string_pretty(&doc)?)
    }

    fn from_document(doc: MappingDocument) -> Result<Self> {
        let entity_types: BTreeSet<String> = doc.entity_types.into_iter().collect();
        let mut index = HashMap::new();
        let mut relation_ids = HashSet::new();

        for (position, relation) in doc.relations.iter().enumerate() {
            if !relation_ids.insert(relation.id.clone()) {
                return Err(invalid(format!("duplicate relation id '{}'", relation.id)));
            }
            validate_relation(relation, &entity_types)?;

            for end in &relation.ends {
                let Some(property) = &end.property else {
                    continue;
                };
                let key = (end.entity_type.clone(), property.clone());
                if index.insert(key, position).is_some() {
                    return Err(invalid(format!(
                        "end point {}.{} is declared by more than one relation",
                        end.entity_type, property
                    )));
                }
            }
        }

        Ok(Self {
            entity_types,
            relations: doc.relations,
            index,
        })
    }

    /// Check whether an entity type is declared
    pub fn has_entity_type(&self, type_name: &str) -> bool {
        self.entity_types.contains(type_name)
    }

    /// All declared relations, in declaration order
    pub fn relations(&self) -> &[RelationDefinition] {
        &self.relations
    }

    /// Relation properties declared on an entity type
    pub fn properties_of(&self, type_name: &str) -> Vec<&str> {
        let mut properties: Vec<&str> = self
            .index
            .keys()
            .filter(|(entity_type, _)| entity_type == type_name)
            .map(|(_, property)| property.as_str())
            .collect();
        properties.sort_unstable();
        properties
    }

    /// Get the relation declaring `(type_name, property)`
    ///
    /// # Errors
    ///
    /// Returns `UnknownProperty` if no relation declares that end point.
    pub fn relation(&self, type_name: &str, property: &str) -> Result<&RelationDefinition> {
        self.index
            .get(&(type_name.to_string(), property.to_string()))
            .and_then(|position| self.relations.get(*position))
            .ok_or_else(|| RelationError::UnknownProperty {
                entity_type: type_name.to_string(),
                property: property.to_string(),
            })
    }

    /// Get the definition of `(type_name, property)`
    ///
    /// # Errors
    ///
    /// Returns `UnknownProperty` if no relation declares that end point.
    pub fn end_point_definition(
        &self,
        type_name: &str,
        property: &str,
    ) -> Result<&EndPointDefinition> {
        let relation = self.relation(type_name, property)?;
        relation
            .end_of(type_name, property)
            .ok_or_else(|| RelationError::UnknownProperty {
                entity_type: type_name.to_string(),
                property: property.to_string(),
            })
    }

    /// Get the definition opposite to `(type_name, property)`
    ///
    /// # Errors
    ///
    /// Returns `UnknownProperty` if no relation declares that end point.
    pub fn opposite_end_point_definition(
        &self,
        type_name: &str,
        property: &str,
    ) -> Result<&EndPointDefinition> {
        let relation = self.relation(type_name, property)?;
        relation
            .opposite_of(type_name, property)
            .ok_or_else(|| RelationError::UnknownProperty {
                entity_type: type_name.to_string(),
                property: property.to_string(),
            })
    }
}

fn invalid(reason: impl Into<String>) -> RelationError {
    RelationError::InvalidMapping {
        reason: reason.into(),
    }
}

fn validate_relation(relation: &RelationDefinition, entity_types: &BTreeSet<String>) -> Result<()> {
    for end in &relation.ends {
        if !entity_types.contains(&end.entity_type) {
            return Err(invalid(format!(
                "relation '{}' references undeclared entity type '{}'",
                relation.id, end.entity_type
            )));
        }
    }

    let [first, second] = &relation.ends;
    let anonymous_count = relation.ends.iter().filter(|e| e.is_anonymous()).count();

    match relation.kind {
        RelationKind::OneToOne => {
            if anonymous_count > 0 {
                return Err(invalid(format!(
                    "one-to-one relation '{}' cannot have an anonymous end",
                    relation.id
                )));
            }
            if first.cardinality != Cardinality::One || second.cardinality != Cardinality::One {
                return Err(invalid(format!(
                    "one-to-one relation '{}' must have two object-valued ends",
                    relation.id
                )));
            }
            if first.is_virtual == second.is_virtual {
                return Err(invalid(format!(
                    "one-to-one relation '{}' must have exactly one virtual end",
                    relation.id
                )));
            }
        }
        RelationKind::OneToMany => {
            if anonymous_count > 0 {
                return Err(invalid(format!(
                    "one-to-many relation '{}' cannot have an anonymous end",
                    relation.id
                )));
            }
            let (one, many) = match (first.cardinality, second.cardinality) {
                (Cardinality::One, Cardinality::Many) => (first, second),
                (Cardinality::Many, Cardinality::One) => (second, first),
                _ => {
                    return Err(invalid(format!(
                        "one-to-many relation '{}' needs one object end and one collection end",
                        relation.id
                    )))
                }
            };
            if one.is_virtual || !many.is_virtual {
                return Err(invalid(format!(
                    "one-to-many relation '{}' must hold its foreign key on the object end",
                    relation.id
                )));
            }
        }
        RelationKind::Unidirectional => {
            if anonymous_count != 1 {
                return Err(invalid(format!(
                    "unidirectional relation '{}' needs exactly one anonymous end",
                    relation.id
                )));
            }
            let named = if first.is_anonymous() { second } else { first };
            if named.cardinality != Cardinality::One || named.is_virtual {
                return Err(invalid(format!(
                    "unidirectional relation '{}' must be navigable through a real object end",
                    relation.id
                )));
            }
        }
    }

    Ok(())
}

/// Builder for statically declared mappings
#[derive(Debug, Clone, Default)]
pub struct MappingBuilder {
    doc: MappingDocument,
}

impl MappingBuilder {
    /// Declare an entity type
    pub fn entity_type(mut self, type_name: impl Into<String>) -> Self {
        self.doc.entity_types.push(type_name.into());
        self
    }

    /// Declare a one-to-one relation; `real` holds the foreign key
    pub fn one_to_one(mut self, id: &str, real: (&str, &str), virtual_end: (&str, &str)) -> Self {
        self.doc.relations.push(RelationDefinition {
            id: id.to_string(),
            kind: RelationKind::OneToOne,
            ends: [
                EndPointDefinition::new(real.0, real.1, Cardinality::One, false),
                EndPointDefinition::new(virtual_end.0, virtual_end.1, Cardinality::One, true),
            ],
        });
        self
    }

    /// Declare a one-to-many relation between an object end and a collection end
    pub fn one_to_many(mut self, id: &str, object_end: (&str, &str), collection_end: (&str, &str)) -> Self {
        self.doc.relations.push(RelationDefinition {
            id: id.to_string(),
            kind: RelationKind::OneToMany,
            ends: [
                EndPointDefinition::new(object_end.0, object_end.1, Cardinality::One, false),
                EndPointDefinition::new(collection_end.0, collection_end.1, Cardinality::Many, true),
            ],
        });
        self
    }

    /// Declare a unidirectional relation navigable only from `object_end`
    pub fn unidirectional(mut self, id: &str, object_end: (&str, &str), target_type: &str) -> Self {
        self.doc.relations.push(RelationDefinition {
            id: id.to_string(),
            kind: RelationKind::Unidirectional,
            ends: [
                EndPointDefinition::new(object_end.0, object_end.1, Cardinality::One, false),
                EndPointDefinition::anonymous(target_type),
            ],
        });
        self
    }

    /// Add a fully specified relation
    pub fn relation(mut self, relation: RelationDefinition) -> Self {
        self.doc.relations.push(relation);
        self
    }

    /// Validate and build the mapping
    ///
    /// # Errors
    ///
    /// Returns `InvalidMapping` if the declared relations are inconsistent.
    pub fn build(self) -> Result<MappingConfiguration> {
        MappingConfiguration::from_document(self.doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> MappingBuilder {
        MappingConfiguration::builder()
            .entity_type("Order")
            .entity_type("Ticket")
            .entity_type("Customer")
            .entity_type("Location")
    }

    #[test]
    fn test_builder_indexes_both_ends() {
        let mapping = base()
            .one_to_one("Order:Ticket", ("Order", "Ticket"), ("Ticket", "Order"))
            .build()
            .unwrap();

        let real = mapping.end_point_definition("Order", "Ticket").unwrap();
        assert!(!real.is_virtual);
        let opposite = mapping.opposite_end_point_definition("Order", "Ticket").unwrap();
        assert_eq!(opposite.entity_type, "Ticket");
        assert!(opposite.is_virtual);
    }

    #[test]
    fn test_unknown_property() {
        let mapping = base().build().unwrap();
        let result = mapping.end_point_definition("Order", "Nope");
        assert!(matches!(result, Err(RelationError::UnknownProperty { .. })));
    }

    #[test]
    fn test_duplicate_end_point_rejected() {
        let result = base()
            .one_to_one("A", ("Order", "Ticket"), ("Ticket", "Order"))
            .one_to_one("B", ("Order", "Ticket"), ("Ticket", "Other"))
            .build();
        assert!(matches!(result, Err(RelationError::InvalidMapping { .. })));
    }

    #[test]
    fn test_duplicate_relation_id_rejected() {
        let result = base()
            .one_to_one("A", ("Order", "Ticket"), ("Ticket", "Order"))
            .one_to_many("A", ("Order", "Customer"), ("Customer", "Orders"))
            .build();
        assert!(matches!(result, Err(RelationError::InvalidMapping { .. })));
    }

    #[test]
    fn test_undeclared_type_rejected() {
        let result = MappingConfiguration::builder()
            .entity_type("Order")
            .one_to_one("A", ("Order", "Ticket"), ("Ticket", "Order"))
            .build();
        assert!(matches!(result, Err(RelationError::InvalidMapping { .. })));
    }

    #[test]
    fn test_one_to_one_needs_exactly_one_virtual_end() {
        let result = base()
            .relation(RelationDefinition {
                id: "A".to_string(),
                kind: RelationKind::OneToOne,
                ends: [
                    EndPointDefinition::new("Order", "Ticket", Cardinality::One, false),
                    EndPointDefinition::new("Ticket", "Order", Cardinality::One, false),
                ],
            })
            .build();
        assert!(matches!(result, Err(RelationError::InvalidMapping { .. })));
    }

    #[test]
    fn test_json_round_trip() {
        let mapping = base()
            .one_to_many("Order:Customer", ("Order", "Customer"), ("Customer", "Orders"))
            .unidirectional("Order:Location", ("Order", "Location"), "Location")
            .build()
            .unwrap();

        let json = mapping.to_json().unwrap();
        let loaded = MappingConfiguration::from_json(&json).unwrap();

        assert_eq!(loaded.relations(), mapping.relations());
        assert_eq!(loaded.properties_of("Order"), vec!["Customer", "Location"]);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        let result = MappingConfiguration::from_json("not json");
        assert!(matches!(result, Err(RelationError::Serialization { .. })));
    }
}
