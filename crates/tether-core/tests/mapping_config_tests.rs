//! Mapping configuration loading and validation
//!
//! ## Scenarios Covered
//!
//! 1. A JSON mapping drives the relation graph like a built one
//! 2. Structural mistakes are rejected with `InvalidMapping`
//! 3. Malformed JSON is a `Serialization` error

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use tether_core::{
    Cardinality, MappingConfiguration, RelationChange, RelationError, RelationKind,
    RelationTransaction,
};

const ORDERS_JSON: &str = r#"{
    "entity_types": ["Order", "Customer"],
    "relations": [
        {
            "id": "Order:Customer",
            "kind": "one_to_many",
            "ends": [
                { "entity_type": "Order", "property": "Customer", "cardinality": "one" },
                { "entity_type": "Customer", "property": "Orders", "cardinality": "many", "is_virtual": true }
            ]
        }
    ]
}"#;

fn with_relation(relation: &str) -> String {
    format!(
        r#"{{ "entity_types": ["Order", "Customer", "Location"], "relations": [{}] }}"#,
        relation
    )
}

#[test]
fn test_json_mapping_drives_transactions() {
    // GIVEN a mapping loaded from JSON
    let mapping = MappingConfiguration::from_json(ORDERS_JSON).unwrap();
    let relation = mapping.relation("Customer", "Orders").unwrap();
    assert_eq!(relation.kind, RelationKind::OneToMany);
    let orders = mapping.end_point_definition("Customer", "Orders").unwrap();
    assert_eq!(orders.cardinality, Cardinality::Many);
    assert!(orders.is_virtual);

    // WHEN an order is assigned to a customer
    let mut tx = RelationTransaction::new(mapping);
    let customer = tx.graph_mut().new_entity("Customer").unwrap();
    let order = tx.graph_mut().new_entity("Order").unwrap();
    tx.execute(&RelationChange::set_object(order.clone(), "Customer", Some(customer.clone())))
        .unwrap();

    // THEN the collection end follows
    let end_point = tether_core::RelationEndPointId::new(customer, "Orders");
    assert_eq!(tx.graph().related_objects(&end_point).unwrap(), &[order]);
}

#[test]
fn test_built_mapping_survives_json() {
    let mapping = common::mapping();
    let loaded = MappingConfiguration::from_json(&mapping.to_json().unwrap()).unwrap();

    assert_eq!(loaded.relations(), mapping.relations());
    assert_eq!(loaded.properties_of("Order"), vec!["Customer", "Location", "Ticket"]);
    assert!(loaded.has_entity_type("Location"));
}

#[test]
fn test_one_to_many_collection_end_must_be_virtual() {
    let json = with_relation(
        r#"{ "id": "R", "kind": "one_to_many", "ends": [
            { "entity_type": "Order", "property": "Customer", "cardinality": "one" },
            { "entity_type": "Customer", "property": "Orders", "cardinality": "many" }
        ] }"#,
    );
    let result = MappingConfiguration::from_json(&json);
    assert!(matches!(result, Err(RelationError::InvalidMapping { .. })));
}

#[test]
fn test_anonymous_end_only_in_unidirectional_relations() {
    let json = with_relation(
        r#"{ "id": "R", "kind": "one_to_one", "ends": [
            { "entity_type": "Order", "property": "Location", "cardinality": "one" },
            { "entity_type": "Location", "cardinality": "one", "is_virtual": true }
        ] }"#,
    );
    let result = MappingConfiguration::from_json(&json);
    assert!(matches!(result, Err(RelationError::InvalidMapping { ref reason }) if reason.contains("anonymous")));
}

#[test]
fn test_unidirectional_relation_needs_anonymous_end() {
    let json = with_relation(
        r#"{ "id": "R", "kind": "unidirectional", "ends": [
            { "entity_type": "Order", "property": "Location", "cardinality": "one" },
            { "entity_type": "Location", "property": "Orders", "cardinality": "many", "is_virtual": true }
        ] }"#,
    );
    let result = MappingConfiguration::from_json(&json);
    assert!(matches!(result, Err(RelationError::InvalidMapping { .. })));
}

#[test]
fn test_unknown_entity_type_rejected() {
    let json = with_relation(
        r#"{ "id": "R", "kind": "unidirectional", "ends": [
            { "entity_type": "Order", "property": "Warehouse", "cardinality": "one" },
            { "entity_type": "Warehouse", "cardinality": "many", "is_virtual": true }
        ] }"#,
    );
    let result = MappingConfiguration::from_json(&json);
    assert!(matches!(result, Err(RelationError::InvalidMapping { ref reason }) if reason.contains("Warehouse")));
}

#[test]
fn test_malformed_json_is_serialization_error() {
    let result = MappingConfiguration::from_json(r#"{ "entity_types": ["Order" "#);
    assert!(matches!(result, Err(RelationError::Serialization { .. })));

    let result = MappingConfiguration::from_json(
        r#"{ "entity_types": [], "relations": [{ "id": "R", "kind": "many_to_many", "ends": [] }] }"#,
    );
    assert!(matches!(result, Err(RelationError::Serialization { .. })));
}

#[test]
fn test_graph_rejects_undeclared_types_and_properties() {
    let mut tx = RelationTransaction::new(common::mapping());
    let order = tx.graph_mut().new_entity("Order").unwrap();

    let result = tx.graph_mut().new_entity("Warehouse");
    assert!(matches!(result, Err(RelationError::UnknownEntityType { .. })));

    let result = tx.execute(&RelationChange::touch(order, "Warehouse"));
    assert!(matches!(result, Err(RelationError::UnknownProperty { .. })));
}
