//! Entity deletion tests
//!
//! ## Scenarios Covered
//!
//! 1. Unlinks precede the owner's own delete commands
//! 2. Deleting a collection owner nulls every member's back-reference
//! 3. Deleting a member removes it from its owner's collection
//! 4. Deleted entities reject further operations until rollback

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{entities, ep, load_orders, load_ticket, mapping, recorded_transaction};
use tether_core::deletion::build_delete_command;
use tether_core::{
    Command, EntityId, EventRecorder, RelationChange, RelationError, RelationTransaction,
};

struct Fixture {
    tx: RelationTransaction,
    recorder: EventRecorder,
    customer: EntityId,
    orders: Vec<EntityId>,
    ticket: EntityId,
    location: EntityId,
}

/// c: [o0, o1], t.Order = o0, o0.Location = l
fn fixture() -> Fixture {
    let (mut tx, recorder) = recorded_transaction();
    let graph = tx.graph_mut();
    let customer = graph.new_entity("Customer").unwrap();
    let orders = entities(graph, "Order", 2);
    let ticket = graph.new_entity("Ticket").unwrap();
    let location = graph.new_entity("Location").unwrap();
    load_orders(graph, &customer, &orders);
    load_ticket(graph, &ticket, &orders[0]);
    tx.execute(&RelationChange::set_object(
        orders[0].clone(),
        "Location",
        Some(location.clone()),
    ))
    .unwrap();
    tx.commit();
    recorder.clear();
    Fixture {
        tx,
        recorder,
        customer,
        orders,
        ticket,
        location,
    }
}

#[test]
fn test_delete_order_command_shape() {
    let f = fixture();

    let expanded = build_delete_command(f.tx.graph(), &f.orders[0]).unwrap();

    // Customer, Location, Ticket unlinks in property order, then own end points
    let kinds: Vec<&str> = expanded.iter().map(Command::kind).collect();
    assert_eq!(
        kinds,
        vec![
            "collection_remove",
            "noop",
            "set_one_one",
            "object_delete",
            "object_delete",
            "object_delete"
        ]
    );
}

#[test]
fn test_delete_customer_nulls_back_references() {
    // GIVEN c: [o0, o1]
    let mut f = fixture();

    // WHEN the customer is deleted
    f.tx.delete_entity(&f.customer).unwrap();

    // THEN both orders lost their customer, in collection order
    let graph = f.tx.graph();
    for order in &f.orders {
        assert_eq!(graph.related_object(&ep(order, "Customer")).unwrap(), None);
    }
    let changing = f.recorder.changing();
    assert_eq!(changing.len(), 2);
    assert_eq!(changing[0].entity, f.orders[0]);
    assert_eq!(changing[1].entity, f.orders[1]);
    assert!(changing
        .iter()
        .all(|e| e.property == "Customer" && e.old == Some(f.customer.clone()) && e.new.is_none()));

    // AND the owner's own collection is cleared silently
    assert!(graph.related_objects(&ep(&f.customer, "Orders")).unwrap().is_empty());
    assert!(graph.is_deleted(&f.customer));
}

#[test]
fn test_delete_order_unlinks_collection_and_ticket() {
    let mut f = fixture();

    f.tx.delete_entity(&f.orders[0]).unwrap();

    let graph = f.tx.graph();
    assert_eq!(
        graph.related_objects(&ep(&f.customer, "Orders")).unwrap(),
        &f.orders[1..]
    );
    assert_eq!(graph.related_object(&ep(&f.ticket, "Order")).unwrap(), None);
    assert_eq!(graph.related_object(&ep(&f.orders[0], "Location")).unwrap(), None);

    // Only the customer and the ticket hear about it; the location end is anonymous
    let notified: Vec<(String, String)> = f
        .recorder
        .changing()
        .iter()
        .map(|e| (e.entity.to_string(), e.property.clone()))
        .collect();
    assert_eq!(
        notified,
        vec![
            (f.customer.to_string(), "Orders".to_string()),
            (f.ticket.to_string(), "Order".to_string()),
        ]
    );
    assert!(!notified.iter().any(|(entity, _)| entity == &f.location.to_string()));
}

#[test]
fn test_deleted_entity_rejects_operations() {
    let mut f = fixture();
    f.tx.delete_entity(&f.orders[1]).unwrap();

    let result = f.tx.execute(&RelationChange::set_object(
        f.orders[1].clone(),
        "Customer",
        Some(f.customer.clone()),
    ));
    assert!(matches!(result, Err(RelationError::EntityDeleted { .. })));

    let result = f.tx.delete_entity(&f.orders[1]);
    assert!(matches!(result, Err(RelationError::EntityDeleted { .. })));
}

#[test]
fn test_rollback_undeletes() {
    // GIVEN a deleted customer
    let mut f = fixture();
    f.tx.delete_entity(&f.customer).unwrap();

    // WHEN the transaction rolls back
    f.tx.rollback();

    // THEN the customer and its orders are restored
    let graph = f.tx.graph();
    assert!(graph.entity(&f.customer).is_ok());
    assert_eq!(
        graph.related_objects(&ep(&f.customer, "Orders")).unwrap(),
        &f.orders[..]
    );
    assert_eq!(
        graph.related_object(&ep(&f.orders[0], "Customer")).unwrap(),
        Some(f.customer.clone())
    );
}

#[test]
fn test_rejected_unlink_keeps_entity_alive() {
    // GIVEN a hook rejecting changes to the ticket's order
    let mut tx = RelationTransaction::new(mapping());
    let order = tx.graph_mut().new_entity("Order").unwrap();
    let ticket = tx.graph_mut().new_entity("Ticket").unwrap();
    load_ticket(tx.graph_mut(), &ticket, &order);
    let mut tx = tx.with_hooks(EventRecorder::new().rejecting(ticket.clone(), "Order"));

    // WHEN the order is deleted
    let result = tx.delete_entity(&order);

    // THEN nothing changed and the order is still live
    assert!(matches!(result, Err(RelationError::HandlerFailed { .. })));
    assert!(tx.graph().entity(&order).is_ok());
    assert_eq!(
        tx.graph().related_object(&ep(&ticket, "Order")).unwrap(),
        Some(order)
    );
}
