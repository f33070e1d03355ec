//! Transaction boundary tests
//!
//! ## Scenarios Covered
//!
//! 1. Commit accepts changes; rollback restores originals
//! 2. A failed execute restores the graph but keeps delivered notifications
//! 3. Prebuilt commands run through `execute_command`
//! 4. Correlation ids are carried by the transaction

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{entities, ep, load_orders, load_ticket, mapping, recorded_transaction};
use tether_core::tether_core_types::{CorrelationIds, TraceId};
use tether_core::{build_command, EventRecorder, RelationChange, RelationError, RelationTransaction};

#[test]
fn test_commit_makes_changes_original() {
    // GIVEN an order assigned to a customer
    let (mut tx, _) = recorded_transaction();
    let customer = tx.graph_mut().new_entity("Customer").unwrap();
    let order = tx.graph_mut().new_entity("Order").unwrap();
    tx.execute(&RelationChange::set_object(order.clone(), "Customer", Some(customer.clone())))
        .unwrap();
    assert_eq!(tx.graph().changed_end_points().len(), 2);

    // WHEN committed
    tx.commit();

    // THEN nothing is pending and a rollback keeps the assignment
    assert!(tx.graph().changed_end_points().is_empty());
    assert!(!tx.graph().is_touched(&ep(&order, "Customer")));
    tx.rollback();
    assert_eq!(
        tx.graph().related_object(&ep(&order, "Customer")).unwrap(),
        Some(customer)
    );
}

#[test]
fn test_rollback_restores_originals() {
    // GIVEN c1: [o0, o1] and t.Order = o0
    let (mut tx, _) = recorded_transaction();
    let graph = tx.graph_mut();
    let customers = entities(graph, "Customer", 2);
    let orders = entities(graph, "Order", 2);
    let ticket = graph.new_entity("Ticket").unwrap();
    load_orders(graph, &customers[0], &orders);
    load_ticket(graph, &ticket, &orders[0]);

    // WHEN several changes run and are rolled back
    tx.execute(&RelationChange::add(customers[1].clone(), "Orders", orders[0].clone()))
        .unwrap();
    tx.execute(&RelationChange::set_object(ticket.clone(), "Order", Some(orders[1].clone())))
        .unwrap();
    tx.rollback();

    // THEN every end point shows its fetched value again
    let graph = tx.graph();
    assert_eq!(graph.related_objects(&ep(&customers[0], "Orders")).unwrap(), &orders[..]);
    assert!(graph.related_objects(&ep(&customers[1], "Orders")).unwrap().is_empty());
    assert_eq!(
        graph.related_object(&ep(&orders[0], "Customer")).unwrap(),
        Some(customers[0].clone())
    );
    assert_eq!(graph.related_object(&ep(&ticket, "Order")).unwrap(), Some(orders[0].clone()));
    assert_eq!(graph.related_object(&ep(&orders[1], "Ticket")).unwrap(), None);
    assert!(graph.changed_end_points().is_empty());
}

#[test]
fn test_failed_execute_restores_graph_and_keeps_notifications() {
    // GIVEN c1: [o0] and a hook rejecting changes to c2.Orders
    let mut tx = RelationTransaction::new(mapping());
    let graph = tx.graph_mut();
    let customers = entities(graph, "Customer", 2);
    let order = graph.new_entity("Order").unwrap();
    load_orders(graph, &customers[0], std::slice::from_ref(&order));
    let recorder = EventRecorder::new();
    let mut tx = tx
        .with_hooks(recorder.clone().rejecting(customers[1].clone(), "Orders"))
        .with_listener(recorder.clone());

    // WHEN o0 is moved to c2
    let result = tx.execute(&RelationChange::set_object(
        order.clone(),
        "Customer",
        Some(customers[1].clone()),
    ));

    // THEN the error surfaces and the graph is untouched
    assert!(matches!(result, Err(RelationError::HandlerFailed { .. })));
    assert_eq!(
        tx.graph().related_object(&ep(&order, "Customer")).unwrap(),
        Some(customers[0].clone())
    );
    assert_eq!(
        tx.graph().related_objects(&ep(&customers[0], "Orders")).unwrap(),
        std::slice::from_ref(&order)
    );
    assert!(tx.graph().changed_end_points().is_empty());

    // AND the transaction-level notifications already sent stay sent
    assert_eq!(recorder.transaction_changing().len(), 3);
    assert!(recorder.transaction_changed().is_empty());
}

#[test]
fn test_execute_prebuilt_command() {
    let (mut tx, recorder) = recorded_transaction();
    let customer = tx.graph_mut().new_entity("Customer").unwrap();
    let order = tx.graph_mut().new_entity("Order").unwrap();
    let command = build_command(
        tx.graph(),
        &RelationChange::add(customer.clone(), "Orders", order.clone()),
    )
    .unwrap();

    tx.execute_command(command).unwrap();

    assert_eq!(
        tx.graph().related_object(&ep(&order, "Customer")).unwrap(),
        Some(customer.clone())
    );
    // Added through the virtual end, so its state is reported
    assert!(!recorder.state_updates().is_empty());
    assert_eq!(recorder.changed().len(), 2);
}

#[test]
fn test_touch_marks_without_changing() {
    let (mut tx, recorder) = recorded_transaction();
    let order = tx.graph_mut().new_entity("Order").unwrap();

    tx.execute(&RelationChange::touch(order.clone(), "Customer")).unwrap();

    assert!(tx.graph().is_touched(&ep(&order, "Customer")));
    assert_eq!(tx.graph().has_changed(&ep(&order, "Customer")), Some(false));
    assert!(recorder.changing().is_empty());
}

#[test]
fn test_check_does_not_mutate() {
    let (mut tx, recorder) = recorded_transaction();
    let customer = tx.graph_mut().new_entity("Customer").unwrap();
    let order = tx.graph_mut().new_entity("Order").unwrap();

    tx.check(&RelationChange::add(customer.clone(), "Orders", order.clone()))
        .unwrap();

    assert!(tx.graph().related_objects(&ep(&customer, "Orders")).unwrap().is_empty());
    assert!(recorder.is_empty());

    let errors = tx
        .check(&RelationChange::remove(customer, "Orders", order))
        .unwrap_err();
    assert!(matches!(errors[..], [RelationError::ItemNotInCollection { .. }]));
}

#[test]
fn test_correlation_is_carried() {
    let trace_id = TraceId::new();
    let tx = RelationTransaction::new(mapping())
        .with_correlation(CorrelationIds::new().with_trace_id(trace_id.clone()));

    assert_eq!(tx.correlation().trace_id.as_ref(), Some(&trace_id));

    let other = RelationTransaction::new(mapping());
    assert_ne!(other.correlation().transaction_id, tx.correlation().transaction_id);
}
