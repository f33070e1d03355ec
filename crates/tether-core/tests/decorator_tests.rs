//! Virtual end point state notification tests
//!
//! ## Scenarios Covered
//!
//! 1. Wrapping survives expansion, element by element
//! 2. The state listener hears after every perform, and only then
//! 3. Virtual ends changed as a side effect report too; unidirectional
//!    ends never do
//! 4. A custom projection replaces `has_changed`

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{entities, ep, load_orders, load_ticket, mapping, recorded_transaction};
use tether_core::command::has_changed_projection;
use tether_core::{
    build_command, Command, EventRecorder, ExecutionContext, RecordedEvent, RelationChange,
    RelationEndPointId, RelationGraph,
};

fn always_changed(_graph: &RelationGraph, _end_point: &RelationEndPointId) -> Option<bool> {
    Some(true)
}

#[test]
fn test_expansion_rewraps_every_element() {
    // GIVEN c1: [o0, o1] and a decorated removal of o0
    let mut graph = RelationGraph::new(mapping());
    let customer = graph.new_entity("Customer").unwrap();
    let orders = entities(&mut graph, "Order", 2);
    load_orders(&mut graph, &customer, &orders);
    let watched = ep(&customer, "Orders");
    let plain = build_command(
        &graph,
        &RelationChange::remove(customer.clone(), "Orders", orders[0].clone()),
    )
    .unwrap();
    let decorated = plain
        .clone()
        .raising_state_updates(watched.clone(), has_changed_projection);

    // WHEN both are expanded
    let plain_expansion = plain.expand(&graph).unwrap();
    let decorated_expansion = decorated.expand(&graph).unwrap();

    // THEN the shapes match and every element is wrapped
    assert_eq!(decorated_expansion.len(), plain_expansion.len());
    for (wrapped, inner) in decorated_expansion.iter().zip(plain_expansion.iter()) {
        let Command::StateUpdateRaising(raising) = wrapped else {
            panic!("expected a wrapped command, got {}", wrapped.kind());
        };
        assert_eq!(raising.watched_end_point(), &watched);
        assert_eq!(raising.inner().kind(), inner.kind());
        assert_eq!(wrapped.end_point(), inner.end_point());
        assert_eq!(wrapped.begin_events(), inner.begin_events());
    }
}

#[test]
fn test_state_reported_after_each_perform() {
    // GIVEN c1: [o0, o1]
    let mut graph = RelationGraph::new(mapping());
    let customer = graph.new_entity("Customer").unwrap();
    let orders = entities(&mut graph, "Order", 2);
    load_orders(&mut graph, &customer, &orders);
    let watched = ep(&customer, "Orders");
    let expanded = build_command(
        &graph,
        &RelationChange::remove(customer.clone(), "Orders", orders[0].clone()),
    )
    .unwrap()
    .raising_state_updates(watched.clone(), has_changed_projection)
    .expand(&graph)
    .unwrap();

    // WHEN the decorated expansion runs
    let recorder = EventRecorder::new();
    let (mut hooks, mut listener, mut states) = (recorder.clone(), recorder.clone(), recorder.clone());
    let mut ctx = ExecutionContext::new(&mut graph, &mut hooks, &mut listener, &mut states);
    expanded.execute(&mut ctx).unwrap();

    // THEN one state update follows each perform: the back-reference, then the removal
    assert_eq!(
        recorder.state_updates(),
        vec![(watched.clone(), Some(false)), (watched, Some(true))]
    );

    // AND all state updates sit between the last Begin and the first End
    let events = recorder.events();
    let first_update = events
        .iter()
        .position(|e| matches!(e, RecordedEvent::StateUpdated { .. }))
        .unwrap();
    let last_begin = events
        .iter()
        .rposition(|e| matches!(e, RecordedEvent::Changing(_)))
        .unwrap();
    let first_end = events
        .iter()
        .position(|e| matches!(e, RecordedEvent::Changed(_)))
        .unwrap();
    assert!(last_begin < first_update);
    assert!(events[first_update..first_end]
        .iter()
        .all(|e| matches!(e, RecordedEvent::StateUpdated { .. })));
}

#[test]
fn test_virtual_one_to_one_reports_through_transaction() {
    // GIVEN order1 <-> ticket1 and a free ticket2
    let (mut tx, recorder) = recorded_transaction();
    let graph = tx.graph_mut();
    let order = graph.new_entity("Order").unwrap();
    let tickets = entities(graph, "Ticket", 2);
    load_ticket(graph, &tickets[0], &order);

    // WHEN order1.Ticket = ticket2 through the virtual end
    tx.execute(&RelationChange::set_object(order.clone(), "Ticket", Some(tickets[1].clone())))
        .unwrap();

    // THEN the virtual end point reports once per expanded command
    let watched = ep(&order, "Ticket");
    let updates = recorder.state_updates();
    assert_eq!(updates.len(), 4);
    assert!(updates
        .iter()
        .all(|(end_point, has_changed)| end_point == &watched && *has_changed == Some(true)));
}

#[test]
fn test_state_returns_to_unchanged() {
    // GIVEN c1: [o0] and a free order o1
    let (mut tx, recorder) = recorded_transaction();
    let graph = tx.graph_mut();
    let customer = graph.new_entity("Customer").unwrap();
    let orders = entities(graph, "Order", 2);
    load_orders(graph, &customer, &orders[0..1]);

    // WHEN o1 is added and then removed again
    tx.execute(&RelationChange::add(customer.clone(), "Orders", orders[1].clone()))
        .unwrap();
    recorder.clear();
    tx.execute(&RelationChange::remove(customer.clone(), "Orders", orders[1].clone()))
        .unwrap();

    // THEN the last report says unchanged
    let updates = recorder.state_updates();
    assert_eq!(updates.last(), Some(&(ep(&customer, "Orders"), Some(false))));
}

#[test]
fn test_real_end_change_reports_opposite_collection() {
    // GIVEN an order and a customer
    let (mut tx, recorder) = recorded_transaction();
    let customer = tx.graph_mut().new_entity("Customer").unwrap();
    let order = tx.graph_mut().new_entity("Order").unwrap();

    // WHEN the real end is assigned
    tx.execute(&RelationChange::set_object(order, "Customer", Some(customer.clone())))
        .unwrap();

    // THEN the virtual collection changed by the expansion reports once
    assert_eq!(recorder.changing().len(), 2);
    assert_eq!(
        recorder.state_updates(),
        vec![(ep(&customer, "Orders"), Some(true))]
    );
}

#[test]
fn test_real_end_change_reports_opposite_one_to_one() {
    // GIVEN order1 <-> ticket1 and a free ticket2
    let (mut tx, recorder) = recorded_transaction();
    let graph = tx.graph_mut();
    let order = graph.new_entity("Order").unwrap();
    let tickets = entities(graph, "Ticket", 2);
    load_ticket(graph, &tickets[0], &order);

    // WHEN ticket2.Order = order1 through the real end
    tx.execute(&RelationChange::set_object(tickets[1].clone(), "Order", Some(order.clone())))
        .unwrap();

    // THEN order1.Ticket reports that it now differs from its original value
    assert_eq!(
        tx.graph().related_object(&ep(&order, "Ticket")).unwrap(),
        Some(tickets[1].clone())
    );
    assert_eq!(recorder.state_updates(), vec![(ep(&order, "Ticket"), Some(true))]);
}

#[test]
fn test_unidirectional_change_reports_nothing() {
    let (mut tx, recorder) = recorded_transaction();
    let order = tx.graph_mut().new_entity("Order").unwrap();
    let location = tx.graph_mut().new_entity("Location").unwrap();

    tx.execute(&RelationChange::set_object(order, "Location", Some(location)))
        .unwrap();

    assert_eq!(recorder.changing().len(), 1);
    assert!(recorder.state_updates().is_empty());
}

#[test]
fn test_deleting_member_reports_owner_collection() {
    // GIVEN c1: [o0, o1]
    let (mut tx, recorder) = recorded_transaction();
    let graph = tx.graph_mut();
    let customer = graph.new_entity("Customer").unwrap();
    let orders = entities(graph, "Order", 2);
    load_orders(graph, &customer, &orders);

    // WHEN o0 is deleted
    tx.delete_entity(&orders[0]).unwrap();

    // THEN the customer's collection reports its change
    assert!(recorder
        .state_updates()
        .contains(&(ep(&customer, "Orders"), Some(true))));
}

#[test]
fn test_custom_projection() {
    // GIVEN a touch of an untouched collection wrapped with a custom projection
    let mut graph = RelationGraph::new(mapping());
    let customer = graph.new_entity("Customer").unwrap();
    let watched = ep(&customer, "Orders");
    let expanded = Command::touch(&graph, watched.clone())
        .unwrap()
        .raising_state_updates(watched.clone(), always_changed)
        .expand(&graph)
        .unwrap();

    // WHEN it runs
    let recorder = EventRecorder::new();
    let (mut hooks, mut listener, mut states) = (recorder.clone(), recorder.clone(), recorder.clone());
    let mut ctx = ExecutionContext::new(&mut graph, &mut hooks, &mut listener, &mut states);
    expanded.execute(&mut ctx).unwrap();

    // THEN the projection's answer is reported, not the graph's
    assert_eq!(recorder.state_updates(), vec![(watched.clone(), Some(true))]);
    assert_eq!(graph.has_changed(&watched), Some(false));
    assert!(graph.is_touched(&watched));
}
