use tether_core::registration::{register_collection, register_object};
use tether_core::{
    EntityId, EventRecorder, MappingConfiguration, RelationEndPointId, RelationGraph,
    RelationTransaction,
};

/// Order/Ticket/Customer/Location mapping used across the integration tests
///
/// - `Ticket.Order` (real) <-> `Order.Ticket` (virtual), one-to-one
/// - `Order.Customer` (real) <-> `Customer.Orders` (virtual), one-to-many
/// - `Order.Location` -> `Location`, unidirectional
#[allow(dead_code)]
pub fn mapping() -> MappingConfiguration {
    MappingConfiguration::builder()
        .entity_type("Order")
        .entity_type("Ticket")
        .entity_type("Customer")
        .entity_type("Location")
        .one_to_one("Order:Ticket", ("Ticket", "Order"), ("Order", "Ticket"))
        .one_to_many("Order:Customer", ("Order", "Customer"), ("Customer", "Orders"))
        .unidirectional("Order:Location", ("Order", "Location"), "Location")
        .build()
        .unwrap()
}

/// Shorthand for an end point id
#[allow(dead_code)]
pub fn ep(entity: &EntityId, property: &str) -> RelationEndPointId {
    RelationEndPointId::new(entity.clone(), property)
}

/// Transaction whose three observer channels all feed one recorder
#[allow(dead_code)]
pub fn recorded_transaction() -> (RelationTransaction, EventRecorder) {
    let recorder = EventRecorder::new();
    let tx = RelationTransaction::new(mapping())
        .with_hooks(recorder.clone())
        .with_listener(recorder.clone())
        .with_state_listener(recorder.clone());
    (tx, recorder)
}

/// Register `ticket.Order = order` as fetched data
#[allow(dead_code)]
pub fn load_ticket(graph: &mut RelationGraph, ticket: &EntityId, order: &EntityId) {
    let definition = graph
        .mapping()
        .end_point_definition("Ticket", "Order")
        .unwrap()
        .clone();
    register_object(graph, &definition, ticket, Some(order.clone())).unwrap();
}

/// Register `customer.Orders = orders` as fetched data
#[allow(dead_code)]
pub fn load_orders(graph: &mut RelationGraph, customer: &EntityId, orders: &[EntityId]) {
    let definition = graph
        .mapping()
        .end_point_definition("Customer", "Orders")
        .unwrap()
        .clone();
    register_collection(graph, &definition, customer, orders.to_vec()).unwrap();
}

/// Create `count` entities of `type_name`
#[allow(dead_code)]
pub fn entities(graph: &mut RelationGraph, type_name: &str, count: usize) -> Vec<EntityId> {
    (0..count)
        .map(|_| graph.new_entity(type_name).unwrap())
        .collect()
}
