pub mod definition;
pub mod end_point_id;
pub mod entity;

pub use definition::{Cardinality, EndPointDefinition, RelationDefinition, RelationKind};
pub use end_point_id::RelationEndPointId;
pub use entity::EntityRecord;
