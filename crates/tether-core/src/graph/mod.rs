//! In-memory relation graph
//!
//! Holds the registry of entities, the materialized state of every relation
//! end point and the collection objects associated with collection end
//! points. Commands read the graph while they are built and expanded, and
//! mutate it only from their `perform` phase.
//!
//! Single-threaded by design: the owning transaction serializes all access.

pub mod collection;
pub mod state;

use std::collections::HashMap;

use tether_core_types::EntityId;

pub use collection::{CollectionId, CollectionState};
pub use state::{CollectionEndPointState, EndPointState, ObjectEndPointState};

use crate::config::MappingConfiguration;
use crate::end_point::EndPoint;
use crate::errors::{RelationError, Result};
use crate::model::{Cardinality, EndPointDefinition, EntityRecord, RelationDefinition, RelationEndPointId};

/// Entities, end point states and collections of one transaction
#[derive(Debug, Clone)]
pub struct RelationGraph {
    mapping: MappingConfiguration,
    pub(crate) entities: HashMap<EntityId, EntityRecord>,
    pub(crate) end_points: HashMap<RelationEndPointId, EndPointState>,
    pub(crate) collections: HashMap<CollectionId, CollectionState>,
    /// Entities deleted since the last commit
    pending_deletions: Vec<EntityId>,
}

impl RelationGraph {
    /// Create an empty graph over a validated mapping
    pub fn new(mapping: MappingConfiguration) -> Self {
        Self {
            mapping,
            entities: HashMap::new(),
            end_points: HashMap::new(),
            collections: HashMap::new(),
            pending_deletions: Vec::new(),
        }
    }

    pub fn mapping(&self) -> &MappingConfiguration {
        &self.mapping
    }

    // ===== Entities =====

    /// Register an externally owned entity
    ///
    /// # Errors
    ///
    /// Returns `UnknownEntityType` if the type is not declared in the mapping,
    /// or `EntityAlreadyRegistered` if the id is taken.
    pub fn register_entity(&mut self, id: EntityId, type_name: &str) -> Result<()> {
        if !self.mapping.has_entity_type(type_name) {
            return Err(RelationError::UnknownEntityType {
                type_name: type_name.to_string(),
            });
        }
        if self.entities.contains_key(&id) {
            return Err(RelationError::EntityAlreadyRegistered {
                entity_id: id.to_string(),
            });
        }
        self.entities
            .insert(id.clone(), EntityRecord::new(id, type_name));
        Ok(())
    }

    /// Register an entity under a freshly generated id
    ///
    /// # Errors
    ///
    /// Returns `UnknownEntityType` if the type is not declared in the mapping.
    pub fn new_entity(&mut self, type_name: &str) -> Result<EntityId> {
        let id = EntityId::new();
        self.register_entity(id.clone(), type_name)?;
        Ok(id)
    }

    /// Get a live entity record
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` if unknown, or `EntityDeleted` if removed.
    pub fn entity(&self, id: &EntityId) -> Result<&EntityRecord> {
        let record = self.record(id)?;
        if record.deleted {
            return Err(RelationError::EntityDeleted {
                entity_id: id.to_string(),
            });
        }
        Ok(record)
    }

    /// Declared type of an entity, deleted or not
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` if the entity was never registered.
    pub fn entity_type(&self, id: &EntityId) -> Result<&str> {
        Ok(self.record(id)?.type_name.as_str())
    }

    /// Whether the entity has been removed from the graph
    pub fn is_deleted(&self, id: &EntityId) -> bool {
        self.entities.get(id).is_some_and(|record| record.deleted)
    }

    fn record(&self, id: &EntityId) -> Result<&EntityRecord> {
        self.entities
            .get(id)
            .ok_or_else(|| RelationError::EntityNotFound {
                entity_id: id.to_string(),
            })
    }

    pub(crate) fn mark_deleted(&mut self, id: &EntityId) -> Result<()> {
        let record = self
            .entities
            .get_mut(id)
            .ok_or_else(|| RelationError::EntityNotFound {
                entity_id: id.to_string(),
            })?;
        if !record.deleted {
            record.deleted = true;
            self.pending_deletions.push(id.clone());
        }
        Ok(())
    }

    // ===== Definitions =====

    /// Definition of the end point identified by `id`
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` or `UnknownProperty`.
    pub fn end_point_definition(&self, id: &RelationEndPointId) -> Result<&EndPointDefinition> {
        let type_name = self.entity_type(&id.entity_id)?;
        self.mapping.end_point_definition(type_name, &id.property)
    }

    /// Relation declaring the end point identified by `id`
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` or `UnknownProperty`.
    pub fn relation_definition(&self, id: &RelationEndPointId) -> Result<&RelationDefinition> {
        let type_name = self.entity_type(&id.entity_id)?;
        self.mapping.relation(type_name, &id.property)
    }

    /// Definition opposite to the end point identified by `id`
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` or `UnknownProperty`.
    pub fn opposite_definition(&self, id: &RelationEndPointId) -> Result<&EndPointDefinition> {
        let type_name = self.entity_type(&id.entity_id)?;
        self.mapping.opposite_end_point_definition(type_name, &id.property)
    }

    // ===== End point provider =====

    /// Resolve the end point `(entity, property)` of a live entity
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound`, `EntityDeleted` or `UnknownProperty`.
    pub fn end_point(&self, entity: &EntityId, property: &str) -> Result<EndPoint> {
        let record = self.entity(entity)?;
        self.mapping
            .end_point_definition(&record.type_name, property)?;
        Ok(EndPoint::Real(RelationEndPointId::new(
            entity.clone(),
            property,
        )))
    }

    /// End point on the `related` entity that points back at `id`'s owner
    ///
    /// Returns the null end point when `related` is absent or the opposite
    /// end is anonymous.
    ///
    /// # Errors
    ///
    /// Returns `UnknownProperty` if `id` is not a declared end point, or
    /// `RelatedTypeMismatch` if `related` is not of the opposite end's type.
    pub fn opposite_end_point(
        &self,
        id: &RelationEndPointId,
        related: Option<&EntityId>,
    ) -> Result<EndPoint> {
        let Some(related) = related else {
            return Ok(EndPoint::Null);
        };
        let opposite = self.opposite_definition(id)?;
        let Some(property) = &opposite.property else {
            return Ok(EndPoint::Null);
        };
        let related_type = self.entity_type(related)?;
        if related_type != opposite.entity_type {
            return Err(RelationError::RelatedTypeMismatch {
                property: id.property.clone(),
                related_id: related.to_string(),
                expected_type: opposite.entity_type.clone(),
                actual_type: related_type.to_string(),
            });
        }
        Ok(EndPoint::Real(RelationEndPointId::new(
            related.clone(),
            property.as_str(),
        )))
    }

    /// Materialized state, if the end point has been accessed
    pub fn end_point_state(&self, id: &RelationEndPointId) -> Option<&EndPointState> {
        self.end_points.get(id)
    }

    /// Get the state of an end point, materializing it on first access
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` or `UnknownProperty`.
    pub fn get_or_create_end_point(&mut self, id: &RelationEndPointId) -> Result<&mut EndPointState> {
        if !self.end_points.contains_key(id) {
            let cardinality = self.end_point_definition(id)?.cardinality;
            let state = match cardinality {
                Cardinality::One => EndPointState::Object(ObjectEndPointState::default()),
                Cardinality::Many => {
                    let collection = CollectionId::new();
                    self.collections.insert(
                        collection.clone(),
                        CollectionState::associated_with(id.clone()),
                    );
                    EndPointState::Collection(CollectionEndPointState::new(collection))
                }
            };
            self.end_points.insert(id.clone(), state);
        }
        self.end_points
            .get_mut(id)
            .ok_or_else(|| RelationError::Internal {
                message: format!("end point {} vanished after materialization", id),
            })
    }

    /// Current related object of an object end point
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `id` is a collection end point.
    pub fn related_object(&self, id: &RelationEndPointId) -> Result<Option<EntityId>> {
        match self.end_points.get(id) {
            Some(EndPointState::Object(state)) => Ok(state.current.clone()),
            Some(EndPointState::Collection(_)) => Err(not_object_end_point(id)),
            None => match self.end_point_definition(id)?.cardinality {
                Cardinality::One => Ok(None),
                Cardinality::Many => Err(not_object_end_point(id)),
            },
        }
    }

    /// Current members of a collection end point
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `id` is an object end point.
    pub fn related_objects(&self, id: &RelationEndPointId) -> Result<&[EntityId]> {
        match self.end_points.get(id) {
            Some(EndPointState::Collection(state)) => Ok(&state.current),
            Some(EndPointState::Object(_)) => Err(not_collection_end_point(id)),
            None => match self.end_point_definition(id)?.cardinality {
                Cardinality::Many => Ok(&[]),
                Cardinality::One => Err(not_collection_end_point(id)),
            },
        }
    }

    /// Collection object currently associated with a materialized collection end point
    pub fn collection_of(&self, id: &RelationEndPointId) -> Option<&CollectionId> {
        match self.end_points.get(id) {
            Some(EndPointState::Collection(state)) => Some(&state.collection),
            _ => None,
        }
    }

    /// Whether the end point has been interacted with since the last commit
    pub fn is_touched(&self, id: &RelationEndPointId) -> bool {
        self.end_points.get(id).is_some_and(EndPointState::is_touched)
    }

    /// Whether the end point differs from its original value; `None` if never materialized
    pub fn has_changed(&self, id: &RelationEndPointId) -> Option<bool> {
        self.end_points.get(id).map(EndPointState::has_changed)
    }

    /// All end points whose value differs from the original, sorted
    pub fn changed_end_points(&self) -> Vec<&RelationEndPointId> {
        let mut changed: Vec<&RelationEndPointId> = self
            .end_points
            .iter()
            .filter(|(_, state)| state.has_changed())
            .map(|(id, _)| id)
            .collect();
        changed.sort();
        changed
    }

    // ===== Collections =====

    /// Create a stand-alone collection object holding `items`
    pub fn create_collection(&mut self, items: Vec<EntityId>) -> CollectionId {
        let id = CollectionId::new();
        self.collections
            .insert(id.clone(), CollectionState::stand_alone(items));
        id
    }

    /// Items visible through a collection object
    ///
    /// # Errors
    ///
    /// Returns `UnknownCollection` if the handle is unknown.
    pub fn collection_items(&self, id: &CollectionId) -> Result<Vec<EntityId>> {
        let state = self.collection(id)?;
        match &state.associated {
            Some(end_point) => Ok(self.related_objects(end_point)?.to_vec()),
            None => Ok(state.items.clone()),
        }
    }

    /// End point a collection object is associated with, if any
    ///
    /// # Errors
    ///
    /// Returns `UnknownCollection` if the handle is unknown.
    pub fn collection_association(&self, id: &CollectionId) -> Result<Option<&RelationEndPointId>> {
        Ok(self.collection(id)?.associated.as_ref())
    }

    fn collection(&self, id: &CollectionId) -> Result<&CollectionState> {
        self.collections
            .get(id)
            .ok_or_else(|| RelationError::UnknownCollection {
                collection_id: id.to_string(),
            })
    }

    // ===== Mutation primitives (perform phase only) =====

    pub(crate) fn touch(&mut self, id: &RelationEndPointId) -> Result<()> {
        self.get_or_create_end_point(id)?.touch();
        Ok(())
    }

    pub(crate) fn set_related_object(
        &mut self,
        id: &RelationEndPointId,
        new: Option<EntityId>,
    ) -> Result<()> {
        match self.get_or_create_end_point(id)? {
            EndPointState::Object(state) => state.current = new,
            EndPointState::Collection(_) => return Err(not_object_end_point(id)),
        }
        self.touch(id)
    }

    pub(crate) fn insert_related_object(
        &mut self,
        id: &RelationEndPointId,
        index: usize,
        item: EntityId,
    ) -> Result<()> {
        let state = self.collection_state_mut(id)?;
        if index > state.current.len() {
            return Err(RelationError::IndexOutOfRange {
                end_point: id.to_string(),
                index,
                len: state.current.len(),
            });
        }
        state.current.insert(index, item);
        self.touch(id)
    }

    /// Remove `item`, preferring the position recorded when the command was built
    pub(crate) fn remove_related_object(
        &mut self,
        id: &RelationEndPointId,
        index_hint: usize,
        item: &EntityId,
    ) -> Result<()> {
        let state = self.collection_state_mut(id)?;
        let index = if state.current.get(index_hint) == Some(item) {
            index_hint
        } else {
            state
                .current
                .iter()
                .position(|candidate| candidate == item)
                .ok_or_else(|| RelationError::ItemNotInCollection {
                    end_point: id.to_string(),
                    item_id: item.to_string(),
                })?
        };
        state.current.remove(index);
        self.touch(id)
    }

    pub(crate) fn replace_related_object(
        &mut self,
        id: &RelationEndPointId,
        index: usize,
        new: EntityId,
    ) -> Result<()> {
        let state = self.collection_state_mut(id)?;
        let len = state.current.len();
        let slot = state
            .current
            .get_mut(index)
            .ok_or_else(|| RelationError::IndexOutOfRange {
                end_point: id.to_string(),
                index,
                len,
            })?;
        *slot = new;
        self.touch(id)
    }

    pub(crate) fn clear_end_point(&mut self, id: &RelationEndPointId) -> Result<()> {
        match self.get_or_create_end_point(id)? {
            EndPointState::Object(state) => state.current = None,
            EndPointState::Collection(state) => state.current.clear(),
        }
        self.touch(id)
    }

    /// Swap the collection object associated with a collection end point
    ///
    /// The old collection is detached only while it is still associated
    /// with `id`; it keeps a stand-alone copy of the data it showed.
    pub(crate) fn replace_collection(
        &mut self,
        id: &RelationEndPointId,
        old: Option<&CollectionId>,
        new: &CollectionId,
        items: &[EntityId],
    ) -> Result<()> {
        self.get_or_create_end_point(id)?;
        let previous_data = self.related_objects(id)?.to_vec();
        // Unmaterialized at construction: the collection created on materialization is the old one
        let old = match old {
            Some(old) => Some(old.clone()),
            None => self.collection_of(id).cloned(),
        };

        if let Some(old) = old.as_ref().filter(|old| *old != new) {
            if let Some(old_state) = self.collections.get_mut(old) {
                if old_state.is_associated_with(id) {
                    old_state.associated = None;
                    old_state.items = previous_data;
                } else {
                    tracing::debug!(
                        end_point = %id,
                        collection = %old,
                        "old collection already reassociated, skipping detach"
                    );
                }
            }
        }

        let new_state = self
            .collections
            .get_mut(new)
            .ok_or_else(|| RelationError::UnknownCollection {
                collection_id: new.to_string(),
            })?;
        new_state.associated = Some(id.clone());
        new_state.items.clear();

        let state = self.collection_state_mut(id)?;
        state.current = items.to_vec();
        state.collection = new.clone();
        self.touch(id)
    }

    fn collection_state_mut(&mut self, id: &RelationEndPointId) -> Result<&mut CollectionEndPointState> {
        match self.get_or_create_end_point(id)? {
            EndPointState::Collection(state) => Ok(state),
            EndPointState::Object(_) => Err(not_collection_end_point(id)),
        }
    }

    // ===== Registration (fetched data) =====

    pub(crate) fn load_object(&mut self, id: &RelationEndPointId, related: Option<EntityId>) -> Result<()> {
        match self.get_or_create_end_point(id)? {
            EndPointState::Object(state) => {
                state.original = related.clone();
                state.current = related;
                Ok(())
            }
            EndPointState::Collection(_) => Err(not_object_end_point(id)),
        }
    }

    pub(crate) fn load_collection(&mut self, id: &RelationEndPointId, items: Vec<EntityId>) -> Result<()> {
        let state = self.collection_state_mut(id)?;
        state.original = items.clone();
        state.current = items;
        Ok(())
    }

    // ===== Commit / rollback =====

    /// Accept every pending change as the new original state
    pub fn commit(&mut self) {
        for state in self.end_points.values_mut() {
            state.commit();
        }
        self.pending_deletions.clear();
    }

    /// Restore every end point and collection association to its original state
    pub fn rollback(&mut self) {
        for (id, state) in self.end_points.iter_mut() {
            match state {
                EndPointState::Object(object) => {
                    object.current = object.original.clone();
                    object.touched = false;
                }
                EndPointState::Collection(collection) => {
                    if collection.collection != collection.original_collection {
                        if let Some(current) = self.collections.get_mut(&collection.collection) {
                            if current.is_associated_with(id) {
                                current.associated = None;
                                current.items = collection.current.clone();
                            }
                        }
                        if let Some(original) =
                            self.collections.get_mut(&collection.original_collection)
                        {
                            original.associated = Some(id.clone());
                            original.items.clear();
                        }
                        collection.collection = collection.original_collection.clone();
                    }
                    collection.current = collection.original.clone();
                    collection.touched = false;
                }
            }
        }

        for id in self.pending_deletions.drain(..) {
            if let Some(record) = self.entities.get_mut(&id) {
                record.deleted = false;
            }
        }
    }
}

fn not_object_end_point(id: &RelationEndPointId) -> RelationError {
    RelationError::invalid_argument(
        "end_point_id",
        format!("{} is a collection end point, not an object end point", id),
    )
}

fn not_collection_end_point(id: &RelationEndPointId) -> RelationError {
    RelationError::invalid_argument(
        "end_point_id",
        format!("{} is an object end point, not a collection end point", id),
    )
}
