use chrono::{DateTime, Utc};
use tether_core_types::EntityId;

use super::collection::CollectionId;

/// State of a materialized object-valued end point
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectEndPointState {
    pub current: Option<EntityId>,
    /// Value as of the last registration or commit
    pub original: Option<EntityId>,
    pub touched: bool,
    pub last_touched_at: Option<DateTime<Utc>>,
}

impl ObjectEndPointState {
    pub fn has_changed(&self) -> bool {
        self.current != self.original
    }
}

/// State of a materialized collection-valued end point
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionEndPointState {
    /// Backing data store of the end point
    pub current: Vec<EntityId>,
    /// Data as of the last registration or commit
    pub original: Vec<EntityId>,
    /// Collection object currently associated with the end point
    pub collection: CollectionId,
    /// Collection object associated as of the last registration or commit
    pub original_collection: CollectionId,
    pub touched: bool,
    pub last_touched_at: Option<DateTime<Utc>>,
}

impl CollectionEndPointState {
    pub(crate) fn new(collection: CollectionId) -> Self {
        Self {
            current: Vec::new(),
            original: Vec::new(),
            original_collection: collection.clone(),
            collection,
            touched: false,
            last_touched_at: None,
        }
    }

    /// Order-sensitive comparison against the original data
    pub fn has_changed(&self) -> bool {
        self.current != self.original
    }
}

/// Materialized end point state
#[derive(Debug, Clone, PartialEq)]
pub enum EndPointState {
    Object(ObjectEndPointState),
    Collection(CollectionEndPointState),
}

impl EndPointState {
    pub fn is_touched(&self) -> bool {
        match self {
            EndPointState::Object(state) => state.touched,
            EndPointState::Collection(state) => state.touched,
        }
    }

    pub fn has_changed(&self) -> bool {
        match self {
            EndPointState::Object(state) => state.has_changed(),
            EndPointState::Collection(state) => state.has_changed(),
        }
    }

    pub fn last_touched_at(&self) -> Option<DateTime<Utc>> {
        match self {
            EndPointState::Object(state) => state.last_touched_at,
            EndPointState::Collection(state) => state.last_touched_at,
        }
    }

    pub(crate) fn touch(&mut self) {
        let now = Utc::now();
        match self {
            EndPointState::Object(state) => {
                state.touched = true;
                state.last_touched_at = Some(now);
            }
            EndPointState::Collection(state) => {
                state.touched = true;
                state.last_touched_at = Some(now);
            }
        }
    }

    pub(crate) fn commit(&mut self) {
        match self {
            EndPointState::Object(state) => {
                state.original = state.current.clone();
                state.touched = false;
            }
            EndPointState::Collection(state) => {
                state.original = state.current.clone();
                state.original_collection = state.collection.clone();
                state.touched = false;
            }
        }
    }
}
