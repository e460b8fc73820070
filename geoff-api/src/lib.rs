use std::collections::BTreeMap;

use thiserror::Error;

/// Node identifier assigned by the backend.
///
/// Opaque to the engine: it is only ever obtained from a backend call and
/// handed back to later backend calls (or returned to the caller inside a
/// bindings map).
pub type NodeId = u64;

/// Relationship identifier assigned by the backend.
pub type RelId = u64;

/// An opaque reference to a graph entity, as held in a bindings map.
///
/// A Geoff name is bound either to nodes or to relationships, never both,
/// so the two id spaces stay distinguishable end to end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Entity {
    Node(NodeId),
    Rel(RelId),
}

impl Entity {
    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Entity::Node(id) => Some(*id),
            Entity::Rel(_) => None,
        }
    }

    pub fn as_rel(&self) -> Option<RelId> {
        match self {
            Entity::Rel(id) => Some(*id),
            Entity::Node(_) => None,
        }
    }
}

/// Property value types for nodes and relationships.
///
/// A closed variant constructed once by the literal parser and validated at
/// normalization time:
/// - Null: skipped on storage, never an error
/// - Bool / Int / Float / Text: scalars
/// - BoolArray / IntArray / FloatArray / TextArray: fixed-kind arrays
///   produced by list homogenization
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    BoolArray(Vec<bool>),
    IntArray(Vec<i64>),
    FloatArray(Vec<f64>),
    TextArray(Vec<String>),
}

/// Traversal direction filter for [`GraphBackend::rels`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outgoing,
    Incoming,
}

pub type Result<T> = std::result::Result<T, BackendError>;

/// Failures surfaced by a [`GraphBackend`] implementation.
///
/// The engine never retries or swallows these; they abort the batch and the
/// caller owns the transaction rollback.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("no such node: {0}")]
    NodeNotFound(NodeId),

    #[error("no such relationship: {0}")]
    RelNotFound(RelId),

    #[error("node {0} still has relationships")]
    NodeInUse(NodeId),

    #[error("backend error: {0}")]
    Other(String),
}

/// The graph store the engine runs against.
///
/// All mutations issued through one `&mut` borrow are expected to live in one
/// ambient transaction whose commit/rollback is controlled by the engine's
/// caller; within that transaction, writes must be visible to later reads.
pub trait GraphBackend {
    /// Create a new, property-less node.
    fn create_node(&mut self) -> Result<NodeId>;

    /// Delete a node. Deleting a node that still has relationships is the
    /// backend's error to raise, not the engine's.
    fn delete_node(&mut self, node: NodeId) -> Result<()>;

    /// Create a relationship of the given type from `start` to `end`.
    fn create_rel(&mut self, rel_type: &str, start: NodeId, end: NodeId) -> Result<RelId>;

    /// Delete a relationship.
    fn delete_rel(&mut self, rel: RelId) -> Result<()>;

    /// The type name a relationship was created with.
    fn rel_type(&self, rel: RelId) -> Result<String>;

    /// `(start, end)` node pair of a relationship.
    fn rel_endpoints(&self, rel: RelId) -> Result<(NodeId, NodeId)>;

    /// Relationships touching `node` in the given direction, optionally
    /// restricted to one type.
    fn rels(&self, node: NodeId, direction: Direction, rel_type: Option<&str>) -> Result<Vec<RelId>>;

    /// Set one property on an entity.
    fn set_property(&mut self, entity: Entity, key: &str, value: PropertyValue) -> Result<()>;

    /// Remove every property from an entity.
    fn clear_properties(&mut self, entity: Entity) -> Result<()>;

    /// All properties of an entity.
    fn properties(&self, entity: Entity) -> Result<BTreeMap<String, PropertyValue>>;

    /// Add an `(entity, key, value)` row to a named index, allowing
    /// duplicate rows for the same triple.
    fn index_add(
        &mut self,
        index: &str,
        entity: Entity,
        key: &str,
        value: &PropertyValue,
    ) -> Result<()>;

    /// Add an `(entity, key, value)` row unless an identical row exists.
    fn index_add_if_absent(
        &mut self,
        index: &str,
        entity: Entity,
        key: &str,
        value: &PropertyValue,
    ) -> Result<()>;

    /// Remove every `(entity, key, value)` row matching the triple.
    fn index_remove(
        &mut self,
        index: &str,
        entity: Entity,
        key: &str,
        value: &PropertyValue,
    ) -> Result<()>;

    /// Every entity indexed under `(key, value)` in the named index.
    ///
    /// Multiple distinct entities may be indexed under the same pair; the
    /// lookup returns the union, deduplicated, in insertion order.
    fn index_lookup(&self, index: &str, key: &str, value: &PropertyValue) -> Result<Vec<Entity>>;
}
