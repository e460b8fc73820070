//! In-memory reference backend for the Geoff engine.
//!
//! Keeps the whole graph in adjacency and property maps. Good enough for
//! tests and for embedding the engine without a real graph database behind
//! it. Batch atomicity is the caller's job: take a [`GraphStore::snapshot`]
//! before running a batch and [`GraphStore::restore`] it if the batch fails.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use geoff_api::{
    BackendError, Direction, Entity, GraphBackend, NodeId, PropertyValue, RelId, Result,
};

#[derive(Debug, Clone, PartialEq)]
struct RelRecord {
    rel_type: String,
    start: NodeId,
    end: NodeId,
}

#[derive(Debug, Clone, PartialEq)]
struct IndexRow {
    entity: Entity,
    key: String,
    value: PropertyValue,
}

/// A whole-store checkpoint, taken before a batch and restored on failure.
#[derive(Debug, Clone)]
pub struct Snapshot(GraphStore);

#[derive(Debug, Default, Clone)]
pub struct GraphStore {
    next_node: NodeId,
    next_rel: RelId,
    nodes: BTreeSet<NodeId>,
    rels: BTreeMap<RelId, RelRecord>,
    // Adjacency: node -> touching relationships, one set per direction.
    out: HashMap<NodeId, BTreeSet<RelId>>,
    inc: HashMap<NodeId, BTreeSet<RelId>>,
    node_props: HashMap<NodeId, BTreeMap<String, PropertyValue>>,
    rel_props: HashMap<RelId, BTreeMap<String, PropertyValue>>,
    // Index rows in insertion order; duplicates are legal (insert mode).
    indexes: HashMap<String, Vec<IndexRow>>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot(self.clone())
    }

    pub fn restore(&mut self, snapshot: Snapshot) {
        *self = snapshot.0;
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn rel_count(&self) -> usize {
        self.rels.len()
    }

    /// Number of rows in a named index, duplicates included.
    pub fn index_row_count(&self, index: &str) -> usize {
        self.indexes.get(index).map_or(0, Vec::len)
    }

    pub fn contains_node(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    pub fn contains_rel(&self, rel: RelId) -> bool {
        self.rels.contains_key(&rel)
    }

    fn rel_record(&self, rel: RelId) -> Result<&RelRecord> {
        self.rels.get(&rel).ok_or(BackendError::RelNotFound(rel))
    }

    fn check_node(&self, node: NodeId) -> Result<()> {
        if self.nodes.contains(&node) {
            Ok(())
        } else {
            Err(BackendError::NodeNotFound(node))
        }
    }

    fn check_entity(&self, entity: Entity) -> Result<()> {
        match entity {
            Entity::Node(id) => self.check_node(id),
            Entity::Rel(id) => self.rel_record(id).map(|_| ()),
        }
    }
}

impl GraphBackend for GraphStore {
    fn create_node(&mut self) -> Result<NodeId> {
        let id = self.next_node;
        self.next_node += 1;
        self.nodes.insert(id);
        Ok(id)
    }

    fn delete_node(&mut self, node: NodeId) -> Result<()> {
        self.check_node(node)?;
        let touching = self.out.get(&node).map_or(false, |s| !s.is_empty())
            || self.inc.get(&node).map_or(false, |s| !s.is_empty());
        if touching {
            return Err(BackendError::NodeInUse(node));
        }
        self.nodes.remove(&node);
        self.out.remove(&node);
        self.inc.remove(&node);
        self.node_props.remove(&node);
        Ok(())
    }

    fn create_rel(&mut self, rel_type: &str, start: NodeId, end: NodeId) -> Result<RelId> {
        self.check_node(start)?;
        self.check_node(end)?;
        let id = self.next_rel;
        self.next_rel += 1;
        self.rels.insert(
            id,
            RelRecord {
                rel_type: rel_type.to_string(),
                start,
                end,
            },
        );
        self.out.entry(start).or_default().insert(id);
        self.inc.entry(end).or_default().insert(id);
        Ok(id)
    }

    fn delete_rel(&mut self, rel: RelId) -> Result<()> {
        let record = self
            .rels
            .remove(&rel)
            .ok_or(BackendError::RelNotFound(rel))?;
        if let Some(set) = self.out.get_mut(&record.start) {
            set.remove(&rel);
        }
        if let Some(set) = self.inc.get_mut(&record.end) {
            set.remove(&rel);
        }
        self.rel_props.remove(&rel);
        Ok(())
    }

    fn rel_type(&self, rel: RelId) -> Result<String> {
        Ok(self.rel_record(rel)?.rel_type.clone())
    }

    fn rel_endpoints(&self, rel: RelId) -> Result<(NodeId, NodeId)> {
        let record = self.rel_record(rel)?;
        Ok((record.start, record.end))
    }

    fn rels(
        &self,
        node: NodeId,
        direction: Direction,
        rel_type: Option<&str>,
    ) -> Result<Vec<RelId>> {
        self.check_node(node)?;
        let set = match direction {
            Direction::Outgoing => self.out.get(&node),
            Direction::Incoming => self.inc.get(&node),
        };
        let mut found = Vec::new();
        if let Some(set) = set {
            for &rel in set {
                if let Some(wanted) = rel_type {
                    if self.rel_record(rel)?.rel_type != wanted {
                        continue;
                    }
                }
                found.push(rel);
            }
        }
        Ok(found)
    }

    fn set_property(&mut self, entity: Entity, key: &str, value: PropertyValue) -> Result<()> {
        self.check_entity(entity)?;
        let props = match entity {
            Entity::Node(id) => self.node_props.entry(id).or_default(),
            Entity::Rel(id) => self.rel_props.entry(id).or_default(),
        };
        props.insert(key.to_string(), value);
        Ok(())
    }

    fn clear_properties(&mut self, entity: Entity) -> Result<()> {
        self.check_entity(entity)?;
        match entity {
            Entity::Node(id) => self.node_props.remove(&id),
            Entity::Rel(id) => self.rel_props.remove(&id),
        };
        Ok(())
    }

    fn properties(&self, entity: Entity) -> Result<BTreeMap<String, PropertyValue>> {
        self.check_entity(entity)?;
        let props = match entity {
            Entity::Node(id) => self.node_props.get(&id),
            Entity::Rel(id) => self.rel_props.get(&id),
        };
        Ok(props.cloned().unwrap_or_default())
    }

    fn index_add(
        &mut self,
        index: &str,
        entity: Entity,
        key: &str,
        value: &PropertyValue,
    ) -> Result<()> {
        self.check_entity(entity)?;
        self.indexes
            .entry(index.to_string())
            .or_default()
            .push(IndexRow {
                entity,
                key: key.to_string(),
                value: value.clone(),
            });
        Ok(())
    }

    fn index_add_if_absent(
        &mut self,
        index: &str,
        entity: Entity,
        key: &str,
        value: &PropertyValue,
    ) -> Result<()> {
        self.check_entity(entity)?;
        let rows = self.indexes.entry(index.to_string()).or_default();
        let exists = rows
            .iter()
            .any(|row| row.entity == entity && row.key == key && row.value == *value);
        if !exists {
            rows.push(IndexRow {
                entity,
                key: key.to_string(),
                value: value.clone(),
            });
        }
        Ok(())
    }

    fn index_remove(
        &mut self,
        index: &str,
        entity: Entity,
        key: &str,
        value: &PropertyValue,
    ) -> Result<()> {
        if let Some(rows) = self.indexes.get_mut(index) {
            rows.retain(|row| !(row.entity == entity && row.key == key && row.value == *value));
        }
        Ok(())
    }

    fn index_lookup(&self, index: &str, key: &str, value: &PropertyValue) -> Result<Vec<Entity>> {
        let mut hits = Vec::new();
        if let Some(rows) = self.indexes.get(index) {
            for row in rows {
                if row.key == key && row.value == *value && !hits.contains(&row.entity) {
                    hits.push(row.entity);
                }
            }
        }
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_delete_rel_updates_adjacency() {
        let mut store = GraphStore::new();
        let a = store.create_node().unwrap();
        let b = store.create_node().unwrap();
        let r = store.create_rel("KNOWS", a, b).unwrap();

        assert_eq!(store.rels(a, Direction::Outgoing, None).unwrap(), vec![r]);
        assert_eq!(store.rels(b, Direction::Incoming, None).unwrap(), vec![r]);
        assert_eq!(
            store.rels(a, Direction::Outgoing, Some("LIKES")).unwrap(),
            Vec::<RelId>::new()
        );
        assert_eq!(store.rel_endpoints(r).unwrap(), (a, b));
        assert_eq!(store.rel_type(r).unwrap(), "KNOWS");

        store.delete_rel(r).unwrap();
        assert!(store.rels(a, Direction::Outgoing, None).unwrap().is_empty());
        assert_eq!(store.rel_count(), 0);
    }

    #[test]
    fn delete_node_with_rels_is_an_error() {
        let mut store = GraphStore::new();
        let a = store.create_node().unwrap();
        let b = store.create_node().unwrap();
        let r = store.create_rel("KNOWS", a, b).unwrap();

        assert!(matches!(
            store.delete_node(a),
            Err(BackendError::NodeInUse(_))
        ));
        store.delete_rel(r).unwrap();
        store.delete_node(a).unwrap();
        assert_eq!(store.node_count(), 1);
    }

    #[test]
    fn clear_then_set_replaces_properties() {
        let mut store = GraphStore::new();
        let a = store.create_node().unwrap();
        let entity = Entity::Node(a);
        store
            .set_property(entity, "name", PropertyValue::Text("Alice".into()))
            .unwrap();
        store
            .set_property(entity, "age", PropertyValue::Int(34))
            .unwrap();
        store.clear_properties(entity).unwrap();
        store
            .set_property(entity, "name", PropertyValue::Text("Bob".into()))
            .unwrap();

        let props = store.properties(entity).unwrap();
        assert_eq!(props.len(), 1);
        assert_eq!(props["name"], PropertyValue::Text("Bob".into()));
    }

    #[test]
    fn index_add_if_absent_deduplicates() {
        let mut store = GraphStore::new();
        let a = Entity::Node(store.create_node().unwrap());
        let v = PropertyValue::Text("x".into());

        store.index_add_if_absent("People", a, "name", &v).unwrap();
        store.index_add_if_absent("People", a, "name", &v).unwrap();
        assert_eq!(store.index_row_count("People"), 1);

        store.index_add("People", a, "name", &v).unwrap();
        assert_eq!(store.index_row_count("People"), 2);

        assert_eq!(store.index_lookup("People", "name", &v).unwrap(), vec![a]);
        store.index_remove("People", a, "name", &v).unwrap();
        assert_eq!(store.index_row_count("People"), 0);
    }

    #[test]
    fn snapshot_restore_rolls_back_everything() {
        let mut store = GraphStore::new();
        let a = store.create_node().unwrap();
        let before = store.snapshot();

        let b = store.create_node().unwrap();
        store.create_rel("KNOWS", a, b).unwrap();
        store
            .index_add("People", Entity::Node(b), "name", &PropertyValue::Int(1))
            .unwrap();

        store.restore(before);
        assert_eq!(store.node_count(), 1);
        assert_eq!(store.rel_count(), 0);
        assert_eq!(store.index_row_count("People"), 0);
    }
}
