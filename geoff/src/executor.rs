//! The rule interpreter: merge / insert / delete.
//!
//! Consumes a subgraph plus an entity store seeded from the caller's
//! bindings, dispatches each rule by its pattern string, and issues
//! create/update/match/delete calls against the backend, updating the store
//! as it goes. Rules run in subgraph order (reverse order for delete); a
//! rule can only ever see bindings written by earlier rules.

use geoff_api::{Direction, Entity, GraphBackend, NodeId, PropertyValue, RelId};
use serde_json::Value;

use crate::ast::{PropertyMap, Rule, Subgraph};
use crate::error::{Error, Result};
use crate::lexer::Token;
use crate::store::{Bindings, EntityStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Merge,
    Insert,
    Delete,
}

pub fn merge<B: GraphBackend>(
    subgraph: &Subgraph,
    backend: &mut B,
    initial_bindings: &Bindings,
) -> Result<Bindings> {
    run(Mode::Merge, subgraph, backend, initial_bindings)
}

pub fn insert<B: GraphBackend>(
    subgraph: &Subgraph,
    backend: &mut B,
    initial_bindings: &Bindings,
) -> Result<Bindings> {
    run(Mode::Insert, subgraph, backend, initial_bindings)
}

pub fn delete<B: GraphBackend>(
    subgraph: &Subgraph,
    backend: &mut B,
    initial_bindings: &Bindings,
) -> Result<Bindings> {
    run(Mode::Delete, subgraph, backend, initial_bindings)
}

fn run<B: GraphBackend>(
    mode: Mode,
    subgraph: &Subgraph,
    backend: &mut B,
    initial_bindings: &Bindings,
) -> Result<Bindings> {
    let store = EntityStore::seeded(initial_bindings)?;
    let mut executor = Executor {
        backend,
        store,
        mode,
    };
    // Delete undoes a batch, so it walks the rules back to front. Rule
    // numbers in diagnostics always count from the source, not the walk.
    let ordered;
    let rules = if mode == Mode::Delete {
        ordered = subgraph.reverse();
        ordered.rules()
    } else {
        subgraph.rules()
    };
    for (position, rule) in rules.iter().enumerate() {
        let rule_no = if mode == Mode::Delete {
            rules.len() - position
        } else {
            position + 1
        };
        executor.apply(rule_no, rule)?;
    }
    Ok(executor.store.flatten())
}

#[derive(Debug, Clone, Copy)]
struct NodeRef<'r> {
    name: &'r str,
    index: usize,
}

impl NodeRef<'_> {
    const ANONYMOUS: NodeRef<'static> = NodeRef { name: "", index: 0 };
}

#[derive(Debug, Clone, Copy)]
struct RelRef<'r> {
    name: &'r str,
    index: usize,
    rel_type: Option<&'r str>,
}

/// One relationship-shaped rule, canonicalized: `start` is always the tail
/// of the (first) arrow regardless of which side of the source text it was
/// written on.
#[derive(Debug, Clone, Copy)]
struct RelShape<'r> {
    rel: RelRef<'r>,
    start: NodeRef<'r>,
    end: NodeRef<'r>,
    two_way: bool,
    reflect: bool,
}

#[derive(Debug, Clone, Copy)]
enum EntityRef<'r> {
    Node(NodeRef<'r>),
    Rel(RelRef<'r>),
}

struct Executor<'a, B: GraphBackend> {
    backend: &'a mut B,
    store: EntityStore,
    mode: Mode,
}

impl<B: GraphBackend> Executor<'_, B> {
    fn apply(&mut self, rule_no: usize, rule: &Rule) -> Result<()> {
        let data = rule.data.as_ref();
        match (rule.descriptor.pattern(), rule.descriptor.tokens()) {
            ("N", [Token::Node { name, index }]) => match self.mode {
                Mode::Delete => self.delete_nodes(name, *index),
                _ => self
                    .create_or_update_nodes(rule_no, NodeRef { name, index: *index }, data)
                    .map(drop),
            },
            ("R", [Token::Rel { name, index, rel_type }]) => {
                let shape = RelShape {
                    rel: RelRef {
                        name,
                        index: *index,
                        rel_type: rel_type.as_deref(),
                    },
                    start: NodeRef::ANONYMOUS,
                    end: NodeRef::ANONYMOUS,
                    two_way: false,
                    reflect: false,
                };
                self.apply_rel(rule_no, shape, data)
            }
            (
                "N-R->N",
                [
                    Token::Node { name: sn, index: si },
                    _,
                    Token::Rel { name, index, rel_type },
                    _,
                    _,
                    Token::Node { name: en, index: ei },
                ],
            ) => {
                let shape = RelShape {
                    rel: RelRef {
                        name,
                        index: *index,
                        rel_type: rel_type.as_deref(),
                    },
                    start: NodeRef { name: sn, index: *si },
                    end: NodeRef { name: en, index: *ei },
                    two_way: false,
                    reflect: false,
                };
                self.apply_rel(rule_no, shape, data)
            }
            (
                "N<-R-N",
                [
                    Token::Node { name: en, index: ei },
                    _,
                    _,
                    Token::Rel { name, index, rel_type },
                    _,
                    Token::Node { name: sn, index: si },
                ],
            ) => {
                let shape = RelShape {
                    rel: RelRef {
                        name,
                        index: *index,
                        rel_type: rel_type.as_deref(),
                    },
                    start: NodeRef { name: sn, index: *si },
                    end: NodeRef { name: en, index: *ei },
                    two_way: false,
                    reflect: false,
                };
                self.apply_rel(rule_no, shape, data)
            }
            (
                "N<-R->N",
                [
                    Token::Node { name: sn, index: si },
                    _,
                    _,
                    Token::Rel { name, index, rel_type },
                    _,
                    _,
                    Token::Node { name: en, index: ei },
                ],
            ) => {
                let shape = RelShape {
                    rel: RelRef {
                        name,
                        index: *index,
                        rel_type: rel_type.as_deref(),
                    },
                    start: NodeRef { name: sn, index: *si },
                    end: NodeRef { name: en, index: *ei },
                    two_way: true,
                    reflect: false,
                };
                self.apply_rel(rule_no, shape, data)
            }
            (
                "N=R=>N",
                [
                    Token::Node { name: sn, index: si },
                    _,
                    Token::Rel { name, index, rel_type },
                    _,
                    _,
                    Token::Node { name: en, index: ei },
                ],
            ) => {
                let shape = RelShape {
                    rel: RelRef {
                        name,
                        index: *index,
                        rel_type: rel_type.as_deref(),
                    },
                    start: NodeRef { name: sn, index: *si },
                    end: NodeRef { name: en, index: *ei },
                    two_way: false,
                    reflect: true,
                };
                self.apply_rel(rule_no, shape, data)
            }
            ("N^I", [Token::Node { name, index }, _, Token::Index { name: index_name }]) => {
                let entity = EntityRef::Node(NodeRef { name, index: *index });
                self.apply_index(rule_no, entity, index_name, data)
            }
            ("R^I", [Token::Rel { name, index, rel_type }, _, Token::Index { name: index_name }]) => {
                let entity = EntityRef::Rel(RelRef {
                    name,
                    index: *index,
                    rel_type: rel_type.as_deref(),
                });
                self.apply_index(rule_no, entity, index_name, data)
            }
            (pattern, _) => Err(Error::rule(
                rule_no,
                format!("unrecognized rule pattern {pattern:?}"),
            )),
        }
    }

    // ----- node rules -----

    /// Bound name: full property replacement on every member (no data means
    /// the rule is a pure touch). Unbound: create one node and bind it.
    /// Anonymous names always create.
    fn create_or_update_nodes(
        &mut self,
        rule_no: usize,
        node: NodeRef<'_>,
        data: Option<&PropertyMap>,
    ) -> Result<Vec<NodeId>> {
        if self.store.contains_node(node.name, node.index) {
            let nodes = self.store.node_set(node.name, node.index);
            if let Some(map) = data {
                for &id in &nodes {
                    self.replace_properties(Entity::Node(id), map)?;
                }
            }
            return Ok(nodes);
        }

        let id = self.backend.create_node()?;
        if !node.name.is_empty() && !self.store.put_node(node.name, node.index, id) {
            return Err(Error::rule(
                rule_no,
                format!("name {:?} is already bound", node.name),
            ));
        }
        if let Some(map) = data {
            self.replace_properties(Entity::Node(id), map)?;
        }
        Ok(vec![id])
    }

    fn delete_nodes(&mut self, name: &str, index: usize) -> Result<()> {
        for id in self.store.remove_nodes(name, index) {
            self.backend.delete_node(id)?;
        }
        Ok(())
    }

    // ----- relationship rules -----

    fn apply_rel(
        &mut self,
        rule_no: usize,
        shape: RelShape<'_>,
        data: Option<&PropertyMap>,
    ) -> Result<()> {
        if self.mode == Mode::Delete {
            return self.delete_rels(&shape);
        }

        if self.store.contains_rel(shape.rel.name, shape.rel.index) {
            return self.update_bound_rels(rule_no, &shape, data);
        }

        if shape.reflect {
            // Namespace-only: bind whatever the search finds, mutate nothing.
            let matches = if self.mode == Mode::Merge {
                self.search_rels(&shape)?
            } else {
                Vec::new()
            };
            self.bind_rels(rule_no, &shape, &matches)?;
            return Ok(());
        }

        if self.mode == Mode::Merge {
            let matches = self.search_rels(&shape)?;
            if !matches.is_empty() {
                let bound = self.bind_rels(rule_no, &shape, &matches)?;
                if let Some(map) = data {
                    for &rel in &bound {
                        self.replace_properties(Entity::Rel(rel), map)?;
                    }
                }
                return Ok(());
            }
        }
        self.create_rels(rule_no, &shape, data)
    }

    /// Case 1: the relationship name is already bound. Verify each bound
    /// relationship against the declared type and the bound endpoint sets,
    /// unbinding the ones that fail; survivors get their properties
    /// replaced and their actual endpoints folded into unbound endpoint
    /// names so later rules can reference them.
    fn update_bound_rels(
        &mut self,
        rule_no: usize,
        shape: &RelShape<'_>,
        data: Option<&PropertyMap>,
    ) -> Result<()> {
        let bound = self.store.rel_set(shape.rel.name, shape.rel.index);
        let start_bound = self.store.contains_node(shape.start.name, shape.start.index);
        let end_bound = self.store.contains_node(shape.end.name, shape.end.index);
        let start_set = self.store.node_set(shape.start.name, shape.start.index);
        let end_set = self.store.node_set(shape.end.name, shape.end.index);

        let mut survivors = Vec::new();
        let mut starts = Vec::new();
        let mut ends = Vec::new();
        for rel in bound {
            if let Some(wanted) = shape.rel.rel_type {
                if self.backend.rel_type(rel)? != wanted {
                    continue;
                }
            }
            let (start, end) = self.backend.rel_endpoints(rel)?;
            let forward = (!start_bound || start_set.contains(&start))
                && (!end_bound || end_set.contains(&end));
            let backward = shape.two_way
                && (!start_bound || start_set.contains(&end))
                && (!end_bound || end_set.contains(&start));
            if !forward && !backward {
                continue;
            }
            survivors.push(rel);
            if !starts.contains(&start) {
                starts.push(start);
            }
            if !ends.contains(&end) {
                ends.push(end);
            }
        }

        self.store.remove_rels(shape.rel.name, shape.rel.index);
        if !survivors.is_empty() {
            self.bind_rels(rule_no, shape, &survivors)?;
        }
        if let Some(map) = data {
            for &rel in &survivors {
                self.replace_properties(Entity::Rel(rel), map)?;
            }
        }

        // Fold actual endpoints into previously unbound endpoint names.
        if !shape.start.name.is_empty() && !start_bound && !starts.is_empty() {
            self.put_node_set(rule_no, shape.start.name, starts)?;
        }
        if !shape.end.name.is_empty() && !end_bound && !ends.is_empty() {
            self.put_node_set(rule_no, shape.end.name, ends)?;
        }
        Ok(())
    }

    /// Case 2's search step: existing relationships between the bound
    /// endpoint sets, directional, optionally type-filtered; the two-way
    /// shape unions in the swapped search.
    fn search_rels(&mut self, shape: &RelShape<'_>) -> Result<Vec<RelId>> {
        let start_set = self.bound_endpoint_set(shape.start);
        let end_set = self.bound_endpoint_set(shape.end);

        let mut matches =
            self.search_directed(start_set.as_deref(), end_set.as_deref(), shape.rel.rel_type)?;
        if shape.two_way {
            for rel in
                self.search_directed(end_set.as_deref(), start_set.as_deref(), shape.rel.rel_type)?
            {
                if !matches.contains(&rel) {
                    matches.push(rel);
                }
            }
        }
        Ok(matches)
    }

    fn bound_endpoint_set(&self, node: NodeRef<'_>) -> Option<Vec<NodeId>> {
        if self.store.contains_node(node.name, node.index) {
            Some(self.store.node_set(node.name, node.index))
        } else {
            None
        }
    }

    fn search_directed(
        &mut self,
        starts: Option<&[NodeId]>,
        ends: Option<&[NodeId]>,
        rel_type: Option<&str>,
    ) -> Result<Vec<RelId>> {
        let mut matches = Vec::new();
        let mut push = |rel| {
            if !matches.contains(&rel) {
                matches.push(rel);
            }
        };
        match (starts, ends) {
            (Some(starts), Some(ends)) => {
                for &start in starts {
                    for rel in self.backend.rels(start, Direction::Outgoing, rel_type)? {
                        let (_, end) = self.backend.rel_endpoints(rel)?;
                        if ends.contains(&end) {
                            push(rel);
                        }
                    }
                }
            }
            (Some(starts), None) => {
                for &start in starts {
                    for rel in self.backend.rels(start, Direction::Outgoing, rel_type)? {
                        push(rel);
                    }
                }
            }
            (None, Some(ends)) => {
                for &end in ends {
                    for rel in self.backend.rels(end, Direction::Incoming, rel_type)? {
                        push(rel);
                    }
                }
            }
            // Neither endpoint is bound: nothing to search from.
            (None, None) => {}
        }
        Ok(matches)
    }

    /// Create the full cross-product of start set × end set (doubled for the
    /// two-way shape), implicitly creating unbound endpoints via the node
    /// rule. Creation needs a declared type, whatever the rule is named.
    fn create_rels(
        &mut self,
        rule_no: usize,
        shape: &RelShape<'_>,
        data: Option<&PropertyMap>,
    ) -> Result<()> {
        let Some(rel_type) = shape.rel.rel_type else {
            return Err(Error::rule(
                rule_no,
                "cannot create a relationship without a type",
            ));
        };

        let starts = self.resolve_endpoint(rule_no, shape.start)?;
        let ends = self.resolve_endpoint(rule_no, shape.end)?;

        let mut created = Vec::new();
        for &start in &starts {
            for &end in &ends {
                created.push(self.backend.create_rel(rel_type, start, end)?);
                if shape.two_way {
                    created.push(self.backend.create_rel(rel_type, end, start)?);
                }
            }
        }

        if let Some(map) = data {
            for &rel in &created {
                self.replace_properties(Entity::Rel(rel), map)?;
            }
        }
        self.bind_rels(rule_no, shape, &created)?;
        Ok(())
    }

    fn resolve_endpoint(&mut self, rule_no: usize, node: NodeRef<'_>) -> Result<Vec<NodeId>> {
        if self.store.contains_node(node.name, node.index) {
            Ok(self.store.node_set(node.name, node.index))
        } else {
            self.create_or_update_nodes(rule_no, node, None)
        }
    }

    /// Bind relationships under the rule's name. An explicit index on the
    /// rel token narrows the binding to a single element stored at that
    /// slot; index 0 binds the whole set. Returns what was actually bound.
    fn bind_rels(
        &mut self,
        rule_no: usize,
        shape: &RelShape<'_>,
        rels: &[RelId],
    ) -> Result<Vec<RelId>> {
        if shape.rel.name.is_empty() || rels.is_empty() {
            return Ok(rels.to_vec());
        }
        let bound;
        let ok = if shape.rel.index > 0 {
            bound = vec![rels[0]];
            self.store.put_rel(shape.rel.name, shape.rel.index, rels[0])
        } else {
            bound = rels.to_vec();
            self.store.put_rels(shape.rel.name, bound.clone())
        };
        if !ok {
            return Err(Error::rule(
                rule_no,
                format!("name {:?} is already bound", shape.rel.name),
            ));
        }
        Ok(bound)
    }

    fn put_node_set(&mut self, rule_no: usize, name: &str, nodes: Vec<NodeId>) -> Result<()> {
        if !self.store.put_nodes(name, nodes) {
            return Err(Error::rule(rule_no, format!("name {name:?} is already bound")));
        }
        Ok(())
    }

    /// Delete-mode relationship handling: remove the bound set, or search
    /// exactly as merge does and delete every match. Reflect shapes never
    /// mutate, in delete mode included.
    fn delete_rels(&mut self, shape: &RelShape<'_>) -> Result<()> {
        if shape.reflect {
            return Ok(());
        }
        let targets = if self.store.contains_rel(shape.rel.name, shape.rel.index) {
            self.store.remove_rels(shape.rel.name, shape.rel.index)
        } else {
            self.search_rels(shape)?
        };
        for rel in targets {
            self.backend.delete_rel(rel)?;
        }
        Ok(())
    }

    // ----- index rules -----

    fn apply_index(
        &mut self,
        rule_no: usize,
        entity: EntityRef<'_>,
        index_name: &str,
        data: Option<&PropertyMap>,
    ) -> Result<()> {
        if index_name.is_empty() {
            return Err(Error::rule(rule_no, "index entries need a named index"));
        }
        let Some(map) = data else {
            return Ok(());
        };
        // Pair by pair against a live store: the pair that creates or
        // reflects entities binds the name, so the next pair takes the
        // bound branch.
        for (key, raw) in map {
            let Some(value) = normalize_value(raw)? else {
                continue;
            };
            match self.mode {
                Mode::Merge => self.index_merge_pair(rule_no, entity, index_name, key, &value)?,
                Mode::Insert => self.index_insert_pair(rule_no, entity, index_name, key, &value)?,
                Mode::Delete => self.index_delete_pair(rule_no, entity, index_name, key, &value)?,
            }
        }
        Ok(())
    }

    fn index_merge_pair(
        &mut self,
        rule_no: usize,
        entity: EntityRef<'_>,
        index_name: &str,
        key: &str,
        value: &PropertyValue,
    ) -> Result<()> {
        if let Some(bound) = self.bound_index_entities(entity) {
            for item in bound {
                self.backend.index_add_if_absent(index_name, item, key, value)?;
            }
            return Ok(());
        }
        let hits = self.lookup_hits(entity, index_name, key, value)?;
        if !hits.is_empty() {
            // Reflect the union of hits into the namespace.
            self.bind_index_entities(rule_no, entity, &hits)?;
            return Ok(());
        }
        for item in self.create_index_entity(rule_no, entity)? {
            self.backend.index_add(index_name, item, key, value)?;
        }
        Ok(())
    }

    fn index_insert_pair(
        &mut self,
        rule_no: usize,
        entity: EntityRef<'_>,
        index_name: &str,
        key: &str,
        value: &PropertyValue,
    ) -> Result<()> {
        // Insert never consults the index, so repeated inserts accumulate
        // duplicate rows; that asymmetry with merge is load-bearing.
        let items = match self.bound_index_entities(entity) {
            Some(bound) => bound,
            None => self.create_index_entity(rule_no, entity)?,
        };
        for item in items {
            self.backend.index_add(index_name, item, key, value)?;
        }
        Ok(())
    }

    fn index_delete_pair(
        &mut self,
        rule_no: usize,
        entity: EntityRef<'_>,
        index_name: &str,
        key: &str,
        value: &PropertyValue,
    ) -> Result<()> {
        let items = match self.bound_index_entities(entity) {
            Some(bound) => bound,
            None => {
                let hits = self.lookup_hits(entity, index_name, key, value)?;
                // Bind the hits so earlier rules (later in delete order)
                // can remove the entities themselves.
                if !hits.is_empty() {
                    self.bind_index_entities(rule_no, entity, &hits)?;
                }
                hits
            }
        };
        for item in items {
            self.backend.index_remove(index_name, item, key, value)?;
        }
        Ok(())
    }

    fn bound_index_entities(&self, entity: EntityRef<'_>) -> Option<Vec<Entity>> {
        match entity {
            EntityRef::Node(node) => {
                if self.store.contains_node(node.name, node.index) {
                    Some(
                        self.store
                            .node_set(node.name, node.index)
                            .into_iter()
                            .map(Entity::Node)
                            .collect(),
                    )
                } else {
                    None
                }
            }
            EntityRef::Rel(rel) => {
                if self.store.contains_rel(rel.name, rel.index) {
                    Some(
                        self.store
                            .rel_set(rel.name, rel.index)
                            .into_iter()
                            .map(Entity::Rel)
                            .collect(),
                    )
                } else {
                    None
                }
            }
        }
    }

    /// Index hits of the matching entity kind only.
    fn lookup_hits(
        &mut self,
        entity: EntityRef<'_>,
        index_name: &str,
        key: &str,
        value: &PropertyValue,
    ) -> Result<Vec<Entity>> {
        let hits = self.backend.index_lookup(index_name, key, value)?;
        Ok(hits
            .into_iter()
            .filter(|hit| match entity {
                EntityRef::Node(_) => matches!(hit, Entity::Node(_)),
                EntityRef::Rel(_) => matches!(hit, Entity::Rel(_)),
            })
            .collect())
    }

    fn bind_index_entities(
        &mut self,
        rule_no: usize,
        entity: EntityRef<'_>,
        items: &[Entity],
    ) -> Result<()> {
        match entity {
            EntityRef::Node(node) => {
                if node.name.is_empty() {
                    return Ok(());
                }
                let ids = items.iter().filter_map(Entity::as_node).collect();
                self.put_node_set(rule_no, node.name, ids)
            }
            EntityRef::Rel(rel) => {
                if rel.name.is_empty() {
                    return Ok(());
                }
                let ids: Vec<RelId> = items.iter().filter_map(Entity::as_rel).collect();
                if !self.store.put_rels(rel.name, ids) {
                    return Err(Error::rule(
                        rule_no,
                        format!("name {:?} is already bound", rel.name),
                    ));
                }
                Ok(())
            }
        }
    }

    /// No binding, no hit: make the entity the index entry will point at.
    /// Node tokens create one node; rel tokens need a declared type and get
    /// a fresh relationship between two fresh anonymous nodes.
    fn create_index_entity(
        &mut self,
        rule_no: usize,
        entity: EntityRef<'_>,
    ) -> Result<Vec<Entity>> {
        match entity {
            EntityRef::Node(node) => Ok(self
                .create_or_update_nodes(rule_no, node, None)?
                .into_iter()
                .map(Entity::Node)
                .collect()),
            EntityRef::Rel(rel) => {
                let Some(rel_type) = rel.rel_type else {
                    return Err(Error::rule(
                        rule_no,
                        "cannot create a relationship without a type",
                    ));
                };
                let start = self.backend.create_node()?;
                let end = self.backend.create_node()?;
                let id = self.backend.create_rel(rel_type, start, end)?;
                if !rel.name.is_empty() && !self.store.put_rel(rel.name, rel.index, id) {
                    return Err(Error::rule(
                        rule_no,
                        format!("name {:?} is already bound", rel.name),
                    ));
                }
                Ok(vec![Entity::Rel(id)])
            }
        }
    }

    // ----- properties -----

    /// Full replacement: clear every existing key, then set every key from
    /// the map (normalized; nulls and empty lists are skipped).
    fn replace_properties(&mut self, entity: Entity, map: &PropertyMap) -> Result<()> {
        self.backend.clear_properties(entity)?;
        for (key, raw) in map {
            if let Some(value) = normalize_value(raw)? {
                self.backend.set_property(entity, key, value)?;
            }
        }
        Ok(())
    }
}

/// Property value normalization. `None` means "skip this pair" (null or
/// empty list). Lists homogenize: one scalar kind maps to the matching
/// array type, strings absorb other scalars, anything else is fatal.
pub(crate) fn normalize_value(raw: &Value) -> Result<Option<PropertyValue>> {
    let value = match raw {
        Value::Null => return Ok(None),
        Value::Bool(b) => PropertyValue::Bool(*b),
        Value::Number(n) => number_value(n)?,
        Value::String(s) => PropertyValue::Text(s.clone()),
        Value::Array(items) => {
            if items.is_empty() {
                return Ok(None);
            }
            normalize_list(items)?
        }
        Value::Object(_) => {
            return Err(Error::Value("unsupported property value: object".into()));
        }
    };
    Ok(Some(value))
}

fn number_value(n: &serde_json::Number) -> Result<PropertyValue> {
    if let Some(i) = n.as_i64() {
        Ok(PropertyValue::Int(i))
    } else if let Some(f) = n.as_f64() {
        Ok(PropertyValue::Float(f))
    } else {
        Err(Error::Value(format!("number out of range: {n}")))
    }
}

fn normalize_list(items: &[Value]) -> Result<PropertyValue> {
    let mut has_bool = false;
    let mut has_int = false;
    let mut has_float = false;
    let mut has_text = false;
    for item in items {
        match item {
            Value::Bool(_) => has_bool = true,
            Value::Number(n) => match number_value(n)? {
                PropertyValue::Int(_) => has_int = true,
                _ => has_float = true,
            },
            Value::String(_) => has_text = true,
            other => {
                return Err(Error::Value(format!(
                    "unsupported value in list: {other}"
                )));
            }
        }
    }

    if has_text {
        // Strings absorb the other scalar kinds.
        let texts = items
            .iter()
            .map(|item| match item {
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                Value::String(s) => s.clone(),
                _ => String::new(),
            })
            .collect();
        return Ok(PropertyValue::TextArray(texts));
    }
    match (has_bool, has_int, has_float) {
        (true, false, false) => Ok(PropertyValue::BoolArray(
            items.iter().filter_map(Value::as_bool).collect(),
        )),
        (false, true, false) => Ok(PropertyValue::IntArray(
            items.iter().filter_map(Value::as_i64).collect(),
        )),
        (false, false, true) => Ok(PropertyValue::FloatArray(
            items.iter().filter_map(Value::as_f64).collect(),
        )),
        _ => Err(Error::Value(
            "list mixes incompatible value kinds".into(),
        )),
    }
}
