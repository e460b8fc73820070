//! Per-invocation name → entity binding table.
//!
//! Names address either "the one entity named A" (index 0) or "the set
//! A.1, A.2, …" (numbered slots). A name is bound to nodes or to
//! relationships, never both. Once a slot is filled it stays filled for the
//! rest of the batch unless a delete rule removes the binding; `put`
//! reports an occupied slot by returning `false` instead of overwriting.

use std::collections::{BTreeMap, HashMap};

use geoff_api::{Entity, NodeId, RelId};

use crate::error::{Error, Result};
use crate::lexer::{Lexer, Token};

/// Bindings exchanged with the caller: decorated name (`"(A)"` for nodes,
/// `"[R]"` for relationships, `"(N.2)"` for set members) to backend entity.
pub type Bindings = BTreeMap<String, Entity>;

/// 1-based, possibly-sparse index → value map. Index 0 is the "whole named
/// thing" view: putting at 0 claims the singleton slot, getting at 0 reads
/// it back or unions every occupied slot.
#[derive(Debug, Clone, Default)]
pub struct SparseArray<V> {
    slots: BTreeMap<usize, V>,
    singleton: bool,
}

impl<V: Clone> SparseArray<V> {
    pub fn new() -> Self {
        Self {
            slots: BTreeMap::new(),
            singleton: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_singleton(&self) -> bool {
        self.singleton
    }

    /// Bind one value. Returns `false` without binding if the slot (or, for
    /// index 0, the whole name) is already occupied.
    pub fn put(&mut self, index: usize, value: V) -> bool {
        if self.singleton {
            return false;
        }
        if index == 0 {
            if !self.slots.is_empty() {
                return false;
            }
            self.slots.insert(1, value);
            self.singleton = true;
            true
        } else if self.slots.contains_key(&index) {
            false
        } else {
            self.slots.insert(index, value);
            true
        }
    }

    /// Bind a whole set at once (slots 1..=n). Fails if anything is bound.
    pub fn put_all(&mut self, values: Vec<V>) -> bool {
        if !self.slots.is_empty() || self.singleton {
            return false;
        }
        let single = values.len() == 1;
        for (offset, value) in values.into_iter().enumerate() {
            self.slots.insert(offset + 1, value);
        }
        self.singleton = single;
        true
    }

    pub fn contains(&self, index: usize) -> bool {
        if index == 0 {
            !self.slots.is_empty()
        } else {
            self.slots.contains_key(&index)
        }
    }

    /// The single value addressed by `index`: the lone entry for index 0,
    /// or the slot value for index N.
    pub fn get(&self, index: usize) -> Option<&V> {
        if index == 0 {
            if self.slots.len() == 1 {
                self.slots.values().next()
            } else {
                None
            }
        } else {
            self.slots.get(&index)
        }
    }

    /// Everything addressed by `index`: the union of occupied slots for
    /// index 0, or the one slot value for index N.
    pub fn values(&self, index: usize) -> Vec<V> {
        if index == 0 {
            self.slots.values().cloned().collect()
        } else {
            self.slots.get(&index).cloned().into_iter().collect()
        }
    }

    /// Detach and return bound values; an absent binding is an empty result.
    pub fn remove(&mut self, index: usize) -> Vec<V> {
        let removed = if index == 0 {
            std::mem::take(&mut self.slots).into_values().collect()
        } else {
            self.slots.remove(&index).into_iter().collect()
        };
        if self.slots.is_empty() {
            self.singleton = false;
        }
        removed
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &V)> {
        self.slots.iter().map(|(k, v)| (*k, v))
    }
}

/// The name → indexed-entity-set table for one merge/insert/delete call.
#[derive(Debug, Default)]
pub struct EntityStore {
    nodes: HashMap<String, SparseArray<NodeId>>,
    rels: HashMap<String, SparseArray<RelId>>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from caller-supplied decorated bindings.
    pub fn seeded(initial: &Bindings) -> Result<Self> {
        let mut store = EntityStore::new();
        for (key, entity) in initial {
            let ok = match (parse_decorated(key)?, entity) {
                (Token::Node { name, index }, Entity::Node(id)) => {
                    store.put_node(&name, index, *id)
                }
                (Token::Rel { name, index, .. }, Entity::Rel(id)) => {
                    store.put_rel(&name, index, *id)
                }
                _ => {
                    return Err(Error::Value(format!(
                        "binding {key:?} does not match its entity kind"
                    )));
                }
            };
            if !ok {
                return Err(Error::Value(format!("duplicate binding {key:?}")));
            }
        }
        Ok(store)
    }

    pub fn contains_node(&self, name: &str, index: usize) -> bool {
        !name.is_empty()
            && self
                .nodes
                .get(name)
                .is_some_and(|array| array.contains(index))
    }

    pub fn contains_rel(&self, name: &str, index: usize) -> bool {
        !name.is_empty()
            && self
                .rels
                .get(name)
                .is_some_and(|array| array.contains(index))
    }

    pub fn node_set(&self, name: &str, index: usize) -> Vec<NodeId> {
        self.nodes
            .get(name)
            .map(|array| array.values(index))
            .unwrap_or_default()
    }

    pub fn rel_set(&self, name: &str, index: usize) -> Vec<RelId> {
        self.rels
            .get(name)
            .map(|array| array.values(index))
            .unwrap_or_default()
    }

    pub fn put_node(&mut self, name: &str, index: usize, id: NodeId) -> bool {
        if name.is_empty() || self.rels.contains_key(name) {
            return false;
        }
        self.nodes.entry(name.to_string()).or_default().put(index, id)
    }

    pub fn put_nodes(&mut self, name: &str, ids: Vec<NodeId>) -> bool {
        if name.is_empty() || self.rels.contains_key(name) {
            return false;
        }
        self.nodes.entry(name.to_string()).or_default().put_all(ids)
    }

    pub fn put_rel(&mut self, name: &str, index: usize, id: RelId) -> bool {
        if name.is_empty() || self.nodes.contains_key(name) {
            return false;
        }
        self.rels.entry(name.to_string()).or_default().put(index, id)
    }

    pub fn put_rels(&mut self, name: &str, ids: Vec<RelId>) -> bool {
        if name.is_empty() || self.nodes.contains_key(name) {
            return false;
        }
        self.rels.entry(name.to_string()).or_default().put_all(ids)
    }

    pub fn remove_nodes(&mut self, name: &str, index: usize) -> Vec<NodeId> {
        let Some(array) = self.nodes.get_mut(name) else {
            return Vec::new();
        };
        let removed = array.remove(index);
        if array.is_empty() {
            self.nodes.remove(name);
        }
        removed
    }

    pub fn remove_rels(&mut self, name: &str, index: usize) -> Vec<RelId> {
        let Some(array) = self.rels.get_mut(name) else {
            return Vec::new();
        };
        let removed = array.remove(index);
        if array.is_empty() {
            self.rels.remove(name);
        }
        removed
    }

    /// Flatten to the caller-facing bindings map. Singleton bindings come
    /// out as `(name)` / `[name]`, multi-slot sets one entry per slot.
    pub fn flatten(&self) -> Bindings {
        let mut out = Bindings::new();
        for (name, array) in &self.nodes {
            flatten_array(&mut out, name, array, '(', ')', Entity::Node);
        }
        for (name, array) in &self.rels {
            flatten_array(&mut out, name, array, '[', ']', Entity::Rel);
        }
        out
    }
}

fn flatten_array<F: Fn(u64) -> Entity>(
    out: &mut Bindings,
    name: &str,
    array: &SparseArray<u64>,
    open: char,
    close: char,
    wrap: F,
) {
    if array.is_singleton() {
        if let Some(&id) = array.get(0) {
            out.insert(format!("{open}{name}{close}"), wrap(id));
        }
    } else {
        for (slot, &id) in array.iter() {
            out.insert(format!("{open}{name}.{slot}{close}"), wrap(id));
        }
    }
}

/// Parse one decorated binding key (`"(A)"`, `"[R]"`, `"(N.2)"`) into the
/// equivalent token.
fn parse_decorated(key: &str) -> Result<Token> {
    let tokens = Lexer::new(key)
        .tokenize()
        .map_err(|_| Error::Value(format!("malformed binding name {key:?}")))?;
    match tokens.as_slice() {
        [token @ Token::Node { name, .. }] | [token @ Token::Rel { name, .. }]
            if !name.is_empty() =>
        {
            Ok(token.clone())
        }
        _ => Err(Error::Value(format!("malformed binding name {key:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_at_zero_claims_the_singleton_slot() {
        let mut array = SparseArray::new();
        assert!(array.put(0, 7u64));
        assert!(!array.put(0, 8));
        assert!(!array.put(2, 8));
        assert_eq!(array.get(0), Some(&7));
        assert!(array.contains(0));
        assert!(array.is_singleton());
    }

    #[test]
    fn numbered_slots_are_independent() {
        let mut array = SparseArray::new();
        assert!(array.put(2, 20u64));
        assert!(array.put(5, 50));
        assert!(!array.put(2, 21));
        assert_eq!(array.get(2), Some(&20));
        assert_eq!(array.get(0), None); // two entries, no single value
        assert_eq!(array.values(0), vec![20, 50]);
        assert!(!array.put(0, 1)); // name already occupied
    }

    #[test]
    fn remove_detaches_and_empties() {
        let mut array = SparseArray::new();
        array.put(1, 1u64);
        array.put(2, 2);
        assert_eq!(array.remove(2), vec![2]);
        assert_eq!(array.remove(9), Vec::<u64>::new());
        assert_eq!(array.remove(0), vec![1]);
        assert!(array.is_empty());
    }

    #[test]
    fn names_bind_to_one_entity_kind_only() {
        let mut store = EntityStore::new();
        assert!(store.put_node("A", 0, 1));
        assert!(!store.put_rel("A", 0, 1));
        assert!(store.put_rel("R", 0, 9));
        assert!(!store.put_node("R", 0, 9));
    }

    #[test]
    fn seed_and_flatten_round_trip() {
        let mut initial = Bindings::new();
        initial.insert("(A)".to_string(), Entity::Node(3));
        initial.insert("(N.2)".to_string(), Entity::Node(4));
        initial.insert("[R]".to_string(), Entity::Rel(5));

        let store = EntityStore::seeded(&initial).unwrap();
        assert!(store.contains_node("A", 0));
        assert!(store.contains_node("N", 2));
        assert!(!store.contains_node("N", 1));
        assert!(store.contains_rel("R", 0));
        assert_eq!(store.flatten(), initial);
    }

    #[test]
    fn seed_rejects_bad_keys() {
        let mut initial = Bindings::new();
        initial.insert("A".to_string(), Entity::Node(1));
        assert!(EntityStore::seeded(&initial).is_err());

        let mut initial = Bindings::new();
        initial.insert("[R]".to_string(), Entity::Node(1));
        assert!(EntityStore::seeded(&initial).is_err());
    }

    #[test]
    fn multi_slot_bindings_flatten_per_slot() {
        let mut store = EntityStore::new();
        assert!(store.put_nodes("N", vec![10, 11]));
        let out = store.flatten();
        assert_eq!(out["(N.1)"], Entity::Node(10));
        assert_eq!(out["(N.2)"], Entity::Node(11));
        assert!(!out.contains_key("(N)"));
    }
}
