//! # Geoff
//!
//! A textual notation for describing nodes, relationships and index entries
//! of a property graph, plus the engine that applies a batch of such
//! descriptions against a graph store as idempotent patches (`merge`),
//! unconditional creations (`insert`), or removals (`delete`).
//!
//! ```text
//! (A) {"name": "Alice"}
//! (B) {"name": "Bob"}
//! (A)-[R:KNOWS]->(B) {"since": 1977}
//! (A)<=|People| {"name": "Alice"}
//! ```
//!
//! Each line is one rule. Lines run in order and share a name → entity
//! binding table, so `(A)` on the third line refers to the node the first
//! line created. The engine works against any [`geoff_api::GraphBackend`];
//! `geoff-store` ships an in-memory one.
//!
//! ```ignore
//! use geoff::{Subgraph, insert, Bindings};
//!
//! let subgraph: Subgraph = "(A)-[R:KNOWS]->(B)".parse()?;
//! let mut store = geoff_store::GraphStore::new();
//! let out = insert(&subgraph, &mut store, &Bindings::new())?;
//! assert!(out.contains_key("[R]"));
//! ```
//!
//! The whole batch is meant to run inside one backend transaction: any error
//! aborts the remaining rules, and the caller owns rollback.

pub mod ast;
pub mod error;
pub mod executor;
pub mod lexer;
pub mod parser;
pub mod store;

pub use ast::{Descriptor, PropertyMap, Rule, Subgraph};
pub use error::{Error, Result};
pub use store::Bindings;

use geoff_api::GraphBackend;

/// Apply a subgraph as an idempotent patch: reuse and update matching
/// entities where the rules can find them, create otherwise.
pub fn merge<B: GraphBackend>(
    subgraph: &Subgraph,
    backend: &mut B,
    initial_bindings: &Bindings,
) -> Result<Bindings> {
    executor::merge(subgraph, backend, initial_bindings)
}

/// Apply a subgraph creating new entities for every name that is unbound at
/// the time its rule runs; never searches, so anonymous constructs duplicate
/// on repeat application.
pub fn insert<B: GraphBackend>(
    subgraph: &Subgraph,
    backend: &mut B,
    initial_bindings: &Bindings,
) -> Result<Bindings> {
    executor::insert(subgraph, backend, initial_bindings)
}

/// Apply a subgraph in reverse rule order, removing bound or matched
/// entities.
pub fn delete<B: GraphBackend>(
    subgraph: &Subgraph,
    backend: &mut B,
    initial_bindings: &Bindings,
) -> Result<Bindings> {
    executor::delete(subgraph, backend, initial_bindings)
}
