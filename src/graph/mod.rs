// src/graph/mod.rs

// Grafo de entidades em arena: identidades tipadas no lugar de ponteiros,
// relações mantidas pelo motor de consistência e mudanças rastreadas para o
// flush.

pub mod arena;
pub mod entity_graph;
pub mod id;
pub mod kind;
pub mod relation;
pub mod resource;
pub mod tracker;

pub use arena::{Arena, IdSet};
pub use entity_graph::{EntityGraph, UniqueConstraint, UNIQUE_CONSTRAINTS};
pub use id::{EntityId, Sequences};
pub use kind::{EntityKind, EntityRef};
pub(crate) use kind::with_resource;
pub use relation::Outcome;
pub use resource::Resource;
pub use tracker::ChangeSet;
