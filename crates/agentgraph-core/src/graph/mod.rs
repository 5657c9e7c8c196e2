//! Concurrent, write-through knowledge graph store

mod store;

pub use store::KnowledgeGraph;
