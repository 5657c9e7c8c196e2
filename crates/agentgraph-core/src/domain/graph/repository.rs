//! Repository trait for graph persistence
//!
//! The store writes every mutation through a [`GraphRepository`] before it
//! touches the in-memory index. The trait abstracts over storage backends
//! (SQLite in production, an in-memory map for tests).

use async_trait::async_trait;

use crate::error::Result;

use super::node::Node;
use super::relationship::Relationship;

/// Durable storage for nodes and relationships
#[async_trait]
pub trait GraphRepository: Send + Sync {
    /// Save a node (insert or replace by id)
    async fn save_node(&self, node: &Node) -> Result<()>;

    /// Save a relationship (insert or replace by id)
    async fn save_relationship(&self, relationship: &Relationship) -> Result<()>;

    /// Load every persisted node and relationship
    async fn load_all(&self) -> Result<(Vec<Node>, Vec<Relationship>)>;

    /// Atomically replace all persisted state
    async fn replace_all(&self, nodes: &[Node], relationships: &[Relationship]) -> Result<()>;

    /// Remove all nodes and relationships
    async fn clear(&self) -> Result<()>;

    /// Count persisted nodes
    async fn count_nodes(&self) -> Result<u64>;

    /// Count persisted relationships
    async fn count_relationships(&self) -> Result<u64>;
}
