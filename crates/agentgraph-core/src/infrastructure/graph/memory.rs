//! In-memory graph repository
//!
//! Used for tests and for ephemeral graphs that never touch disk.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::graph::{GraphRepository, Node, Relationship};
use crate::error::{Error, Result};

#[derive(Default)]
struct Tables {
    nodes: HashMap<String, Node>,
    relationships: HashMap<String, Relationship>,
}

/// In-memory implementation of GraphRepository
#[derive(Default)]
pub struct InMemoryGraphRepository {
    tables: RwLock<Tables>,
}

impl InMemoryGraphRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GraphRepository for InMemoryGraphRepository {
    async fn save_node(&self, node: &Node) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.nodes.insert(node.id.clone(), node.clone());
        Ok(())
    }

    async fn save_relationship(&self, relationship: &Relationship) -> Result<()> {
        let mut tables = self.tables.write().await;
        for endpoint in [&relationship.source_id, &relationship.target_id] {
            if !tables.nodes.contains_key(endpoint) {
                return Err(Error::Persistence(format!(
                    "relationship {} references unknown node {}",
                    relationship.id, endpoint
                )));
            }
        }
        tables
            .relationships
            .insert(relationship.id.clone(), relationship.clone());
        Ok(())
    }

    async fn load_all(&self) -> Result<(Vec<Node>, Vec<Relationship>)> {
        let tables = self.tables.read().await;
        let mut nodes: Vec<Node> = tables.nodes.values().cloned().collect();
        let mut relationships: Vec<Relationship> = tables.relationships.values().cloned().collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        relationships.sort_by(|a, b| a.id.cmp(&b.id));
        Ok((nodes, relationships))
    }

    async fn replace_all(&self, nodes: &[Node], relationships: &[Relationship]) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.nodes = nodes.iter().map(|n| (n.id.clone(), n.clone())).collect();
        tables.relationships = relationships
            .iter()
            .map(|r| (r.id.clone(), r.clone()))
            .collect();
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.nodes.clear();
        tables.relationships.clear();
        Ok(())
    }

    async fn count_nodes(&self) -> Result<u64> {
        Ok(self.tables.read().await.nodes.len() as u64)
    }

    async fn count_relationships(&self) -> Result<u64> {
        Ok(self.tables.read().await.relationships.len() as u64)
    }
}
