//! The agent knowledge graph store
//!
//! [`KnowledgeGraph`] owns every node and relationship. Reads go through a
//! shared lock on a single [`GraphIndex`], so one call always observes a
//! consistent view of nodes and relationships together. Writes are
//! serialized by a writer gate and follow a persist-then-apply discipline:
//! the repository is written first, without holding the index lock, and the
//! index is only updated once the durable write succeeded. A failed durable
//! write therefore leaves the in-memory graph untouched.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock, RwLockReadGuard};
use tracing::{debug, info, warn};

use crate::domain::graph::{
    AgentStatus, ExecutionEntry, GraphIndex, GraphPath, GraphRepository, GraphSnapshot,
    GraphStatistics, Node, NodeKind, Relationship,
};
use crate::error::{Error, Result};
use crate::infrastructure::graph::InMemoryGraphRepository;

/// Typed graph of agents, capabilities, tasks, workflows and knowledge
pub struct KnowledgeGraph {
    index: RwLock<GraphIndex>,
    writer: Mutex<()>,
    repository: Arc<dyn GraphRepository>,
}

impl KnowledgeGraph {
    /// Open a graph backed by `repository`, loading everything it holds
    pub async fn open(repository: Arc<dyn GraphRepository>) -> Result<Self> {
        let (nodes, relationships) = repository.load_all().await?;
        let index = GraphIndex::from_parts(nodes, relationships)?;

        info!(
            nodes = index.node_count(),
            relationships = index.relationship_count(),
            "Knowledge graph loaded"
        );

        Ok(Self {
            index: RwLock::new(index),
            writer: Mutex::new(()),
            repository,
        })
    }

    /// An empty graph that persists only in memory
    pub fn in_memory() -> Self {
        Self {
            index: RwLock::new(GraphIndex::new()),
            writer: Mutex::new(()),
            repository: Arc::new(InMemoryGraphRepository::new()),
        }
    }

    /// Shared access to the index for multi-step reads over one consistent view
    pub async fn read(&self) -> RwLockReadGuard<'_, GraphIndex> {
        self.index.read().await
    }

    // ========== Writes ==========

    /// Insert or replace a node by id
    ///
    /// When the id already exists its `created_at` is kept. `updated_at` is
    /// refreshed either way. Returns the node as stored.
    pub async fn add_node(&self, mut node: Node) -> Result<Node> {
        let _writer = self.writer.lock().await;

        if let Some(existing) = self.index.read().await.node(&node.id) {
            node.created_at = existing.created_at;
        }
        node.touch();

        self.persist_node(&node).await?;
        self.index.write().await.insert_node(node.clone());

        debug!(node_id = %node.id, kind = %node.kind(), name = %node.name, "Node added");
        Ok(node)
    }

    /// Insert or replace a relationship by id
    ///
    /// Both endpoints must already exist.
    pub async fn add_relationship(&self, mut relationship: Relationship) -> Result<Relationship> {
        let _writer = self.writer.lock().await;

        {
            let index = self.index.read().await;
            index.check_endpoints(&relationship)?;
            if let Some(existing) = index.relationship(&relationship.id) {
                relationship.created_at = existing.created_at;
            }
        }
        relationship.touch();

        if let Err(e) = self.repository.save_relationship(&relationship).await {
            warn!(relationship_id = %relationship.id, error = %e, "Failed to persist relationship");
            return Err(Error::Persistence(format!(
                "relationship {}: {}",
                relationship.id, e
            )));
        }
        self.index
            .write()
            .await
            .insert_relationship(relationship.clone());

        debug!(
            relationship_id = %relationship.id,
            source = %relationship.source_id,
            target = %relationship.target_id,
            relationship_type = %relationship.relationship_type,
            "Relationship added"
        );
        Ok(relationship)
    }

    /// Merge metrics into an agent's `performance_metrics`
    pub async fn update_agent_performance(
        &self,
        agent_id: &str,
        metrics: &BTreeMap<String, f64>,
    ) -> Result<Node> {
        self.mutate_node(agent_id, |node| {
            let profile = node
                .as_agent_mut()
                .ok_or_else(|| Error::InvalidInput(format!("node {} is not an agent", agent_id)))?;
            for (name, value) in metrics {
                profile.performance_metrics.insert(name.clone(), *value);
            }
            Ok(())
        })
        .await
    }

    /// Record the externally observed load of an agent
    pub async fn update_agent_load(
        &self,
        agent_id: &str,
        current_tasks: u32,
        status: Option<AgentStatus>,
    ) -> Result<Node> {
        self.mutate_node(agent_id, |node| {
            let profile = node
                .as_agent_mut()
                .ok_or_else(|| Error::InvalidInput(format!("node {} is not an agent", agent_id)))?;
            profile.current_tasks = current_tasks;
            if let Some(status) = status {
                profile.status = status;
            }
            Ok(())
        })
        .await
    }

    /// Append an entry to a task's execution history
    pub async fn record_task_execution(&self, task_id: &str, entry: ExecutionEntry) -> Result<Node> {
        self.mutate_node(task_id, |node| {
            let spec = node
                .as_task_mut()
                .ok_or_else(|| Error::InvalidInput(format!("node {} is not a task", task_id)))?;
            spec.execution_history.push(entry);
            Ok(())
        })
        .await
    }

    /// Bump the usage counter of the capability called `name`
    pub async fn record_capability_usage(&self, name: &str) -> Result<Node> {
        let id = self
            .index
            .read()
            .await
            .find_by_name(NodeKind::Capability, name)
            .map(|node| node.id.clone())
            .ok_or_else(|| Error::NodeNotFound(name.to_string()))?;

        self.mutate_node(&id, |node| {
            if let Some(spec) = node.as_capability_mut() {
                spec.usage_frequency += 1;
            }
            Ok(())
        })
        .await
    }

    async fn mutate_node<F>(&self, id: &str, mutate: F) -> Result<Node>
    where
        F: FnOnce(&mut Node) -> Result<()>,
    {
        let _writer = self.writer.lock().await;

        let mut node = self
            .index
            .read()
            .await
            .node(id)
            .cloned()
            .ok_or_else(|| Error::NodeNotFound(id.to_string()))?;
        mutate(&mut node)?;
        node.touch();

        self.persist_node(&node).await?;
        self.index.write().await.insert_node(node.clone());

        debug!(node_id = %node.id, "Node updated");
        Ok(node)
    }

    async fn persist_node(&self, node: &Node) -> Result<()> {
        self.repository.save_node(node).await.map_err(|e| {
            warn!(node_id = %node.id, error = %e, "Failed to persist node");
            Error::Persistence(format!("node {}: {}", node.id, e))
        })
    }

    // ========== Reads ==========

    pub async fn get_node(&self, id: &str) -> Option<Node> {
        self.index.read().await.node(id).cloned()
    }

    /// Like [`get_node`](Self::get_node) but unknown ids are an error
    pub async fn require_node(&self, id: &str) -> Result<Node> {
        self.get_node(id)
            .await
            .ok_or_else(|| Error::NodeNotFound(id.to_string()))
    }

    pub async fn get_nodes_by_kind(&self, kind: NodeKind) -> Vec<Node> {
        self.index
            .read()
            .await
            .nodes_by_kind(kind)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn get_node_relationships(&self, id: &str) -> Vec<Relationship> {
        self.index
            .read()
            .await
            .node_relationships(id)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn find_agents_by_capability(&self, capability: &str) -> Vec<Node> {
        self.index
            .read()
            .await
            .agents_with_capability(capability)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn find_collaborators(&self, agent_id: &str) -> Vec<Node> {
        self.index
            .read()
            .await
            .collaborators(agent_id)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn find_dependencies(&self, agent_id: &str) -> Vec<Node> {
        self.index
            .read()
            .await
            .dependencies(agent_id)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Hop-bounded breadth-first path search; see [`GraphIndex::find_path`]
    pub async fn find_path(
        &self,
        source_id: &str,
        target_id: &str,
        max_depth: usize,
    ) -> Result<Option<GraphPath>> {
        self.index
            .read()
            .await
            .find_path(source_id, target_id, max_depth)
    }

    pub async fn statistics(&self) -> GraphStatistics {
        self.index.read().await.statistics()
    }

    // ========== Snapshots ==========

    /// Export every node and relationship with current statistics
    pub async fn export_snapshot(&self) -> GraphSnapshot {
        let index = self.index.read().await;
        GraphSnapshot {
            exported_at: Utc::now(),
            nodes: index.sorted_nodes(),
            relationships: index.sorted_relationships(),
            statistics: index.statistics(),
        }
    }

    /// Replace the whole graph with the contents of a snapshot
    ///
    /// Nodes and relationships are restored exactly, timestamps included.
    pub async fn load(&self, snapshot: &GraphSnapshot) -> Result<()> {
        let _writer = self.writer.lock().await;

        let index =
            GraphIndex::from_parts(snapshot.nodes.clone(), snapshot.relationships.clone())?;

        self.repository
            .replace_all(&snapshot.nodes, &snapshot.relationships)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to persist snapshot");
                Error::Persistence(format!("snapshot load: {}", e))
            })?;
        *self.index.write().await = index;

        info!(
            nodes = snapshot.nodes.len(),
            relationships = snapshot.relationships.len(),
            "Snapshot loaded"
        );
        Ok(())
    }

    /// Write a snapshot to `path` as pretty-printed JSON
    pub async fn export_json(&self, path: &Path) -> Result<GraphSnapshot> {
        let snapshot = self.export_snapshot().await;
        let contents = serde_json::to_string_pretty(&snapshot)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(path, contents).await?;

        info!(path = %path.display(), nodes = snapshot.nodes.len(), "Graph exported");
        Ok(snapshot)
    }

    /// Load a snapshot previously written by [`export_json`](Self::export_json)
    pub async fn import_json(&self, path: &Path) -> Result<GraphSnapshot> {
        let contents = tokio::fs::read_to_string(path).await?;
        let snapshot: GraphSnapshot = serde_json::from_str(&contents)?;
        self.load(&snapshot).await?;
        Ok(snapshot)
    }

    /// Remove every node and relationship. Irreversible.
    pub async fn reset(&self) -> Result<()> {
        let _writer = self.writer.lock().await;

        self.repository.clear().await.map_err(|e| {
            warn!(error = %e, "Failed to clear persisted graph");
            Error::Persistence(format!("reset: {}", e))
        })?;
        *self.index.write().await = GraphIndex::new();

        info!("Knowledge graph reset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::graph::{
        AgentProfile, CapabilityCategory, CapabilitySpec, RelationshipType, TaskComplexity,
        TaskSpec,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Repository whose writes can be switched to fail
    #[derive(Default)]
    struct FlakyRepository {
        inner: InMemoryGraphRepository,
        failing: AtomicBool,
    }

    impl FlakyRepository {
        fn check(&self) -> Result<()> {
            if self.failing.load(Ordering::SeqCst) {
                Err(Error::Other("disk unavailable".into()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl GraphRepository for FlakyRepository {
        async fn save_node(&self, node: &Node) -> Result<()> {
            self.check()?;
            self.inner.save_node(node).await
        }
        async fn save_relationship(&self, relationship: &Relationship) -> Result<()> {
            self.check()?;
            self.inner.save_relationship(relationship).await
        }
        async fn load_all(&self) -> Result<(Vec<Node>, Vec<Relationship>)> {
            self.inner.load_all().await
        }
        async fn replace_all(&self, nodes: &[Node], relationships: &[Relationship]) -> Result<()> {
            self.check()?;
            self.inner.replace_all(nodes, relationships).await
        }
        async fn clear(&self) -> Result<()> {
            self.check()?;
            self.inner.clear().await
        }
        async fn count_nodes(&self) -> Result<u64> {
            self.inner.count_nodes().await
        }
        async fn count_relationships(&self) -> Result<u64> {
            self.inner.count_relationships().await
        }
    }

    fn agent(name: &str, capabilities: &[&str]) -> Node {
        Node::agent(
            name,
            AgentProfile::new("coder").with_capabilities(capabilities.iter().copied()),
        )
    }

    #[tokio::test]
    async fn test_writes_are_immediately_readable() {
        let graph = KnowledgeGraph::in_memory();
        let a = graph.add_node(agent("a", &["coding"])).await.unwrap();
        let b = graph.add_node(agent("b", &["testing"])).await.unwrap();
        let rel = graph
            .add_relationship(Relationship::new(&b.id, &a.id, RelationshipType::DependsOn))
            .await
            .unwrap();

        assert_eq!(graph.get_node(&a.id).await, Some(a.clone()));
        assert_eq!(graph.get_nodes_by_kind(NodeKind::Agent).await.len(), 2);
        assert_eq!(graph.get_node_relationships(&a.id).await, vec![rel.clone()]);
        assert_eq!(graph.find_dependencies(&b.id).await, vec![a.clone()]);
        assert!(graph.find_collaborators(&b.id).await.is_empty());
        assert_eq!(graph.find_agents_by_capability("testing").await, vec![b]);
    }

    #[tokio::test]
    async fn test_replace_keeps_created_at() {
        let graph = KnowledgeGraph::in_memory();
        let original = graph.add_node(agent("a", &[])).await.unwrap();

        let mut replacement = agent("a-renamed", &["coding"]).with_id(original.id.clone());
        replacement.created_at = Utc::now() + chrono::Duration::days(1);
        let stored = graph.add_node(replacement).await.unwrap();

        assert_eq!(stored.created_at, original.created_at);
        assert!(stored.updated_at >= stored.created_at);
        assert_eq!(graph.get_nodes_by_kind(NodeKind::Agent).await.len(), 1);
        assert_eq!(graph.require_node(&original.id).await.unwrap().name, "a-renamed");
    }

    #[tokio::test]
    async fn test_relationship_requires_existing_endpoints() {
        let graph = KnowledgeGraph::in_memory();
        let a = graph.add_node(agent("a", &[])).await.unwrap();

        let err = graph
            .add_relationship(Relationship::new(&a.id, "ghost", RelationshipType::DependsOn))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ReferentialIntegrity { ref missing_node_id, .. } if missing_node_id == "ghost"));
        assert!(graph.get_node_relationships(&a.id).await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_persistence_leaves_index_untouched() {
        let repo = Arc::new(FlakyRepository::default());
        let graph = KnowledgeGraph::open(repo.clone()).await.unwrap();
        let a = graph.add_node(agent("a", &[])).await.unwrap();

        repo.failing.store(true, Ordering::SeqCst);

        let err = graph.add_node(agent("b", &[])).await.unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));
        assert_eq!(graph.get_nodes_by_kind(NodeKind::Agent).await.len(), 1);

        let mut metrics = BTreeMap::new();
        metrics.insert("success_rate".to_string(), 0.1);
        assert!(graph.update_agent_performance(&a.id, &metrics).await.is_err());
        let unchanged = graph.require_node(&a.id).await.unwrap();
        assert!(unchanged.as_agent().unwrap().performance_metrics.is_empty());

        assert!(graph.reset().await.is_err());
        assert_eq!(graph.statistics().await.total_nodes, 1);

        repo.failing.store(false, Ordering::SeqCst);
        graph.add_node(agent("b", &[])).await.unwrap();
        assert_eq!(graph.statistics().await.total_nodes, 2);
    }

    #[tokio::test]
    async fn test_update_agent_performance_merges() {
        let graph = KnowledgeGraph::in_memory();
        let a = graph
            .add_node(Node::agent(
                "a",
                AgentProfile::new("coder").with_metric("success_rate", 0.5),
            ))
            .await
            .unwrap();

        let mut metrics = BTreeMap::new();
        metrics.insert("average_response_time".to_string(), 12.0);
        let updated = graph.update_agent_performance(&a.id, &metrics).await.unwrap();

        let perf = &updated.as_agent().unwrap().performance_metrics;
        assert_eq!(perf["success_rate"], 0.5);
        assert_eq!(perf["average_response_time"], 12.0);
        assert!(updated.updated_at >= a.updated_at);

        assert!(matches!(
            graph.update_agent_performance("nope", &metrics).await,
            Err(Error::NodeNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_performance_rejects_non_agent() {
        let graph = KnowledgeGraph::in_memory();
        let cap = graph
            .add_node(Node::capability(
                "coding",
                CapabilitySpec::new(CapabilityCategory::Development),
            ))
            .await
            .unwrap();

        let err = graph
            .update_agent_performance(&cap.id, &BTreeMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_agent_load_and_task_history() {
        let graph = KnowledgeGraph::in_memory();
        let a = graph.add_node(agent("a", &[])).await.unwrap();
        let task = graph
            .add_node(Node::task("t", TaskSpec::new("feature", TaskComplexity::Medium)))
            .await
            .unwrap();

        let loaded = graph
            .update_agent_load(&a.id, 2, Some(AgentStatus::Busy))
            .await
            .unwrap();
        let profile = loaded.as_agent().unwrap();
        assert_eq!(profile.current_tasks, 2);
        assert_eq!(profile.status, AgentStatus::Busy);

        graph
            .record_task_execution(&task.id, ExecutionEntry::new("started").with_agent(&a.id))
            .await
            .unwrap();
        let updated = graph
            .record_task_execution(&task.id, ExecutionEntry::new("completed"))
            .await
            .unwrap();
        match &updated.payload {
            crate::domain::graph::NodePayload::Task(spec) => {
                let outcomes: Vec<&str> = spec
                    .execution_history
                    .iter()
                    .map(|e| e.outcome.as_str())
                    .collect();
                assert_eq!(outcomes, vec!["started", "completed"]);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_capability_usage_counter() {
        let graph = KnowledgeGraph::in_memory();
        graph
            .add_node(Node::capability(
                "coding",
                CapabilitySpec::new(CapabilityCategory::Development),
            ))
            .await
            .unwrap();

        graph.record_capability_usage("coding").await.unwrap();
        let node = graph.record_capability_usage("coding").await.unwrap();
        assert_eq!(node.as_capability().unwrap().usage_frequency, 2);
        assert!(graph.record_capability_usage("juggling").await.is_err());
    }

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let graph = KnowledgeGraph::in_memory();
        let a = graph.add_node(agent("a", &["coding"]).with_tag("core")).await.unwrap();
        let b = graph.add_node(agent("b", &["testing"])).await.unwrap();
        graph
            .add_relationship(
                Relationship::new(&a.id, &b.id, RelationshipType::CollaboratesWith)
                    .with_strength(0.25),
            )
            .await
            .unwrap();

        let snapshot = graph.export_snapshot().await;
        assert_eq!(snapshot.statistics.total_nodes, 2);

        let restored = KnowledgeGraph::in_memory();
        restored.load(&snapshot).await.unwrap();
        let again = restored.export_snapshot().await;

        assert_eq!(again.nodes, snapshot.nodes);
        assert_eq!(again.relationships, snapshot.relationships);
        assert_eq!(again.statistics, snapshot.statistics);
    }

    #[tokio::test]
    async fn test_load_rejects_dangling_snapshot() {
        let graph = KnowledgeGraph::in_memory();
        let a = graph.add_node(agent("a", &[])).await.unwrap();

        let mut snapshot = graph.export_snapshot().await;
        snapshot
            .relationships
            .push(Relationship::new(&a.id, "ghost", RelationshipType::Follows));

        assert!(graph.load(&snapshot).await.is_err());
        assert_eq!(graph.statistics().await.total_relationships, 0);
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let graph = KnowledgeGraph::in_memory();
        let a = graph.add_node(agent("a", &[])).await.unwrap();
        let b = graph.add_node(agent("b", &[])).await.unwrap();
        graph
            .add_relationship(Relationship::new(&a.id, &b.id, RelationshipType::Follows))
            .await
            .unwrap();

        graph.reset().await.unwrap();

        let stats = graph.statistics().await;
        assert_eq!(stats.total_nodes, 0);
        assert_eq!(stats.total_relationships, 0);
        assert!(graph.get_node(&a.id).await.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_reads_during_writes() {
        let graph = Arc::new(KnowledgeGraph::in_memory());
        let mut handles = Vec::new();
        for i in 0..16 {
            let graph = graph.clone();
            handles.push(tokio::spawn(async move {
                graph.add_node(agent(&format!("agent-{i}"), &["coding"])).await.unwrap();
                graph.find_agents_by_capability("coding").await.len()
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap() >= 1);
        }
        assert_eq!(graph.find_agents_by_capability("coding").await.len(), 16);
    }
}
