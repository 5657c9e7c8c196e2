//! Request/response facade over the knowledge graph and agent selector
//!
//! Callers outside the crate (the CLI, an RPC layer) talk to
//! [`AgentGraphService`] instead of wiring the store and selector together
//! themselves. Strategy names arrive as strings and are validated here.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;

use crate::config::SelectionConfig;
use crate::domain::graph::{
    AgentStatus, GraphPath, GraphSnapshot, GraphStatistics, Node, NodeKind,
};
use crate::error::{Error, Result};
use crate::graph::KnowledgeGraph;
use crate::infrastructure::graph::SqliteGraphRepository;
use crate::selection::{
    AgentSelector, AgentSummary, SelectionAnalytics, SelectionResult, SelectionStrategy,
    TaskDescriptor,
};

/// Parameters of a recommendation; unset fields fall back to configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendRequest {
    pub task: TaskDescriptor,
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub max_agents: Option<usize>,
    #[serde(default)]
    pub min_confidence: Option<f64>,
}

impl RecommendRequest {
    pub fn new(task: TaskDescriptor) -> Self {
        Self {
            task,
            strategy: None,
            max_agents: None,
            min_confidence: None,
        }
    }

    pub fn with_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = Some(strategy.into());
        self
    }

    pub fn with_max_agents(mut self, max_agents: usize) -> Self {
        self.max_agents = Some(max_agents);
        self
    }

    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = Some(min_confidence);
        self
    }
}

/// Entry point for agent graph queries and selection
pub struct AgentGraphService {
    graph: Arc<KnowledgeGraph>,
    selector: AgentSelector,
    defaults: SelectionConfig,
}

impl AgentGraphService {
    pub fn new(graph: Arc<KnowledgeGraph>, defaults: SelectionConfig) -> Self {
        let selector = AgentSelector::with_history_capacity(graph.clone(), defaults.history_capacity);
        Self {
            graph,
            selector,
            defaults,
        }
    }

    /// Open a service over the graph persisted in `pool`
    pub async fn open(pool: SqlitePool, defaults: SelectionConfig) -> Result<Self> {
        let repository = Arc::new(SqliteGraphRepository::new(pool));
        let graph = KnowledgeGraph::open(repository).await?;
        Ok(Self::new(Arc::new(graph), defaults))
    }

    pub fn graph(&self) -> &Arc<KnowledgeGraph> {
        &self.graph
    }

    pub fn defaults(&self) -> &SelectionConfig {
        &self.defaults
    }

    /// Recommend agents for a task
    pub async fn recommend(&self, request: RecommendRequest) -> Result<SelectionResult> {
        let strategy: SelectionStrategy = request
            .strategy
            .as_deref()
            .unwrap_or(&self.defaults.default_strategy)
            .parse()?;
        let max_agents = request.max_agents.unwrap_or(self.defaults.max_agents);
        let min_confidence = request
            .min_confidence
            .unwrap_or(self.defaults.min_confidence);

        self.selector
            .select_agents(&request.task, strategy, max_agents, min_confidence)
            .await
    }

    pub fn recommend_strategy(&self, task: &TaskDescriptor) -> SelectionStrategy {
        AgentSelector::recommend_strategy(task)
    }

    /// Find an agent by id, falling back to an exact name match
    pub async fn resolve_agent(&self, id_or_name: &str) -> Result<Node> {
        let index = self.graph.read().await;
        let node = index
            .node(id_or_name)
            .or_else(|| index.find_by_name(NodeKind::Agent, id_or_name))
            .ok_or_else(|| Error::NodeNotFound(id_or_name.to_string()))?;

        if node.kind() != NodeKind::Agent {
            return Err(Error::InvalidInput(format!(
                "'{}' is a {}, not an agent",
                id_or_name,
                node.kind()
            )));
        }
        Ok(node.clone())
    }

    pub async fn get_collaborators(&self, agent: &str) -> Result<Vec<AgentSummary>> {
        let agent = self.resolve_agent(agent).await?;
        Ok(summarize(self.graph.find_collaborators(&agent.id).await))
    }

    pub async fn get_dependencies(&self, agent: &str) -> Result<Vec<AgentSummary>> {
        let agent = self.resolve_agent(agent).await?;
        Ok(summarize(self.graph.find_dependencies(&agent.id).await))
    }

    pub async fn get_agents_by_capability(&self, capability: &str) -> Vec<AgentSummary> {
        summarize(self.graph.find_agents_by_capability(capability).await)
    }

    /// Merge performance figures into an agent
    pub async fn update_performance(
        &self,
        agent: &str,
        metrics: &BTreeMap<String, f64>,
    ) -> Result<Node> {
        let agent = self.resolve_agent(agent).await?;
        let updated = self
            .graph
            .update_agent_performance(&agent.id, metrics)
            .await?;
        info!(agent_id = %updated.id, metrics = metrics.len(), "Performance updated");
        Ok(updated)
    }

    /// Record an agent's current load as reported by the scheduler
    pub async fn update_load(
        &self,
        agent: &str,
        current_tasks: u32,
        status: Option<AgentStatus>,
    ) -> Result<Node> {
        let agent = self.resolve_agent(agent).await?;
        self.graph
            .update_agent_load(&agent.id, current_tasks, status)
            .await
    }

    pub async fn get_optimal_sequence(&self, capabilities: &[String]) -> Vec<AgentSummary> {
        self.selector.optimal_sequence(capabilities).await
    }

    /// Path between two nodes given by id or agent name
    pub async fn find_path(
        &self,
        source: &str,
        target: &str,
        max_depth: usize,
    ) -> Result<Option<GraphPath>> {
        let source = self.resolve_node_id(source).await;
        let target = self.resolve_node_id(target).await;
        self.graph.find_path(&source, &target, max_depth).await
    }

    async fn resolve_node_id(&self, id_or_name: &str) -> String {
        let index = self.graph.read().await;
        if index.contains_node(id_or_name) {
            return id_or_name.to_string();
        }
        NodeKind::all()
            .iter()
            .find_map(|kind| index.find_by_name(*kind, id_or_name))
            .map(|node| node.id.clone())
            .unwrap_or_else(|| id_or_name.to_string())
    }

    pub async fn get_statistics(&self) -> GraphStatistics {
        self.graph.statistics().await
    }

    pub async fn selection_analytics(&self) -> SelectionAnalytics {
        self.selector.analytics().await
    }

    pub async fn export_json(&self, path: &Path) -> Result<GraphSnapshot> {
        self.graph.export_json(path).await
    }

    pub async fn import_json(&self, path: &Path) -> Result<GraphSnapshot> {
        self.graph.import_json(path).await
    }

    pub async fn reset(&self) -> Result<()> {
        self.graph.reset().await
    }
}

fn summarize(nodes: Vec<Node>) -> Vec<AgentSummary> {
    nodes.iter().filter_map(AgentSummary::from_node).collect()
}
