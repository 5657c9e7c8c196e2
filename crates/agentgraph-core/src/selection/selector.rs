//! Graph-based agent selector
//!
//! Reads the knowledge graph through one consistent view per call, scores
//! candidate agents and arranges them with the requested strategy. The
//! selector never mutates the graph; its only state is the selection
//! history.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::graph::{DEFAULT_AGENT_PRIORITY, GraphIndex, Node, TaskComplexity};
use crate::error::{Error, Result};
use crate::graph::KnowledgeGraph;

use super::analysis::TaskAnalyzer;
use super::history::{
    DEFAULT_HISTORY_CAPACITY, SelectionAnalytics, SelectionHistory, SelectionRecord,
};
use super::strategy::{
    ScoredAgent, collaborative, greedy, load_balanced, optimal_sequence, rank, resolve_adaptive,
};
use super::types::{
    AgentSummary, CapabilitySource, SelectionMetadata, SelectionResult, SelectionStrategy,
    TaskAnalysis, TaskDescriptor,
};

/// Picks agents for tasks from the knowledge graph
pub struct AgentSelector {
    graph: Arc<KnowledgeGraph>,
    history: SelectionHistory,
}

impl AgentSelector {
    pub fn new(graph: Arc<KnowledgeGraph>) -> Self {
        Self::with_history_capacity(graph, DEFAULT_HISTORY_CAPACITY)
    }

    pub fn with_history_capacity(graph: Arc<KnowledgeGraph>, capacity: usize) -> Self {
        Self {
            graph,
            history: SelectionHistory::new(capacity),
        }
    }

    pub fn graph(&self) -> &Arc<KnowledgeGraph> {
        &self.graph
    }

    /// Select agents for a task
    ///
    /// Finding nobody is not an error: the result is empty and its metadata
    /// carries a note saying why.
    pub async fn select_agents(
        &self,
        task: &TaskDescriptor,
        strategy: SelectionStrategy,
        max_agents: usize,
        min_confidence: f64,
    ) -> Result<SelectionResult> {
        validate_request(task, max_agents, min_confidence)?;

        let analysis = TaskAnalyzer::analyze(task);
        let result = {
            let index = self.graph.read().await;
            select_from_index(&index, &analysis, strategy, max_agents, min_confidence)
        };

        self.history
            .record(SelectionRecord::new(task, &result))
            .await;

        info!(
            task_type = %task.task_type,
            strategy = %strategy,
            resolved = %result.resolved_strategy,
            selected = result.agents.len(),
            total_confidence = result.total_confidence,
            "Agents selected"
        );
        Ok(result)
    }

    /// Dependency-respecting order over agents covering `capabilities`
    ///
    /// Not tied to a task and not recorded in the history.
    pub async fn optimal_sequence(&self, capabilities: &[String]) -> Vec<AgentSummary> {
        let descriptor = TaskDescriptor::new("").with_capabilities(capabilities.iter().cloned());
        let analysis = TaskAnalysis {
            task_type: None,
            required_capabilities: TaskAnalyzer::analyze(&descriptor).required_capabilities,
            capability_source: CapabilitySource::Explicit,
            complexity: TaskComplexity::Medium,
            complexity_score: TaskComplexity::Medium.score(),
            priority: DEFAULT_AGENT_PRIORITY,
        };

        let index = self.graph.read().await;
        select_from_index(
            &index,
            &analysis,
            SelectionStrategy::OptimalSequence,
            usize::MAX,
            0.0,
        )
        .agents
    }

    /// Strategy suited to a task's complexity and breadth
    pub fn recommend_strategy(task: &TaskDescriptor) -> SelectionStrategy {
        let analysis = TaskAnalyzer::analyze(task);
        let capabilities = analysis.required_capabilities.len();
        let complexity = analysis.complexity_score;

        if complexity < 0.3 && capabilities <= 1 {
            SelectionStrategy::Greedy
        } else if complexity >= 0.7 || capabilities > 3 {
            SelectionStrategy::Collaborative
        } else if capabilities > 1 {
            SelectionStrategy::OptimalSequence
        } else {
            SelectionStrategy::LoadBalanced
        }
    }

    pub async fn analytics(&self) -> SelectionAnalytics {
        self.history.analytics().await
    }

    pub async fn recent_selections(&self, limit: usize) -> Vec<SelectionRecord> {
        self.history.recent(limit).await
    }
}

fn validate_request(task: &TaskDescriptor, max_agents: usize, min_confidence: f64) -> Result<()> {
    if max_agents == 0 {
        return Err(Error::InvalidInput("max_agents must be at least 1".into()));
    }
    if !(0.0..=1.0).contains(&min_confidence) {
        return Err(Error::InvalidInput(format!(
            "min_confidence must be between 0 and 1, got {}",
            min_confidence
        )));
    }
    if !(0..=10).contains(&task.priority) {
        return Err(Error::InvalidInput(format!(
            "task priority must be between 0 and 10, got {}",
            task.priority
        )));
    }
    Ok(())
}

/// Run a selection against one view of the graph
///
/// Pure: the same index and inputs always give the same result.
pub fn select_from_index(
    index: &GraphIndex,
    analysis: &TaskAnalysis,
    strategy: SelectionStrategy,
    max_agents: usize,
    min_confidence: f64,
) -> SelectionResult {
    let candidates = candidate_agents(index, &analysis.required_capabilities);
    let candidates_considered = candidates.len();

    let mut qualified: Vec<ScoredAgent<'_>> = candidates
        .into_iter()
        .filter_map(|node| ScoredAgent::new(node, analysis))
        .filter(|agent| agent.score.confidence >= min_confidence)
        .collect();
    rank(&mut qualified);

    let resolved_strategy = match strategy {
        SelectionStrategy::Adaptive => resolve_adaptive(analysis.complexity_score),
        other => other,
    };

    let outcome = match resolved_strategy {
        SelectionStrategy::Greedy | SelectionStrategy::Adaptive => greedy(&qualified),
        SelectionStrategy::OptimalSequence => optimal_sequence(index, &qualified, max_agents),
        SelectionStrategy::Collaborative => {
            collaborative(index, analysis, &qualified, max_agents, min_confidence)
        }
        SelectionStrategy::LoadBalanced => load_balanced(&qualified, max_agents),
    };

    let note = if candidates_considered == 0 && !analysis.required_capabilities.is_empty() {
        Some(format!(
            "no agent offers any of the required capabilities: {}",
            analysis.required_capabilities.join(", ")
        ))
    } else if candidates_considered == 0 {
        Some("the graph holds no agents".to_string())
    } else if qualified.is_empty() {
        Some(format!(
            "0 qualified candidates: none of {} reached confidence {:.2}",
            candidates_considered, min_confidence
        ))
    } else {
        None
    };

    let total_confidence = if outcome.selected.is_empty() {
        0.0
    } else {
        outcome
            .selected
            .iter()
            .map(|a| a.score.confidence)
            .sum::<f64>()
            / outcome.selected.len() as f64
    };

    debug!(
        candidates = candidates_considered,
        qualified = qualified.len(),
        resolved = %resolved_strategy,
        "Selection computed"
    );

    SelectionResult {
        agents: outcome
            .selected
            .iter()
            .filter_map(|a| AgentSummary::from_node(a.node))
            .collect(),
        scores: outcome.selected.iter().map(|a| a.score.clone()).collect(),
        strategy,
        resolved_strategy,
        execution_plan: outcome.plan,
        total_confidence,
        metadata: SelectionMetadata {
            candidates_considered,
            qualified_candidates: qualified.len(),
            min_confidence,
            max_agents,
            complexity_score: analysis.complexity_score,
            required_capabilities: analysis.required_capabilities.clone(),
            capability_source: analysis.capability_source,
            note,
        },
    }
}

/// Agents holding at least one required capability, or every agent
fn candidate_agents<'a>(index: &'a GraphIndex, required: &[String]) -> Vec<&'a Node> {
    if required.is_empty() {
        return index.agents();
    }
    let ids: BTreeSet<&str> = required
        .iter()
        .flat_map(|capability| index.agents_with_capability(capability))
        .map(|node| node.id.as_str())
        .collect();
    ids.into_iter().filter_map(|id| index.node(id)).collect()
}
