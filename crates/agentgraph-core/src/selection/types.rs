//! Types for graph-based agent selection

use serde::{Deserialize, Serialize};

use crate::domain::graph::{AgentStatus, DEFAULT_AGENT_PRIORITY, Node, TaskComplexity};
use crate::error::Error;

/// How selected agents are arranged into a team
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// Single best-scoring agent
    Greedy,
    /// Dependency-respecting order over qualified agents
    OptimalSequence,
    /// Best agent plus its qualified collaborators
    Collaborative,
    /// Ranking penalized by current load
    LoadBalanced,
    /// Picks one of the above from task complexity
    Adaptive,
}

impl SelectionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Greedy => "greedy",
            Self::OptimalSequence => "optimal_sequence",
            Self::Collaborative => "collaborative",
            Self::LoadBalanced => "load_balanced",
            Self::Adaptive => "adaptive",
        }
    }

    pub fn all() -> &'static [SelectionStrategy] {
        &[
            Self::Greedy,
            Self::OptimalSequence,
            Self::Collaborative,
            Self::LoadBalanced,
            Self::Adaptive,
        ]
    }
}

impl std::fmt::Display for SelectionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SelectionStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "greedy" => Ok(Self::Greedy),
            "optimal_sequence" => Ok(Self::OptimalSequence),
            "collaborative" => Ok(Self::Collaborative),
            "load_balanced" => Ok(Self::LoadBalanced),
            "adaptive" => Ok(Self::Adaptive),
            _ => Err(Error::InvalidStrategy(s.to_string())),
        }
    }
}

/// A task needing agents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    #[serde(default)]
    pub task_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub complexity: TaskComplexity,
    /// Explicit requirements; when empty they are inferred from the text
    #[serde(default)]
    pub required_capabilities: Vec<String>,
    #[serde(default = "default_task_priority")]
    pub priority: i32,
    #[serde(default)]
    pub session_id: Option<String>,
}

fn default_task_priority() -> i32 {
    DEFAULT_AGENT_PRIORITY
}

impl TaskDescriptor {
    pub fn new(task_type: impl Into<String>) -> Self {
        Self {
            task_type: task_type.into(),
            description: String::new(),
            complexity: TaskComplexity::default(),
            required_capabilities: Vec::new(),
            priority: DEFAULT_AGENT_PRIORITY,
            session_id: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_complexity(mut self, complexity: TaskComplexity) -> Self {
        self.complexity = complexity;
        self
    }

    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// Where a task's required capabilities came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilitySource {
    /// Listed on the task descriptor
    Explicit,
    /// Found by scanning the task text
    Keywords,
    /// Looked up from the task type
    TaskType,
    /// Nothing could be derived
    None,
}

/// Derived view of a task used for scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskAnalysis {
    /// Lowercased task type, absent when blank
    pub task_type: Option<String>,
    pub required_capabilities: Vec<String>,
    pub capability_source: CapabilitySource,
    pub complexity: TaskComplexity,
    pub complexity_score: f64,
    pub priority: i32,
}

/// Score of one agent against one task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentScore {
    pub agent_id: String,
    pub agent_name: String,
    /// Weighted fitness in [0, 1]
    pub score: f64,
    /// Trust in the score in [0, 1]
    pub confidence: f64,
    /// Human-readable factor breakdown
    pub reasoning: Vec<String>,
}

/// Compact agent view returned by queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub id: String,
    pub name: String,
    pub agent_type: String,
    pub system_name: String,
    pub capabilities: Vec<String>,
    pub priority: i32,
    pub status: AgentStatus,
}

impl AgentSummary {
    /// Summarize an agent node; `None` for other kinds
    pub fn from_node(node: &Node) -> Option<Self> {
        let profile = node.as_agent()?;
        Some(Self {
            id: node.id.clone(),
            name: node.name.clone(),
            agent_type: profile.agent_type.clone(),
            system_name: profile.system_name.clone(),
            capabilities: profile.capabilities.clone(),
            priority: profile.priority,
            status: profile.status,
        })
    }
}

/// One position in a sequential plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceStep {
    pub position: usize,
    pub agent_id: String,
    /// Selected agents that must run before this one
    pub depends_on: Vec<String>,
}

/// Load-adjusted ranking entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadAssignment {
    pub agent_id: String,
    pub base_score: f64,
    pub load_ratio: f64,
    pub adjusted_score: f64,
}

/// How the selected agents should work together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ExecutionPlan {
    /// Nothing qualified
    Empty,
    Single {
        agent_id: String,
    },
    Sequential {
        steps: Vec<SequenceStep>,
    },
    AnchorWithCollaborators {
        anchor_id: String,
        collaborator_ids: Vec<String>,
    },
    LoadBalanced {
        assignments: Vec<LoadAssignment>,
    },
}

/// Bookkeeping attached to every selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionMetadata {
    pub candidates_considered: usize,
    pub qualified_candidates: usize,
    pub min_confidence: f64,
    pub max_agents: usize,
    pub complexity_score: f64,
    pub required_capabilities: Vec<String>,
    pub capability_source: CapabilitySource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Outcome of a selection request
///
/// Carries no timestamps or random values, so equal inputs over an equal
/// graph produce equal results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionResult {
    /// Selected agents, best first (or in execution order for sequences)
    pub agents: Vec<AgentSummary>,
    /// Scores parallel to `agents`
    pub scores: Vec<AgentScore>,
    /// Strategy that was requested
    pub strategy: SelectionStrategy,
    /// Strategy actually applied (differs only for adaptive)
    pub resolved_strategy: SelectionStrategy,
    pub execution_plan: ExecutionPlan,
    /// Mean confidence of the selected agents, 0 when none
    pub total_confidence: f64,
    pub metadata: SelectionMetadata,
}

impl SelectionResult {
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn agent_ids(&self) -> Vec<&str> {
        self.agents.iter().map(|a| a.id.as_str()).collect()
    }
}
