//! Graph nodes
//!
//! Every entity in the agent graph is a [`Node`]: a common header (id, name,
//! description, metadata, tags, timestamps) plus a kind-specific
//! [`NodePayload`]. The payload discriminant is the node's kind.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A typed entity in the agent graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier, immutable after creation
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Free-text description
    pub description: String,
    /// Free-form metadata
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Tags attached to the node
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// When the node was created
    pub created_at: DateTime<Utc>,
    /// When the node was last mutated
    pub updated_at: DateTime<Utc>,
    /// Kind-specific fields
    pub payload: NodePayload,
}

impl Node {
    /// Create a new node with a generated id
    pub fn new(name: impl Into<String>, payload: NodePayload) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: String::new(),
            metadata: Map::new(),
            tags: BTreeSet::new(),
            created_at: now,
            updated_at: now,
            payload,
        }
    }

    /// Create an agent node
    pub fn agent(name: impl Into<String>, profile: AgentProfile) -> Self {
        Self::new(name, NodePayload::Agent(profile))
    }

    /// Create a capability node
    pub fn capability(name: impl Into<String>, spec: CapabilitySpec) -> Self {
        Self::new(name, NodePayload::Capability(spec))
    }

    /// Create a task node
    pub fn task(name: impl Into<String>, spec: TaskSpec) -> Self {
        Self::new(name, NodePayload::Task(spec))
    }

    /// Create a workflow node
    pub fn workflow(name: impl Into<String>, spec: WorkflowSpec) -> Self {
        Self::new(name, NodePayload::Workflow(spec))
    }

    /// Create a knowledge node
    pub fn knowledge(name: impl Into<String>, item: KnowledgeItem) -> Self {
        Self::new(name, NodePayload::Knowledge(item))
    }

    /// Use a caller-chosen id instead of the generated one
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Set a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// The node kind, derived from the payload
    pub fn kind(&self) -> NodeKind {
        match &self.payload {
            NodePayload::Agent(_) => NodeKind::Agent,
            NodePayload::Capability(_) => NodeKind::Capability,
            NodePayload::Task(_) => NodeKind::Task,
            NodePayload::Workflow(_) => NodeKind::Workflow,
            NodePayload::Knowledge(_) => NodeKind::Knowledge,
        }
    }

    /// Refresh `updated_at`, never moving it before `created_at`
    pub fn touch(&mut self) {
        self.updated_at = Utc::now().max(self.created_at);
    }

    pub fn as_agent(&self) -> Option<&AgentProfile> {
        match &self.payload {
            NodePayload::Agent(profile) => Some(profile),
            _ => None,
        }
    }

    pub fn as_agent_mut(&mut self) -> Option<&mut AgentProfile> {
        match &mut self.payload {
            NodePayload::Agent(profile) => Some(profile),
            _ => None,
        }
    }

    pub fn as_capability(&self) -> Option<&CapabilitySpec> {
        match &self.payload {
            NodePayload::Capability(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn as_capability_mut(&mut self) -> Option<&mut CapabilitySpec> {
        match &mut self.payload {
            NodePayload::Capability(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn as_task_mut(&mut self) -> Option<&mut TaskSpec> {
        match &mut self.payload {
            NodePayload::Task(spec) => Some(spec),
            _ => None,
        }
    }
}

/// Kind-specific node fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodePayload {
    Agent(AgentProfile),
    Capability(CapabilitySpec),
    Task(TaskSpec),
    Workflow(WorkflowSpec),
    Knowledge(KnowledgeItem),
}

/// Discriminant of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Agent,
    Capability,
    Task,
    Workflow,
    Knowledge,
}

impl NodeKind {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::Capability => "capability",
            Self::Task => "task",
            Self::Workflow => "workflow",
            Self::Knowledge => "knowledge",
        }
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "agent" => Some(Self::Agent),
            "capability" => Some(Self::Capability),
            "task" => Some(Self::Task),
            "workflow" => Some(Self::Workflow),
            "knowledge" => Some(Self::Knowledge),
            _ => None,
        }
    }

    /// Get all node kinds
    pub fn all() -> &'static [NodeKind] {
        &[
            Self::Agent,
            Self::Capability,
            Self::Task,
            Self::Workflow,
            Self::Knowledge,
        ]
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ========== Agent ==========

/// Default agent priority (middle of the 0-10 scale)
pub const DEFAULT_AGENT_PRIORITY: i32 = 5;

/// Agent-specific fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    /// Role label (architect, coder, tester, ...)
    pub agent_type: String,
    /// Owning subsystem
    pub system_name: String,
    /// Capability names, in declaration order
    #[serde(default)]
    pub capabilities: Vec<String>,
    pub priority: i32,
    pub max_concurrent_tasks: u32,
    pub timeout_seconds: u64,
    pub retry_count: u32,
    #[serde(default)]
    pub model_requirements: Map<String, Value>,
    /// Named performance figures, e.g. `success_rate`, `average_response_time`
    #[serde(default)]
    pub performance_metrics: BTreeMap<String, f64>,
    pub status: AgentStatus,
    /// Load gauge maintained by whoever dispatches work to the agent
    #[serde(default)]
    pub current_tasks: u32,
}

impl AgentProfile {
    /// Create a profile with default limits
    pub fn new(agent_type: impl Into<String>) -> Self {
        Self {
            agent_type: agent_type.into(),
            system_name: String::new(),
            capabilities: Vec::new(),
            priority: DEFAULT_AGENT_PRIORITY,
            max_concurrent_tasks: 3,
            timeout_seconds: 300,
            retry_count: 3,
            model_requirements: Map::new(),
            performance_metrics: BTreeMap::new(),
            status: AgentStatus::Idle,
            current_tasks: 0,
        }
    }

    pub fn with_system(mut self, system_name: impl Into<String>) -> Self {
        self.system_name = system_name.into();
        self
    }

    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_max_concurrent_tasks(mut self, max: u32) -> Self {
        self.max_concurrent_tasks = max;
        self
    }

    pub fn with_status(mut self, status: AgentStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_current_tasks(mut self, current_tasks: u32) -> Self {
        self.current_tasks = current_tasks;
        self
    }

    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.performance_metrics.insert(name.into(), value);
        self
    }

    /// Whether the agent lists the given capability
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }
}

/// Runtime status of an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Idle,
    Busy,
    Error,
    Disabled,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Busy => "busy",
            Self::Error => "error",
            Self::Disabled => "disabled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "idle" => Some(Self::Idle),
            "busy" => Some(Self::Busy),
            "error" => Some(Self::Error),
            "disabled" => Some(Self::Disabled),
            _ => None,
        }
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ========== Capability ==========

/// Capability-specific fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilitySpec {
    pub category: CapabilityCategory,
    /// Proficiency level, 1 (basic) to 4 (expert)
    pub level: u8,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    /// 0.0 to 1.0
    pub complexity_score: f64,
    #[serde(default)]
    pub usage_frequency: u64,
}

impl CapabilitySpec {
    pub fn new(category: CapabilityCategory) -> Self {
        Self {
            category,
            level: 1,
            prerequisites: Vec::new(),
            complexity_score: 0.5,
            usage_frequency: 0,
        }
    }

    /// Set the level (clamped to 1-4)
    pub fn with_level(mut self, level: u8) -> Self {
        self.level = level.clamp(1, 4);
        self
    }

    /// Set the complexity score (clamped to 0.0-1.0)
    pub fn with_complexity(mut self, complexity: f64) -> Self {
        self.complexity_score = complexity.clamp(0.0, 1.0);
        self
    }

    pub fn with_prerequisites(mut self, prerequisites: Vec<String>) -> Self {
        self.prerequisites = prerequisites;
        self
    }
}

/// Fixed set of capability categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityCategory {
    Planning,
    Development,
    Testing,
    Analysis,
    Coordination,
    Creative,
    Security,
    Deployment,
    Management,
    Communication,
}

impl CapabilityCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Development => "development",
            Self::Testing => "testing",
            Self::Analysis => "analysis",
            Self::Coordination => "coordination",
            Self::Creative => "creative",
            Self::Security => "security",
            Self::Deployment => "deployment",
            Self::Management => "management",
            Self::Communication => "communication",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "planning" => Some(Self::Planning),
            "development" => Some(Self::Development),
            "testing" => Some(Self::Testing),
            "analysis" => Some(Self::Analysis),
            "coordination" => Some(Self::Coordination),
            "creative" => Some(Self::Creative),
            "security" => Some(Self::Security),
            "deployment" => Some(Self::Deployment),
            "management" => Some(Self::Management),
            "communication" => Some(Self::Communication),
            _ => None,
        }
    }
}

impl std::fmt::Display for CapabilityCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ========== Task ==========

/// Task-specific fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub task_type: String,
    pub complexity: TaskComplexity,
    #[serde(default)]
    pub required_capabilities: Vec<String>,
    pub estimated_duration_seconds: u64,
    pub priority: i32,
    pub session_id: Option<String>,
    pub workflow_id: Option<String>,
    /// Append-only execution log
    #[serde(default)]
    pub execution_history: Vec<ExecutionEntry>,
}

impl TaskSpec {
    pub fn new(task_type: impl Into<String>, complexity: TaskComplexity) -> Self {
        Self {
            task_type: task_type.into(),
            complexity,
            required_capabilities: Vec::new(),
            estimated_duration_seconds: 0,
            priority: DEFAULT_AGENT_PRIORITY,
            session_id: None,
            workflow_id: None,
            execution_history: Vec::new(),
        }
    }
}

/// One entry of a task's execution log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionEntry {
    pub at: DateTime<Utc>,
    pub agent_id: Option<String>,
    pub outcome: String,
    #[serde(default)]
    pub details: Map<String, Value>,
}

impl ExecutionEntry {
    pub fn new(outcome: impl Into<String>) -> Self {
        Self {
            at: Utc::now(),
            agent_id: None,
            outcome: outcome.into(),
            details: Map::new(),
        }
    }

    pub fn with_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }
}

/// Task complexity label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskComplexity {
    Simple,
    #[default]
    Medium,
    Complex,
    Expert,
}

impl TaskComplexity {
    /// Numeric complexity used by scoring and strategy choice
    pub fn score(&self) -> f64 {
        match self {
            Self::Simple => 0.2,
            Self::Medium => 0.5,
            Self::Complex => 0.8,
            Self::Expert => 1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Medium => "medium",
            Self::Complex => "complex",
            Self::Expert => "expert",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "simple" => Some(Self::Simple),
            "medium" => Some(Self::Medium),
            "complex" => Some(Self::Complex),
            "expert" => Some(Self::Expert),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskComplexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ========== Workflow ==========

/// Workflow-specific fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSpec {
    pub workflow_type: WorkflowType,
    /// Agent names in execution order
    #[serde(default)]
    pub stages: Vec<String>,
    pub success_rate: f64,
    pub average_duration: f64,
    pub usage_count: u64,
    #[serde(default)]
    pub template: Map<String, Value>,
}

impl WorkflowSpec {
    pub fn new(workflow_type: WorkflowType, stages: Vec<String>) -> Self {
        Self {
            workflow_type,
            stages,
            success_rate: 0.0,
            average_duration: 0.0,
            usage_count: 0,
            template: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowType {
    Sequential,
    Parallel,
    Conditional,
    Adaptive,
}

// ========== Knowledge ==========

/// Knowledge-specific fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeItem {
    pub knowledge_type: String,
    pub content: String,
    pub confidence_score: f64,
    pub source_agent: Option<String>,
    pub validation_status: ValidationStatus,
    pub access_count: u64,
}

impl KnowledgeItem {
    pub fn new(knowledge_type: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            knowledge_type: knowledge_type.into(),
            content: content.into(),
            confidence_score: 0.5,
            source_agent: None,
            validation_status: ValidationStatus::Unvalidated,
            access_count: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Validated,
    Unvalidated,
    Deprecated,
}
