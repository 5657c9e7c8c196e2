//! Graph-based agent selection
//!
//! Given a task, the selector works out which capabilities it needs, scores
//! every candidate agent in the knowledge graph and forms a team with one of
//! five strategies.
//!
//! ## How It Works
//!
//! 1. [`TaskAnalyzer`] derives required capabilities (explicit, keyword scan,
//!    or task-type lookup) and a complexity score
//! 2. Candidates are agents holding at least one required capability
//! 3. Each candidate gets a weighted score and a confidence ([`score_agent`])
//! 4. Candidates under the confidence floor are dropped, the rest ranked by
//!    score then id
//! 5. The strategy arranges the ranking into a team and an execution plan
//!
//! ## Example
//!
//! ```rust,ignore
//! use agentgraph_core::selection::{AgentSelector, SelectionStrategy, TaskDescriptor};
//!
//! let selector = AgentSelector::new(graph.clone());
//! let task = TaskDescriptor::new("feature").with_description("build the login API");
//! let result = selector
//!     .select_agents(&task, SelectionStrategy::Adaptive, 3, 0.5)
//!     .await?;
//! ```

mod analysis;
mod history;
mod scoring;
mod selector;
mod strategy;
mod types;

pub use analysis::TaskAnalyzer;
pub use history::{
    DEFAULT_HISTORY_CAPACITY, SelectionAnalytics, SelectionHistory, SelectionRecord,
};
pub use scoring::{
    AVAILABILITY_WEIGHT, CAPABILITY_WEIGHT, PERFORMANCE_WEIGHT, PRIORITY_WEIGHT, TYPE_WEIGHT,
    score_agent,
};
pub use selector::{AgentSelector, select_from_index};
pub use strategy::{LOAD_PENALTY, resolve_adaptive};
pub use types::{
    AgentScore, AgentSummary, CapabilitySource, ExecutionPlan, LoadAssignment, SelectionMetadata,
    SelectionResult, SelectionStrategy, SequenceStep, TaskAnalysis, TaskDescriptor,
};
