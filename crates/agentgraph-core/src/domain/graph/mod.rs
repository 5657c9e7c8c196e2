//! Agent graph schema
//!
//! Agents, capabilities, tasks, workflows and knowledge are modelled as
//! typed nodes connected by typed, weighted, directional relationships.
//!
//! - **Node**: common header plus a kind-specific [`NodePayload`]
//! - **Relationship**: `source -> target` edge with strength and confidence
//! - **GraphIndex**: the in-memory indices used as the read path
//! - **GraphRepository**: durable write-through storage
//!
//! ```rust,ignore
//! use agentgraph_core::domain::graph::{AgentProfile, Node, Relationship, RelationshipType};
//!
//! let coder = Node::agent("coder", AgentProfile::new("coder").with_capabilities(["coding"]));
//! let tester = Node::agent("tester", AgentProfile::new("tester").with_capabilities(["testing"]));
//! let edge = Relationship::new(&tester.id, &coder.id, RelationshipType::DependsOn);
//! ```

mod index;
mod node;
mod relationship;
mod repository;
mod snapshot;

pub use index::{GraphIndex, GraphPath, GraphStatistics};
pub use node::{
    AgentProfile, AgentStatus, CapabilityCategory, CapabilitySpec, DEFAULT_AGENT_PRIORITY,
    ExecutionEntry, KnowledgeItem, Node, NodeKind, NodePayload, TaskComplexity, TaskSpec,
    ValidationStatus, WorkflowSpec, WorkflowType,
};
pub use relationship::{Relationship, RelationshipType};
pub use repository::GraphRepository;
pub use snapshot::GraphSnapshot;
