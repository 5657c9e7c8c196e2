//! Agentgraph Core Library
//!
//! This crate provides the core functionality for Agentgraph, including:
//! - Knowledge graph of agents, capabilities, tasks, workflows and knowledge
//! - Write-through persistence (SQLite) with versioned migrations
//! - Graph-based agent selection with five team-forming strategies
//! - Manifest ingestion and a built-in agent roster
//! - A request/response service facade

pub mod config;
pub mod domain;
pub mod error;
pub mod graph;
pub mod infrastructure;
pub mod ingest;
pub mod selection;
pub mod service;
pub mod storage;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::domain::graph::{
        AgentProfile, AgentStatus, Node, NodeKind, Relationship, RelationshipType,
        TaskComplexity,
    };
    pub use crate::error::{Error, Result};
    pub use crate::graph::KnowledgeGraph;
    pub use crate::selection::{AgentSelector, SelectionResult, SelectionStrategy, TaskDescriptor};
    pub use crate::service::{AgentGraphService, RecommendRequest};
}
