//! Serializable graph snapshots

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::index::GraphStatistics;
use super::node::Node;
use super::relationship::Relationship;

/// Full export of the graph: nodes, relationships and statistics
///
/// Nodes and relationships are sorted by id so two exports of the same state
/// produce the same document apart from `exported_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub exported_at: DateTime<Utc>,
    pub nodes: Vec<Node>,
    pub relationships: Vec<Relationship>,
    pub statistics: GraphStatistics,
}
