//! In-memory graph indices
//!
//! [`GraphIndex`] is the read path of the store. It keeps nodes and
//! relationships by id plus secondary indices by node kind, relationship type
//! and endpoint. Secondary indices use ordered sets so every query returns
//! results in id order, which keeps downstream scoring deterministic.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use super::node::{Node, NodeKind};
use super::relationship::{Relationship, RelationshipType};
use crate::error::{Error, Result};

/// A path discovered by [`GraphIndex::find_path`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphPath {
    /// Node ids from source to target, inclusive
    pub nodes: Vec<String>,
    /// Edges traversed, in order; `relationships.len() == nodes.len() - 1`
    pub relationships: Vec<Relationship>,
    /// Mean of `strength * confidence` over the edges (0.0 for an empty path)
    pub total_strength: f64,
}

impl GraphPath {
    /// Number of hops
    pub fn len(&self) -> usize {
        self.relationships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty()
    }
}

/// Aggregate counts over the graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStatistics {
    pub total_nodes: u64,
    pub total_relationships: u64,
    pub nodes_by_kind: BTreeMap<String, u64>,
    pub relationships_by_type: BTreeMap<String, u64>,
    pub agents_by_system: BTreeMap<String, u64>,
    pub capabilities_by_category: BTreeMap<String, u64>,
}

/// Indexed in-memory view of all nodes and relationships
#[derive(Debug, Default, Clone)]
pub struct GraphIndex {
    nodes: HashMap<String, Node>,
    relationships: HashMap<String, Relationship>,
    nodes_by_kind: HashMap<NodeKind, BTreeSet<String>>,
    relationships_by_type: HashMap<RelationshipType, BTreeSet<String>>,
    relationships_by_node: HashMap<String, BTreeSet<String>>,
}

impl GraphIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from persisted parts, rejecting dangling relationships
    pub fn from_parts(nodes: Vec<Node>, relationships: Vec<Relationship>) -> Result<Self> {
        let mut index = Self::new();
        for node in nodes {
            index.insert_node(node);
        }
        for relationship in relationships {
            index.check_endpoints(&relationship)?;
            index.insert_relationship(relationship);
        }
        Ok(index)
    }

    // ========== Mutation (store-internal) ==========

    pub(crate) fn insert_node(&mut self, node: Node) {
        let kind = node.kind();
        if let Some(previous) = self.nodes.get(&node.id) {
            let previous_kind = previous.kind();
            if previous_kind != kind {
                if let Some(ids) = self.nodes_by_kind.get_mut(&previous_kind) {
                    ids.remove(&node.id);
                }
            }
        }
        self.nodes_by_kind
            .entry(kind)
            .or_default()
            .insert(node.id.clone());
        self.nodes.insert(node.id.clone(), node);
    }

    pub(crate) fn insert_relationship(&mut self, relationship: Relationship) {
        if let Some(previous) = self.relationships.get(&relationship.id) {
            let previous = previous.clone();
            self.unindex_relationship(&previous);
        }
        let id = relationship.id.clone();
        self.relationships_by_type
            .entry(relationship.relationship_type)
            .or_default()
            .insert(id.clone());
        self.relationships_by_node
            .entry(relationship.source_id.clone())
            .or_default()
            .insert(id.clone());
        self.relationships_by_node
            .entry(relationship.target_id.clone())
            .or_default()
            .insert(id.clone());
        self.relationships.insert(id, relationship);
    }

    fn unindex_relationship(&mut self, relationship: &Relationship) {
        if let Some(ids) = self
            .relationships_by_type
            .get_mut(&relationship.relationship_type)
        {
            ids.remove(&relationship.id);
        }
        for endpoint in [&relationship.source_id, &relationship.target_id] {
            if let Some(ids) = self.relationships_by_node.get_mut(endpoint) {
                ids.remove(&relationship.id);
            }
        }
    }

    /// Verify both endpoints of a relationship exist
    pub fn check_endpoints(&self, relationship: &Relationship) -> Result<()> {
        for endpoint in [&relationship.source_id, &relationship.target_id] {
            if !self.nodes.contains_key(endpoint) {
                return Err(Error::ReferentialIntegrity {
                    relationship_id: relationship.id.clone(),
                    missing_node_id: endpoint.clone(),
                });
            }
        }
        Ok(())
    }

    // ========== Node queries ==========

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    /// Nodes of one kind, in id order
    pub fn nodes_by_kind(&self, kind: NodeKind) -> Vec<&Node> {
        self.nodes_by_kind
            .get(&kind)
            .map(|ids| ids.iter().filter_map(|id| self.nodes.get(id)).collect())
            .unwrap_or_default()
    }

    /// All agent nodes, in id order
    pub fn agents(&self) -> Vec<&Node> {
        self.nodes_by_kind(NodeKind::Agent)
    }

    /// Find a node of the given kind by exact name
    pub fn find_by_name(&self, kind: NodeKind, name: &str) -> Option<&Node> {
        self.nodes_by_kind(kind).into_iter().find(|n| n.name == name)
    }

    /// Agents whose capability list contains `capability`
    pub fn agents_with_capability(&self, capability: &str) -> Vec<&Node> {
        self.agents()
            .into_iter()
            .filter(|node| {
                node.as_agent()
                    .is_some_and(|profile| profile.has_capability(capability))
            })
            .collect()
    }

    // ========== Relationship queries ==========

    pub fn relationship(&self, id: &str) -> Option<&Relationship> {
        self.relationships.get(id)
    }

    /// Relationships where the node is source or target, in id order
    pub fn node_relationships(&self, node_id: &str) -> Vec<&Relationship> {
        self.relationships_by_node
            .get(node_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.relationships.get(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All relationships of one type, in id order
    pub fn relationships_of_type(&self, relationship_type: RelationshipType) -> Vec<&Relationship> {
        self.relationships_by_type
            .get(&relationship_type)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.relationships.get(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The relationship of a given type from `source_id` to `target_id`
    pub fn find_relationship(
        &self,
        source_id: &str,
        target_id: &str,
        relationship_type: RelationshipType,
    ) -> Option<&Relationship> {
        self.node_relationships(source_id).into_iter().find(|r| {
            r.relationship_type == relationship_type
                && r.source_id == source_id
                && r.target_id == target_id
        })
    }

    /// Agents linked to `agent_id` by `COLLABORATES_WITH` in either direction
    pub fn collaborators(&self, agent_id: &str) -> Vec<&Node> {
        let ids: BTreeSet<&str> = self
            .node_relationships(agent_id)
            .into_iter()
            .filter(|r| r.relationship_type == RelationshipType::CollaboratesWith)
            .filter_map(|r| r.other_end(agent_id))
            .filter(|id| *id != agent_id)
            .collect();
        self.agents_from_ids(ids)
    }

    /// Agents that `agent_id` depends on (outgoing `DEPENDS_ON`)
    pub fn dependencies(&self, agent_id: &str) -> Vec<&Node> {
        let ids: BTreeSet<&str> = self
            .node_relationships(agent_id)
            .into_iter()
            .filter(|r| {
                r.relationship_type == RelationshipType::DependsOn && r.source_id == agent_id
            })
            .map(|r| r.target_id.as_str())
            .filter(|id| *id != agent_id)
            .collect();
        self.agents_from_ids(ids)
    }

    fn agents_from_ids<'a>(&'a self, ids: BTreeSet<&str>) -> Vec<&'a Node> {
        ids.into_iter()
            .filter_map(|id| self.nodes.get(id))
            .filter(|node| node.kind() == NodeKind::Agent)
            .collect()
    }

    // ========== Traversal ==========

    /// Breadth-first search over the undirected view of the graph
    ///
    /// Returns the first path found within `max_depth` hops. Neighbours are
    /// expanded in relationship-id order, so the result is deterministic, but
    /// it is only the fewest-hops path discovered first, not the strongest.
    pub fn find_path(
        &self,
        source_id: &str,
        target_id: &str,
        max_depth: usize,
    ) -> Result<Option<GraphPath>> {
        for id in [source_id, target_id] {
            if !self.contains_node(id) {
                return Err(Error::NodeNotFound(id.to_string()));
            }
        }

        if source_id == target_id {
            return Ok(Some(GraphPath {
                nodes: vec![source_id.to_string()],
                relationships: Vec::new(),
                total_strength: 0.0,
            }));
        }

        let mut visited: HashSet<&str> = HashSet::from([source_id]);
        let mut parents: HashMap<&str, (&str, &Relationship)> = HashMap::new();
        let mut queue: VecDeque<(&str, usize)> = VecDeque::from([(source_id, 0)]);

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            for relationship in self.node_relationships(current) {
                let Some(next) = relationship.other_end(current) else {
                    continue;
                };
                if !visited.insert(next) {
                    continue;
                }
                parents.insert(next, (current, relationship));
                if next == target_id {
                    return Ok(Some(Self::assemble_path(&parents, source_id, target_id)));
                }
                queue.push_back((next, depth + 1));
            }
        }

        Ok(None)
    }

    fn assemble_path(
        parents: &HashMap<&str, (&str, &Relationship)>,
        source_id: &str,
        target_id: &str,
    ) -> GraphPath {
        let mut nodes = vec![target_id.to_string()];
        let mut relationships = Vec::new();
        let mut cursor = target_id;
        while cursor != source_id {
            let Some((parent, relationship)) = parents.get(cursor) else {
                break;
            };
            relationships.push((*relationship).clone());
            nodes.push(parent.to_string());
            cursor = *parent;
        }
        nodes.reverse();
        relationships.reverse();

        let total_strength = if relationships.is_empty() {
            0.0
        } else {
            relationships.iter().map(Relationship::weight).sum::<f64>()
                / relationships.len() as f64
        };

        GraphPath {
            nodes,
            relationships,
            total_strength,
        }
    }

    // ========== Aggregates ==========

    pub fn statistics(&self) -> GraphStatistics {
        let mut stats = GraphStatistics {
            total_nodes: self.nodes.len() as u64,
            total_relationships: self.relationships.len() as u64,
            ..Default::default()
        };

        for kind in NodeKind::all() {
            let count = self.nodes_by_kind.get(kind).map_or(0, |ids| ids.len());
            stats
                .nodes_by_kind
                .insert(kind.as_str().to_string(), count as u64);
        }

        for (relationship_type, ids) in &self.relationships_by_type {
            if !ids.is_empty() {
                stats
                    .relationships_by_type
                    .insert(relationship_type.as_str().to_string(), ids.len() as u64);
            }
        }

        for node in self.nodes.values() {
            if let Some(profile) = node.as_agent() {
                let system = if profile.system_name.is_empty() {
                    "unassigned"
                } else {
                    profile.system_name.as_str()
                };
                *stats.agents_by_system.entry(system.to_string()).or_insert(0) += 1;
            } else if let Some(spec) = node.as_capability() {
                *stats
                    .capabilities_by_category
                    .entry(spec.category.as_str().to_string())
                    .or_insert(0) += 1;
            }
        }

        stats
    }

    /// All nodes, sorted by id
    pub fn sorted_nodes(&self) -> Vec<Node> {
        let mut nodes: Vec<Node> = self.nodes.values().cloned().collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        nodes
    }

    /// All relationships, sorted by id
    pub fn sorted_relationships(&self) -> Vec<Relationship> {
        let mut relationships: Vec<Relationship> = self.relationships.values().cloned().collect();
        relationships.sort_by(|a, b| a.id.cmp(&b.id));
        relationships
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::graph::node::{AgentProfile, CapabilityCategory, CapabilitySpec};

    fn agent(id: &str, system: &str) -> Node {
        Node::agent(id, AgentProfile::new("coder").with_system(system)).with_id(id)
    }

    fn link(id: &str, from: &str, to: &str, t: RelationshipType, strength: f64) -> Relationship {
        Relationship::new(from, to, t)
            .with_id(id)
            .with_strength(strength)
    }

    fn chain() -> GraphIndex {
        // a - b - c - d, and an isolated e
        GraphIndex::from_parts(
            vec![
                agent("a", "dev"),
                agent("b", "dev"),
                agent("c", "ops"),
                agent("d", "ops"),
                agent("e", "ops"),
            ],
            vec![
                link("r1", "a", "b", RelationshipType::DependsOn, 1.0),
                link("r2", "c", "b", RelationshipType::CollaboratesWith, 0.5),
                link("r3", "c", "d", RelationshipType::Follows, 0.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_from_parts_rejects_dangling_relationship() {
        let err = GraphIndex::from_parts(
            vec![agent("a", "dev")],
            vec![link("r1", "a", "ghost", RelationshipType::DependsOn, 1.0)],
        )
        .unwrap_err();
        match err {
            Error::ReferentialIntegrity {
                relationship_id,
                missing_node_id,
            } => {
                assert_eq!(relationship_id, "r1");
                assert_eq!(missing_node_id, "ghost");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_same_node_path_is_empty() {
        let index = chain();
        let path = index.find_path("e", "e", 0).unwrap().unwrap();
        assert_eq!(path.nodes, vec!["e".to_string()]);
        assert!(path.is_empty());
        assert_eq!(path.total_strength, 0.0);
    }

    #[test]
    fn test_path_traverses_edges_in_either_direction() {
        let index = chain();
        let path = index.find_path("a", "d", 5).unwrap().unwrap();
        assert_eq!(path.nodes, vec!["a", "b", "c", "d"]);
        assert_eq!(path.len(), 3);
        let ids: Vec<&str> = path.relationships.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r1", "r2", "r3"]);
        assert!((path.total_strength - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_path_respects_depth_bound() {
        let index = chain();
        assert!(index.find_path("a", "d", 2).unwrap().is_none());
        assert!(index.find_path("a", "d", 3).unwrap().is_some());
    }

    #[test]
    fn test_disconnected_nodes_have_no_path() {
        let index = chain();
        for depth in [0, 1, 10, 100] {
            assert!(index.find_path("a", "e", depth).unwrap().is_none());
        }
    }

    #[test]
    fn test_path_unknown_node() {
        let index = chain();
        assert!(matches!(
            index.find_path("a", "zzz", 3),
            Err(Error::NodeNotFound(id)) if id == "zzz"
        ));
    }

    #[test]
    fn test_collaborators_and_dependencies() {
        let index = chain();
        let collaborators: Vec<&str> = index.collaborators("b").iter().map(|n| n.id.as_str()).collect();
        assert_eq!(collaborators, vec!["c"]);
        let collaborators: Vec<&str> = index.collaborators("c").iter().map(|n| n.id.as_str()).collect();
        assert_eq!(collaborators, vec!["b"]);

        let deps: Vec<&str> = index.dependencies("a").iter().map(|n| n.id.as_str()).collect();
        assert_eq!(deps, vec!["b"]);
        assert!(index.dependencies("b").is_empty());
    }

    #[test]
    fn test_reinserting_relationship_reindexes_endpoints() {
        let mut index = chain();
        index.insert_relationship(link("r1", "a", "e", RelationshipType::DependsOn, 1.0));

        assert!(index.node_relationships("b").iter().all(|r| r.id != "r1"));
        assert_eq!(index.node_relationships("e").len(), 1);
        assert_eq!(index.relationship_count(), 3);
    }

    #[test]
    fn test_kind_change_reindexes_node() {
        let mut index = chain();
        let replaced = Node::capability("a", CapabilitySpec::new(CapabilityCategory::Testing)).with_id("a");
        index.insert_node(replaced);

        assert_eq!(index.agents().len(), 4);
        assert_eq!(index.nodes_by_kind(NodeKind::Capability).len(), 1);
    }

    #[test]
    fn test_statistics() {
        let mut index = chain();
        index.insert_node(
            Node::capability("coding", CapabilitySpec::new(CapabilityCategory::Development))
                .with_id("cap-coding"),
        );
        let stats = index.statistics();
        assert_eq!(stats.total_nodes, 6);
        assert_eq!(stats.total_relationships, 3);
        assert_eq!(stats.nodes_by_kind["agent"], 5);
        assert_eq!(stats.nodes_by_kind["task"], 0);
        assert_eq!(stats.relationships_by_type["depends_on"], 1);
        assert_eq!(stats.agents_by_system["ops"], 3);
        assert_eq!(stats.capabilities_by_category["development"], 1);
    }
}
