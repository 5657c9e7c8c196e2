//! Loads manifests into the knowledge graph
//!
//! Nodes are matched by name, so ingesting the same manifest twice updates
//! in place instead of duplicating. Runtime state already in the graph (agent
//! status, load, observed metrics, capability usage) survives re-ingestion.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::graph::{
    AgentProfile, CapabilityCategory, CapabilitySpec, Node, NodeKind, Relationship,
    RelationshipType,
};
use crate::error::{Error, Result};
use crate::graph::KnowledgeGraph;

use super::manifest::{AgentManifest, infer_category};

const DEPENDENCY_STRENGTH: f64 = 1.0;
const COLLABORATION_STRENGTH: f64 = 0.8;

/// What an ingestion changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub capabilities_created: usize,
    pub capabilities_updated: usize,
    pub agents_created: usize,
    pub agents_updated: usize,
    pub relationships_created: usize,
    pub relationships_updated: usize,
}

pub struct GraphIngestor {
    graph: Arc<KnowledgeGraph>,
}

impl GraphIngestor {
    pub fn new(graph: Arc<KnowledgeGraph>) -> Self {
        Self { graph }
    }

    pub async fn ingest(&self, manifest: &AgentManifest) -> Result<IngestReport> {
        manifest.validate()?;
        self.check_agent_references(manifest).await?;

        let mut report = IngestReport::default();
        let capabilities = self.ingest_capabilities(manifest, &mut report).await?;
        let agents = self.ingest_agents(manifest, &mut report).await?;

        for definition in &manifest.agents {
            let agent_id = self.agent_id(&definition.name, &agents).await?;

            for capability in &definition.capabilities {
                let (capability_id, level) = capabilities
                    .get(capability)
                    .ok_or_else(|| Error::NodeNotFound(capability.clone()))?;
                let strength = f64::from(*level) / 4.0;
                self.link(
                    &agent_id,
                    capability_id,
                    RelationshipType::HasCapability,
                    strength,
                    &mut report,
                )
                .await?;
            }

            for dependency in &definition.depends_on {
                let dependency_id = self.agent_id(dependency, &agents).await?;
                self.link(
                    &agent_id,
                    &dependency_id,
                    RelationshipType::DependsOn,
                    DEPENDENCY_STRENGTH,
                    &mut report,
                )
                .await?;
            }

            for collaborator in &definition.collaborates_with {
                let collaborator_id = self.agent_id(collaborator, &agents).await?;
                let reverse_exists = self
                    .graph
                    .read()
                    .await
                    .find_relationship(
                        &collaborator_id,
                        &agent_id,
                        RelationshipType::CollaboratesWith,
                    )
                    .is_some();
                if reverse_exists {
                    continue;
                }
                self.link(
                    &agent_id,
                    &collaborator_id,
                    RelationshipType::CollaboratesWith,
                    COLLABORATION_STRENGTH,
                    &mut report,
                )
                .await?;
            }
        }

        info!(
            agents_created = report.agents_created,
            agents_updated = report.agents_updated,
            capabilities_created = report.capabilities_created,
            relationships_created = report.relationships_created,
            "Manifest ingested"
        );
        Ok(report)
    }

    /// Every agent a definition links to must be in the manifest or the graph
    async fn check_agent_references(&self, manifest: &AgentManifest) -> Result<()> {
        let declared: HashSet<&str> = manifest.agents.iter().map(|a| a.name.as_str()).collect();
        let index = self.graph.read().await;

        for definition in &manifest.agents {
            for name in definition
                .depends_on
                .iter()
                .chain(&definition.collaborates_with)
            {
                if name == &definition.name {
                    return Err(Error::InvalidInput(format!(
                        "agent '{}' cannot reference itself",
                        name
                    )));
                }
                if !declared.contains(name.as_str())
                    && index.find_by_name(NodeKind::Agent, name).is_none()
                {
                    return Err(Error::InvalidInput(format!(
                        "agent '{}' references unknown agent '{}'",
                        definition.name, name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Returns capability name -> (node id, level)
    async fn ingest_capabilities(
        &self,
        manifest: &AgentManifest,
        report: &mut IngestReport,
    ) -> Result<HashMap<String, (String, u8)>> {
        let declared: HashMap<&str, _> = manifest
            .capabilities
            .iter()
            .map(|c| (c.name.as_str(), c))
            .collect();
        let mut ids = HashMap::new();

        for name in manifest.capability_names() {
            let existing = self.find(NodeKind::Capability, &name).await;
            let definition = declared.get(name.as_str()).copied();

            // Referenced but not declared: an existing node is left alone
            if let (Some(existing), None) = (&existing, definition) {
                let level = existing.as_capability().map(|s| s.level).unwrap_or(1);
                ids.insert(name, (existing.id.clone(), level));
                continue;
            }

            let category = definition
                .and_then(|d| d.category.as_deref())
                .and_then(CapabilityCategory::parse)
                .unwrap_or_else(|| infer_category(&name));
            let mut spec = CapabilitySpec::new(category);
            if let Some(definition) = definition {
                if let Some(level) = definition.level {
                    spec = spec.with_level(level);
                }
                if let Some(complexity) = definition.complexity {
                    spec = spec.with_complexity(complexity);
                }
                spec = spec.with_prerequisites(definition.prerequisites.clone());
            }

            let mut node = Node::capability(&name, spec);
            if let Some(definition) = definition {
                node.description = definition.description.clone();
            }
            match &existing {
                Some(existing) => {
                    node.id = existing.id.clone();
                    node.tags = existing.tags.clone();
                    node.metadata = existing.metadata.clone();
                    if let (Some(new), Some(old)) =
                        (node.as_capability_mut(), existing.as_capability())
                    {
                        new.usage_frequency = old.usage_frequency;
                    }
                    report.capabilities_updated += 1;
                }
                None => report.capabilities_created += 1,
            }

            let stored = self.graph.add_node(node).await?;
            let level = stored.as_capability().map(|s| s.level).unwrap_or(1);
            ids.insert(name, (stored.id, level));
        }
        Ok(ids)
    }

    /// Returns agent name -> node id
    async fn ingest_agents(
        &self,
        manifest: &AgentManifest,
        report: &mut IngestReport,
    ) -> Result<HashMap<String, String>> {
        let mut ids = HashMap::new();

        for definition in &manifest.agents {
            let mut profile = AgentProfile::new(&definition.agent_type)
                .with_system(&definition.system)
                .with_capabilities(definition.capabilities.iter().cloned());
            if let Some(priority) = definition.priority {
                profile = profile.with_priority(priority);
            }
            if let Some(max) = definition.max_concurrent_tasks {
                profile = profile.with_max_concurrent_tasks(max);
            }
            if let Some(timeout) = definition.timeout_seconds {
                profile.timeout_seconds = timeout;
            }
            if let Some(retries) = definition.retry_count {
                profile.retry_count = retries;
            }
            profile.performance_metrics = definition.performance.clone();

            let existing = self.find(NodeKind::Agent, &definition.name).await;
            if let Some(previous) = existing.as_ref().and_then(Node::as_agent) {
                profile.status = previous.status;
                profile.current_tasks = previous.current_tasks;
                profile.model_requirements = previous.model_requirements.clone();
                for (metric, value) in &previous.performance_metrics {
                    profile.performance_metrics.insert(metric.clone(), *value);
                }
            }

            let mut node = Node::agent(&definition.name, profile)
                .with_description(&definition.description);
            node.tags = definition.tags.iter().cloned().collect();
            match &existing {
                Some(existing) => {
                    node.id = existing.id.clone();
                    node.metadata = existing.metadata.clone();
                    report.agents_updated += 1;
                }
                None => report.agents_created += 1,
            }

            let stored = self.graph.add_node(node).await?;
            ids.insert(definition.name.clone(), stored.id);
        }
        Ok(ids)
    }

    async fn link(
        &self,
        source_id: &str,
        target_id: &str,
        relationship_type: RelationshipType,
        strength: f64,
        report: &mut IngestReport,
    ) -> Result<()> {
        let existing = self
            .graph
            .read()
            .await
            .find_relationship(source_id, target_id, relationship_type)
            .cloned();

        match existing {
            Some(relationship) if (relationship.strength - strength).abs() < 1e-9 => {}
            Some(relationship) => {
                self.graph
                    .add_relationship(relationship.with_strength(strength))
                    .await?;
                report.relationships_updated += 1;
            }
            None => {
                self.graph
                    .add_relationship(
                        Relationship::new(source_id, target_id, relationship_type)
                            .with_strength(strength),
                    )
                    .await?;
                report.relationships_created += 1;
            }
        }
        Ok(())
    }

    async fn find(&self, kind: NodeKind, name: &str) -> Option<Node> {
        self.graph.read().await.find_by_name(kind, name).cloned()
    }

    async fn agent_id(&self, name: &str, ingested: &HashMap<String, String>) -> Result<String> {
        if let Some(id) = ingested.get(name) {
            return Ok(id.clone());
        }
        self.find(NodeKind::Agent, name)
            .await
            .map(|node| node.id)
            .ok_or_else(|| Error::NodeNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::graph::AgentStatus;

    fn ingestor() -> (Arc<KnowledgeGraph>, GraphIngestor) {
        let graph = Arc::new(KnowledgeGraph::in_memory());
        (graph.clone(), GraphIngestor::new(graph))
    }

    #[tokio::test]
    async fn test_builtin_roster_ingestion() {
        let (graph, ingestor) = ingestor();
        let report = ingestor
            .ingest(&AgentManifest::builtin().unwrap())
            .await
            .unwrap();

        assert_eq!(report.agents_created, 10);
        assert_eq!(report.capabilities_created, 10);
        assert_eq!(report.relationships_created, 29);

        let stats = graph.statistics().await;
        assert_eq!(stats.relationships_by_type["has_capability"], 17);
        assert_eq!(stats.relationships_by_type["depends_on"], 6);
        assert_eq!(stats.relationships_by_type["collaborates_with"], 6);
        assert_eq!(stats.capabilities_by_category["planning"], 1);
    }

    #[tokio::test]
    async fn test_reingestion_is_idempotent() {
        let (graph, ingestor) = ingestor();
        let manifest = AgentManifest::builtin().unwrap();
        ingestor.ingest(&manifest).await.unwrap();
        let before = graph.statistics().await;

        let coder = graph
            .read()
            .await
            .find_by_name(NodeKind::Agent, "coder")
            .cloned()
            .unwrap();
        graph
            .update_agent_load(&coder.id, 2, Some(AgentStatus::Busy))
            .await
            .unwrap();

        let report = ingestor.ingest(&manifest).await.unwrap();
        assert_eq!(report.agents_created, 0);
        assert_eq!(report.agents_updated, 10);
        assert_eq!(report.capabilities_created, 0);
        assert_eq!(report.relationships_created, 0);
        assert_eq!(graph.statistics().await, before);

        let coder_again = graph.require_node(&coder.id).await.unwrap();
        let profile = coder_again.as_agent().unwrap();
        assert_eq!(profile.current_tasks, 2);
        assert_eq!(profile.status, AgentStatus::Busy);
        assert_eq!(coder_again.created_at, coder.created_at);
    }

    #[tokio::test]
    async fn test_unknown_reference_rejected_before_writing() {
        let (graph, ingestor) = ingestor();
        let manifest = AgentManifest::from_toml_str(
            r#"
            [[agents]]
            name = "tester"
            agent_type = "tester"
            capabilities = ["testing"]
            depends_on = ["ghost"]
            "#,
        )
        .unwrap();

        let err = ingestor.ingest(&manifest).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(ref msg) if msg.contains("ghost")));
        assert_eq!(graph.statistics().await.total_nodes, 0);
    }

    #[tokio::test]
    async fn test_manifest_can_reference_existing_agents() {
        let (graph, ingestor) = ingestor();
        ingestor
            .ingest(&AgentManifest::builtin().unwrap())
            .await
            .unwrap();

        let extra = AgentManifest::from_toml_str(
            r#"
            [[agents]]
            name = "rustacean"
            agent_type = "coder"
            capabilities = ["rust", "coding"]
            depends_on = ["architect"]
            "#,
        )
        .unwrap();
        let report = ingestor.ingest(&extra).await.unwrap();

        assert_eq!(report.agents_created, 1);
        assert_eq!(report.capabilities_created, 1);
        assert_eq!(report.capabilities_updated, 0);
        assert_eq!(report.relationships_created, 3);

        let rust = graph
            .read()
            .await
            .find_by_name(NodeKind::Capability, "rust")
            .cloned()
            .unwrap();
        assert_eq!(
            rust.as_capability().unwrap().category,
            CapabilityCategory::Development
        );
        assert_eq!(graph.find_agents_by_capability("coding").await.len(), 3);
    }
}
