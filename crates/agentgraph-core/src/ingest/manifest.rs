//! Declarative agent manifests
//!
//! A manifest lists capabilities and agents, plus the dependency and
//! collaboration links between agents by name. It can be written in TOML or
//! JSON.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::graph::CapabilityCategory;
use crate::error::{Error, Result};

const BUILTIN_ROSTER: &str = include_str!("roster.toml");

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentManifest {
    #[serde(default)]
    pub capabilities: Vec<CapabilityDefinition>,
    #[serde(default)]
    pub agents: Vec<AgentDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityDefinition {
    pub name: String,
    /// Inferred from the name when absent
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub level: Option<u8>,
    #[serde(default)]
    pub complexity: Option<f64>,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDefinition {
    pub name: String,
    pub agent_type: String,
    #[serde(default)]
    pub system: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub max_concurrent_tasks: Option<u32>,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    #[serde(default)]
    pub retry_count: Option<u32>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Names of agents this one depends on
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Names of agents this one works alongside
    #[serde(default)]
    pub collaborates_with: Vec<String>,
    /// Baseline performance figures
    #[serde(default)]
    pub performance: BTreeMap<String, f64>,
}

impl AgentManifest {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| Error::InvalidInput(format!("invalid TOML manifest: {}", e)))
    }

    pub fn from_json_str(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Read a manifest, choosing the format from the file extension
    pub async fn load(path: &Path) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path).await?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::from_json_str(&contents),
            _ => Self::from_toml_str(&contents),
        }
    }

    /// The default agent roster shipped with the crate
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_ROSTER)
    }

    /// Capability names referenced anywhere, declared ones first
    pub fn capability_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.capabilities.iter().map(|c| c.name.clone()).collect();
        for agent in &self.agents {
            for capability in &agent.capabilities {
                if !names.contains(capability) {
                    names.push(capability.clone());
                }
            }
        }
        names
    }

    /// Structural checks that don't need the graph
    pub fn validate(&self) -> Result<()> {
        let mut capability_names = HashSet::new();
        for capability in &self.capabilities {
            if capability.name.trim().is_empty() {
                return Err(Error::InvalidInput("capability with empty name".into()));
            }
            if !capability_names.insert(capability.name.as_str()) {
                return Err(Error::InvalidInput(format!(
                    "capability '{}' declared twice",
                    capability.name
                )));
            }
            if let Some(category) = &capability.category {
                if CapabilityCategory::parse(category).is_none() {
                    return Err(Error::InvalidInput(format!(
                        "capability '{}' has unknown category '{}'",
                        capability.name, category
                    )));
                }
            }
        }

        let mut agent_names = HashSet::new();
        for agent in &self.agents {
            if agent.name.trim().is_empty() {
                return Err(Error::InvalidInput("agent with empty name".into()));
            }
            if !agent_names.insert(agent.name.as_str()) {
                return Err(Error::InvalidInput(format!(
                    "agent '{}' declared twice",
                    agent.name
                )));
            }
            if let Some(priority) = agent.priority {
                if !(0..=10).contains(&priority) {
                    return Err(Error::InvalidInput(format!(
                        "agent '{}' priority {} is outside 0-10",
                        agent.name, priority
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Best-guess category for a capability name
pub fn infer_category(name: &str) -> CapabilityCategory {
    let name = name.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| name.contains(n));

    if has(&["secur", "vulnerab", "auth"]) {
        CapabilityCategory::Security
    } else if has(&["test", "qa", "verif"]) {
        CapabilityCategory::Testing
    } else if has(&["deploy", "release", "infra"]) {
        CapabilityCategory::Deployment
    } else if has(&["architect", "design", "plan"]) {
        CapabilityCategory::Planning
    } else if has(&["orchestr", "coordinat"]) {
        CapabilityCategory::Coordination
    } else if has(&["manage"]) {
        CapabilityCategory::Management
    } else if has(&["review", "analy", "research", "audit"]) {
        CapabilityCategory::Analysis
    } else if has(&["creative", "innovat"]) {
        CapabilityCategory::Creative
    } else if has(&["document", "writ", "communicat", "explain"]) {
        CapabilityCategory::Communication
    } else {
        CapabilityCategory::Development
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_roster_parses_and_validates() {
        let manifest = AgentManifest::builtin().unwrap();
        manifest.validate().unwrap();
        assert!(manifest.agents.len() >= 6);
        assert!(manifest.agents.iter().any(|a| a.agent_type == "coder"));
        for name in ["architecture", "coding", "testing", "review", "deployment"] {
            assert!(
                manifest.capability_names().iter().any(|c| c == name),
                "roster is missing {name}"
            );
        }
    }

    #[test]
    fn test_json_manifest() {
        let manifest = AgentManifest::from_json_str(
            r#"{"agents": [{"name": "solo", "agent_type": "coder", "capabilities": ["rust"]}]}"#,
        )
        .unwrap();
        assert_eq!(manifest.capability_names(), vec!["rust"]);
        assert!(manifest.agents[0].depends_on.is_empty());
    }

    #[test]
    fn test_validation_errors() {
        let duplicate = AgentManifest::from_toml_str(
            r#"
            [[agents]]
            name = "a"
            agent_type = "coder"

            [[agents]]
            name = "a"
            agent_type = "tester"
            "#,
        )
        .unwrap();
        assert!(duplicate.validate().is_err());

        let bad_category = AgentManifest::from_toml_str(
            r#"
            [[capabilities]]
            name = "juggling"
            category = "circus"
            "#,
        )
        .unwrap();
        assert!(bad_category.validate().is_err());

        assert!(matches!(
            AgentManifest::from_toml_str("agents = 3"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_infer_category() {
        assert_eq!(infer_category("security_scanning"), CapabilityCategory::Security);
        assert_eq!(infer_category("unit_testing"), CapabilityCategory::Testing);
        assert_eq!(infer_category("system_design"), CapabilityCategory::Planning);
        assert_eq!(infer_category("documentation"), CapabilityCategory::Communication);
        assert_eq!(infer_category("rust"), CapabilityCategory::Development);
    }
}
