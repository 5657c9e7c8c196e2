//! Graph relationships
//!
//! Relationships are typed, directional, weighted edges between nodes.
//! `strength` measures relevance and `confidence` measures certainty that
//! the relationship exists; both live in `[0, 1]`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A directional edge between two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Unique identifier for the relationship
    pub id: String,
    /// ID of the source node
    pub source_id: String,
    /// ID of the target node
    pub target_id: String,
    /// Type of relationship
    pub relationship_type: RelationshipType,
    /// Relevance of the relationship (0.0 to 1.0)
    pub strength: f64,
    /// Certainty that the relationship exists (0.0 to 1.0)
    pub confidence: f64,
    /// Free-form metadata
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// When the relationship was created
    pub created_at: DateTime<Utc>,
    /// When the relationship was last updated
    pub updated_at: DateTime<Utc>,
}

impl Relationship {
    /// Create a new relationship between two nodes
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        relationship_type: RelationshipType,
    ) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4().to_string(),
            source_id: source_id.into(),
            target_id: target_id.into(),
            relationship_type,
            strength: 1.0,
            confidence: 1.0,
            metadata: Map::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Use a caller-chosen id instead of the generated one
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the strength (clamped to 0.0-1.0)
    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = strength.clamp(0.0, 1.0);
        self
    }

    /// Set the confidence (clamped to 0.0-1.0)
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Set a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Combined edge weight used for path strength
    pub fn weight(&self) -> f64 {
        self.strength * self.confidence
    }

    /// The endpoint opposite to `node_id`, if the relationship touches it
    pub fn other_end(&self, node_id: &str) -> Option<&str> {
        if self.source_id == node_id {
            Some(&self.target_id)
        } else if self.target_id == node_id {
            Some(&self.source_id)
        } else {
            None
        }
    }

    /// Refresh `updated_at`, never moving it before `created_at`
    pub fn touch(&mut self) {
        self.updated_at = Utc::now().max(self.created_at);
    }
}

/// Types of relationships between nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    /// Agent has a capability
    HasCapability,
    /// Source depends on target; the target should run first
    DependsOn,
    /// Agents work well together (treated as symmetric)
    CollaboratesWith,
    Creates,
    UsesKnowledge,
    InheritsFrom,
    Requires,
    Produces,
    Executes,
    Follows,
    Specializes,
    CompetesWith,
}

impl RelationshipType {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HasCapability => "has_capability",
            Self::DependsOn => "depends_on",
            Self::CollaboratesWith => "collaborates_with",
            Self::Creates => "creates",
            Self::UsesKnowledge => "uses_knowledge",
            Self::InheritsFrom => "inherits_from",
            Self::Requires => "requires",
            Self::Produces => "produces",
            Self::Executes => "executes",
            Self::Follows => "follows",
            Self::Specializes => "specializes",
            Self::CompetesWith => "competes_with",
        }
    }

    /// Parse from string (case-insensitive, so `DEPENDS_ON` works too)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "has_capability" => Some(Self::HasCapability),
            "depends_on" => Some(Self::DependsOn),
            "collaborates_with" => Some(Self::CollaboratesWith),
            "creates" => Some(Self::Creates),
            "uses_knowledge" => Some(Self::UsesKnowledge),
            "inherits_from" => Some(Self::InheritsFrom),
            "requires" => Some(Self::Requires),
            "produces" => Some(Self::Produces),
            "executes" => Some(Self::Executes),
            "follows" => Some(Self::Follows),
            "specializes" => Some(Self::Specializes),
            "competes_with" => Some(Self::CompetesWith),
            _ => None,
        }
    }

    /// Get all relationship types
    pub fn all() -> &'static [RelationshipType] {
        &[
            Self::HasCapability,
            Self::DependsOn,
            Self::CollaboratesWith,
            Self::Creates,
            Self::UsesKnowledge,
            Self::InheritsFrom,
            Self::Requires,
            Self::Produces,
            Self::Executes,
            Self::Follows,
            Self::Specializes,
            Self::CompetesWith,
        ]
    }
}

impl std::fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
