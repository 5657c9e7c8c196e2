//! Error types for agentgraph

use thiserror::Error;

/// Result type alias using agentgraph's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Agentgraph error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Lookup errors (E001-E099)
    #[error("Node '{0}' not found. Run `agentgraph stats` to inspect the graph.")]
    NodeNotFound(String),

    // Validation errors (E100-E199)
    #[error(
        "Unknown selection strategy '{0}'. Valid strategies: greedy, optimal_sequence, collaborative, load_balanced, adaptive."
    )]
    InvalidStrategy(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Graph integrity errors (E200-E299)
    #[error(
        "Relationship '{relationship_id}' references missing node '{missing_node_id}'. Add the node before linking it."
    )]
    ReferentialIntegrity {
        relationship_id: String,
        missing_node_id: String,
    },

    // Persistence errors (E300-E399)
    #[error("Persistence failed: {0}. The in-memory graph was left unchanged.")]
    Persistence(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Serialization errors (E400-E499)
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Generic errors
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::NodeNotFound(_) => "E001",
            Self::InvalidStrategy(_) => "E100",
            Self::InvalidInput(_) => "E101",
            Self::ReferentialIntegrity { .. } => "E200",
            Self::Persistence(_) => "E300",
            Self::DatabaseError(_) => "E301",
            Self::Serialization(_) => "E400",
            Self::ConfigError(_) => "E600",
            Self::Other(_) | Self::Io(_) => "E9999",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::NodeNotFound(_) => Some("agentgraph stats".to_string()),
            Self::InvalidStrategy(_) => Some("agentgraph suggest-strategy".to_string()),
            Self::ReferentialIntegrity {
                missing_node_id, ..
            } => Some(format!("add node '{}' first", missing_node_id)),
            Self::ConfigError(_) => Some("agentgraph config show".to_string()),
            _ => None,
        }
    }

    /// Whether the error came from the durable store rather than from the request
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence(_) | Self::DatabaseError(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_not_found_error() {
        let error = Error::NodeNotFound("agent-1".to_string());
        assert_eq!(error.code(), "E001");
        assert_eq!(error.suggestion(), Some("agentgraph stats".to_string()));
        assert!(error.to_string().contains("agent-1"));
    }

    #[test]
    fn test_invalid_strategy_lists_valid_values() {
        let error = Error::InvalidStrategy("fastest".to_string());
        assert_eq!(error.code(), "E100");
        let message = error.to_string();
        assert!(message.contains("fastest"));
        for valid in [
            "greedy",
            "optimal_sequence",
            "collaborative",
            "load_balanced",
            "adaptive",
        ] {
            assert!(message.contains(valid), "missing {valid} in {message}");
        }
    }

    #[test]
    fn test_referential_integrity_error() {
        let error = Error::ReferentialIntegrity {
            relationship_id: "rel-1".to_string(),
            missing_node_id: "ghost".to_string(),
        };
        assert_eq!(error.code(), "E200");
        assert_eq!(error.suggestion(), Some("add node 'ghost' first".to_string()));
        assert!(error.to_string().contains("rel-1"));
    }

    #[test]
    fn test_persistence_classification() {
        assert!(Error::Persistence("disk full".into()).is_persistence());
        assert!(!Error::InvalidInput("bad".into()).is_persistence());
        assert_eq!(Error::Persistence("x".into()).code(), "E300");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let error: Error = io.into();
        assert_eq!(error.code(), "E9999");
        assert_eq!(error.suggestion(), None);
    }
}
