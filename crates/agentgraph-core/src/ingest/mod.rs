//! Manifest ingestion
//!
//! Builds agent and capability nodes, and the `HAS_CAPABILITY`,
//! `DEPENDS_ON` and `COLLABORATES_WITH` relationships between them, from a
//! declarative TOML or JSON manifest. A default roster ships with the crate.

mod ingestor;
mod manifest;

pub use ingestor::{GraphIngestor, IngestReport};
pub use manifest::{AgentDefinition, AgentManifest, CapabilityDefinition, infer_category};
