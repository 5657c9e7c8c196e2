//! SQLite implementation of the GraphRepository
//!
//! Nodes keep their common header in dedicated columns and their
//! kind-specific payload as JSON. Relationship endpoints reference `nodes(id)`
//! so the database enforces the same integrity rule as the in-memory store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use tracing::{debug, info};

use crate::domain::graph::{GraphRepository, Node, NodeKind, Relationship, RelationshipType};
use crate::error::{Error, Result};

const UPSERT_NODE_SQL: &str = r#"
    INSERT INTO nodes (
        id, kind, name, description, metadata, payload, tags, created_at, updated_at
    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT(id) DO UPDATE SET
        kind = excluded.kind,
        name = excluded.name,
        description = excluded.description,
        metadata = excluded.metadata,
        payload = excluded.payload,
        tags = excluded.tags,
        created_at = excluded.created_at,
        updated_at = excluded.updated_at
"#;

const UPSERT_RELATIONSHIP_SQL: &str = r#"
    INSERT INTO relationships (
        id, source_id, target_id, relationship_type, strength, confidence,
        metadata, created_at, updated_at
    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT(id) DO UPDATE SET
        source_id = excluded.source_id,
        target_id = excluded.target_id,
        relationship_type = excluded.relationship_type,
        strength = excluded.strength,
        confidence = excluded.confidence,
        metadata = excluded.metadata,
        created_at = excluded.created_at,
        updated_at = excluded.updated_at
"#;

/// SQLite implementation of the graph repository
#[derive(Clone)]
pub struct SqliteGraphRepository {
    pool: SqlitePool,
}

impl SqliteGraphRepository {
    /// Create a new SQLite graph repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

async fn write_node<'e, E>(executor: E, node: &Node) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let metadata_json = serde_json::to_string(&node.metadata)?;
    let payload_json = serde_json::to_string(&node.payload)?;
    let tags_json = serde_json::to_string(&node.tags)?;

    sqlx::query(UPSERT_NODE_SQL)
        .bind(&node.id)
        .bind(node.kind().as_str())
        .bind(&node.name)
        .bind(&node.description)
        .bind(&metadata_json)
        .bind(&payload_json)
        .bind(&tags_json)
        .bind(node.created_at.to_rfc3339())
        .bind(node.updated_at.to_rfc3339())
        .execute(executor)
        .await?;
    Ok(())
}

async fn write_relationship<'e, E>(executor: E, relationship: &Relationship) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let metadata_json = serde_json::to_string(&relationship.metadata)?;

    sqlx::query(UPSERT_RELATIONSHIP_SQL)
        .bind(&relationship.id)
        .bind(&relationship.source_id)
        .bind(&relationship.target_id)
        .bind(relationship.relationship_type.as_str())
        .bind(relationship.strength)
        .bind(relationship.confidence)
        .bind(&metadata_json)
        .bind(relationship.created_at.to_rfc3339())
        .bind(relationship.updated_at.to_rfc3339())
        .execute(executor)
        .await?;
    Ok(())
}

#[async_trait]
impl GraphRepository for SqliteGraphRepository {
    async fn save_node(&self, node: &Node) -> Result<()> {
        write_node(&self.pool, node).await?;
        debug!(node_id = %node.id, node_name = %node.name, kind = %node.kind(), "Node saved");
        Ok(())
    }

    async fn save_relationship(&self, relationship: &Relationship) -> Result<()> {
        write_relationship(&self.pool, relationship).await?;
        debug!(
            relationship_id = %relationship.id,
            source = %relationship.source_id,
            target = %relationship.target_id,
            "Relationship saved"
        );
        Ok(())
    }

    async fn load_all(&self) -> Result<(Vec<Node>, Vec<Relationship>)> {
        let node_rows: Vec<NodeRow> = sqlx::query_as("SELECT * FROM nodes ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        let relationship_rows: Vec<RelationshipRow> =
            sqlx::query_as("SELECT * FROM relationships ORDER BY id")
                .fetch_all(&self.pool)
                .await?;

        let nodes = node_rows
            .into_iter()
            .map(NodeRow::into_node)
            .collect::<Result<Vec<_>>>()?;
        let relationships = relationship_rows
            .into_iter()
            .map(RelationshipRow::into_relationship)
            .collect::<Result<Vec<_>>>()?;

        Ok((nodes, relationships))
    }

    async fn replace_all(&self, nodes: &[Node], relationships: &[Relationship]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM relationships").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM nodes").execute(&mut *tx).await?;

        for node in nodes {
            write_node(&mut *tx, node).await?;
        }
        for relationship in relationships {
            write_relationship(&mut *tx, relationship).await?;
        }

        tx.commit().await?;

        info!(
            nodes = nodes.len(),
            relationships = relationships.len(),
            "Replaced persisted graph"
        );
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM relationships").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM nodes").execute(&mut *tx).await?;
        tx.commit().await?;

        info!("Persisted graph cleared");
        Ok(())
    }

    async fn count_nodes(&self) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM nodes")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn count_relationships(&self) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM relationships")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

fn parse_timestamp(value: &str, column: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Other(format!("Invalid {} '{}': {}", column, value, e)))
}

#[derive(Debug, FromRow)]
struct NodeRow {
    id: String,
    kind: String,
    name: String,
    description: String,
    metadata: String,
    payload: String,
    tags: String,
    created_at: String,
    updated_at: String,
}

impl NodeRow {
    fn into_node(self) -> Result<Node> {
        let kind = NodeKind::parse(&self.kind)
            .ok_or_else(|| Error::Other(format!("Invalid node kind: {}", self.kind)))?;

        let node = Node {
            metadata: serde_json::from_str(&self.metadata)?,
            payload: serde_json::from_str(&self.payload)?,
            tags: serde_json::from_str(&self.tags)?,
            created_at: parse_timestamp(&self.created_at, "created_at")?,
            updated_at: parse_timestamp(&self.updated_at, "updated_at")?,
            id: self.id,
            name: self.name,
            description: self.description,
        };

        if node.kind() != kind {
            return Err(Error::Other(format!(
                "Node {} stored as {} but payload is {}",
                node.id,
                kind,
                node.kind()
            )));
        }
        Ok(node)
    }
}

#[derive(Debug, FromRow)]
struct RelationshipRow {
    id: String,
    source_id: String,
    target_id: String,
    relationship_type: String,
    strength: f64,
    confidence: f64,
    metadata: String,
    created_at: String,
    updated_at: String,
}

impl RelationshipRow {
    fn into_relationship(self) -> Result<Relationship> {
        let relationship_type = RelationshipType::parse(&self.relationship_type).ok_or_else(|| {
            Error::Other(format!(
                "Invalid relationship type: {}",
                self.relationship_type
            ))
        })?;

        Ok(Relationship {
            relationship_type,
            strength: self.strength,
            confidence: self.confidence,
            metadata: serde_json::from_str(&self.metadata)?,
            created_at: parse_timestamp(&self.created_at, "created_at")?,
            updated_at: parse_timestamp(&self.updated_at, "updated_at")?,
            id: self.id,
            source_id: self.source_id,
            target_id: self.target_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::graph::{AgentProfile, CapabilityCategory, CapabilitySpec};
    use crate::storage::Database;

    async fn setup_test_db() -> SqliteGraphRepository {
        let db = Database::in_memory().await.unwrap();
        SqliteGraphRepository::new(db.pool().clone())
    }

    fn coder() -> Node {
        Node::agent(
            "coder",
            AgentProfile::new("coder")
                .with_system("dev")
                .with_capabilities(["coding", "testing"])
                .with_metric("success_rate", 0.9),
        )
        .with_tag("backend")
        .with_metadata("team", serde_json::json!("core"))
    }

    #[tokio::test]
    async fn test_save_and_load_node() {
        let repo = setup_test_db().await;
        let node = coder();

        repo.save_node(&node).await.unwrap();

        let (nodes, relationships) = repo.load_all().await.unwrap();
        assert_eq!(nodes, vec![node]);
        assert!(relationships.is_empty());
    }

    #[tokio::test]
    async fn test_save_node_replaces_by_id() {
        let repo = setup_test_db().await;
        let mut node = coder();
        repo.save_node(&node).await.unwrap();

        node.name = "senior-coder".into();
        repo.save_node(&node).await.unwrap();

        assert_eq!(repo.count_nodes().await.unwrap(), 1);
        let (nodes, _) = repo.load_all().await.unwrap();
        assert_eq!(nodes[0].name, "senior-coder");
    }

    #[tokio::test]
    async fn test_save_and_load_relationship() {
        let repo = setup_test_db().await;
        let a = coder();
        let b = Node::capability("coding", CapabilitySpec::new(CapabilityCategory::Development));
        repo.save_node(&a).await.unwrap();
        repo.save_node(&b).await.unwrap();

        let rel = Relationship::new(&a.id, &b.id, RelationshipType::HasCapability)
            .with_strength(0.75)
            .with_confidence(0.5);
        repo.save_relationship(&rel).await.unwrap();

        let (_, relationships) = repo.load_all().await.unwrap();
        assert_eq!(relationships, vec![rel]);
        assert_eq!(repo.count_relationships().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_dangling_relationship_rejected_by_database() {
        let repo = setup_test_db().await;
        let a = coder();
        repo.save_node(&a).await.unwrap();

        let rel = Relationship::new(&a.id, "missing", RelationshipType::DependsOn);
        let err = repo.save_relationship(&rel).await.unwrap_err();
        assert!(err.is_persistence());
    }

    #[tokio::test]
    async fn test_replace_all_and_clear() {
        let repo = setup_test_db().await;
        repo.save_node(&coder()).await.unwrap();

        let a = coder();
        let b = coder();
        let rel = Relationship::new(&a.id, &b.id, RelationshipType::CollaboratesWith);
        repo.replace_all(&[a.clone(), b.clone()], &[rel.clone()])
            .await
            .unwrap();

        assert_eq!(repo.count_nodes().await.unwrap(), 2);
        assert_eq!(repo.count_relationships().await.unwrap(), 1);

        repo.clear().await.unwrap();
        assert_eq!(repo.count_nodes().await.unwrap(), 0);
        assert_eq!(repo.count_relationships().await.unwrap(), 0);
    }
}
