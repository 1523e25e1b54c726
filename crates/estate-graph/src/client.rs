//! Neo4j connection client.

use anyhow::{Context, Result};
use neo4rs::{ConfigBuilder, Graph, Query, Row};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::warn;

/// Configuration for connecting to Neo4j.
///
/// `db` selects the target database at connection level; statements never
/// name a database themselves.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub db: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: "password".to_string(),
            db: "neo4j".to_string(),
        }
    }
}

/// Client for Neo4j graph store operations.
#[derive(Clone)]
pub struct GraphClient {
    graph: Graph,
}

impl GraphClient {
    /// Create a new GraphClient from config.
    ///
    /// `Graph::connect` only builds the pool, so a `RETURN 1` ping forces the
    /// bolt handshake and lets callers put a timeout around connecting.
    pub async fn connect(config: &GraphConfig) -> Result<Self> {
        let neo4j_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .db(config.db.as_str())
            .max_connections(4)
            .fetch_size(500)
            .build()
            .context("Failed to build Neo4j config")?;

        let graph = Graph::connect(neo4j_config)
            .await
            .context("Failed to create Neo4j connection pool")?;

        graph.run(Query::new("RETURN 1".to_string())).await
            .context("Neo4j is not responding to queries")?;

        Ok(Self { graph })
    }

    /// Execute a Cypher query that returns no results.
    pub async fn execute(&self, query: Query) -> Result<()> {
        self.graph.run(query).await.context("Neo4j query execution failed")?;
        Ok(())
    }

    /// Execute a Cypher query and return results as rows.
    pub async fn query(&self, query: Query) -> Result<Vec<Row>> {
        let mut result = self.graph.execute(query).await
            .context("Neo4j query failed")?;

        let mut rows = Vec::new();
        while let Some(row) = result.next().await.context("Failed to read Neo4j result row")? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Execute a Cypher query and return a single scalar value.
    pub async fn query_scalar<T: DeserializeOwned>(&self, query: Query, field: &str) -> Result<Option<T>> {
        let rows = self.query(query).await?;
        if let Some(row) = rows.into_iter().next() {
            let val: T = row.get(field)
                .map_err(|e| anyhow::anyhow!("Failed to get field '{}': {:?}", field, e))?;
            Ok(Some(val))
        } else {
            Ok(None)
        }
    }

    /// Run all statements in one transaction.
    pub async fn execute_in_transaction(&self, statements: Vec<Query>) -> Result<()> {
        let mut txn = self.graph.start_txn().await
            .context("Failed to start transaction")?;

        let mut failure = None;
        for statement in statements {
            if let Err(e) = txn.run(statement).await {
                failure = Some(e);
                break;
            }
        }

        match failure {
            None => txn.commit().await.context("Failed to commit transaction"),
            Some(e) => {
                warn!(error = %e, "Rolling back transaction");
                txn.rollback().await.context("Failed to rollback transaction")?;
                Err(e).context("Transaction statement failed")
            }
        }
    }

    /// Get node and relationship counts for status display.
    pub async fn get_counts(&self) -> Result<GraphCounts> {
        let node_query = Query::new("MATCH (n) RETURN count(n) as count".to_string());
        let rel_query = Query::new("MATCH ()-[r]->() RETURN count(r) as count".to_string());

        let node_count: i64 = self.query_scalar(node_query, "count").await?
            .unwrap_or(0);
        let rel_count: i64 = self.query_scalar(rel_query, "count").await?
            .unwrap_or(0);

        let label_rows = self.query(Query::new(
            "MATCH (n) UNWIND labels(n) AS label
             RETURN label, count(*) AS count
             ORDER BY label"
                .to_string(),
        ))
        .await?;

        let type_rows = self.query(Query::new(
            "MATCH ()-[r]->()
             RETURN type(r) AS label, count(*) AS count
             ORDER BY label"
                .to_string(),
        ))
        .await?;

        Ok(GraphCounts {
            nodes: node_count as usize,
            relationships: rel_count as usize,
            by_label: parse_label_counts(label_rows),
            by_relationship: parse_label_counts(type_rows),
        })
    }

    /// Delete every node and relationship in the target database.
    pub async fn clear(&self) -> Result<()> {
        self.execute(Query::new("MATCH (n) DETACH DELETE n".to_string())).await
            .context("Failed to clear the graph")
    }
}

fn parse_label_counts(rows: Vec<Row>) -> Vec<(String, usize)> {
    rows.into_iter()
        .filter_map(|row| {
            let label: String = row.get("label").ok()?;
            let count: i64 = row.get("count").ok()?;
            Some((label, count as usize))
        })
        .collect()
}

/// Node and relationship counts.
#[derive(Debug, Clone)]
pub struct GraphCounts {
    pub nodes: usize,
    pub relationships: usize,
    pub by_label: Vec<(String, usize)>,
    pub by_relationship: Vec<(String, usize)>,
}
