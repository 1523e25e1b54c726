//! In-memory graph projection and GDS catalog cleanup.

use anyhow::{Context, Result};
use neo4rs::Query;
use serde::Serialize;
use tracing::{debug, info};

use estate_graph::GraphClient;
use super::{within_timeout, GdsConfig, APARTMENT_FEATURES};

const PROJECT_GRAPH: &str = "
    CALL gds.graph.project(
        $graph_name,
        {Apartment: {properties: $properties}, Owner: {}, District: {}},
        {
            LOCATED_IN: {orientation: 'UNDIRECTED'},
            OWNED_BY: {orientation: 'UNDIRECTED'},
            NEIGHBOR_OF: {orientation: 'UNDIRECTED'}
        }
    )
    YIELD graphName, nodeCount, relationshipCount
    RETURN graphName AS graph_name, nodeCount AS node_count, relationshipCount AS relationship_count";

/// Size of the projected graph.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectionSummary {
    pub graph_name: String,
    pub node_count: i64,
    pub relationship_count: i64,
}

/// Project the apartment graph under `config.graph_name`.
pub async fn project(client: &GraphClient, config: &GdsConfig) -> Result<ProjectionSummary> {
    let query = Query::new(PROJECT_GRAPH.to_string())
        .param("graph_name", config.graph_name.as_str())
        .param("properties", APARTMENT_FEATURES.iter().map(|p| p.to_string()).collect::<Vec<_>>());

    let rows = within_timeout(config, "graph projection", client.query(query))
        .await
        .context("Failed to project the apartment graph")?;

    let row = rows.into_iter().next()
        .context("Graph projection returned no summary")?;
    let summary = ProjectionSummary {
        graph_name: row.get("graph_name").unwrap_or_default(),
        node_count: row.get("node_count").unwrap_or(0),
        relationship_count: row.get("relationship_count").unwrap_or(0),
    };

    info!(
        graph = %summary.graph_name,
        nodes = summary.node_count,
        rels = summary.relationship_count,
        "Projected graph"
    );
    Ok(summary)
}

/// Drop the given models and pipelines, then the projected graph. Missing
/// entries are ignored.
pub async fn drop_all(client: &GraphClient, config: &GdsConfig, models: &[&str], pipelines: &[&str]) -> Result<()> {
    for model in models {
        let query = Query::new("CALL gds.beta.model.drop($name, false)".to_string())
            .param("name", *model);
        within_timeout(config, "model drop", client.execute(query)).await?;
    }

    let query = Query::new("CALL gds.graph.drop($name, false)".to_string())
        .param("name", config.graph_name.as_str());
    within_timeout(config, "graph drop", client.execute(query)).await?;

    for pipeline in pipelines {
        let query = Query::new("CALL gds.beta.pipeline.drop($name, false)".to_string())
            .param("name", *pipeline);
        within_timeout(config, "pipeline drop", client.execute(query)).await?;
    }

    debug!(graph = %config.graph_name, models = models.len(), pipelines = pipelines.len(), "Cleared GDS catalog");
    Ok(())
}
