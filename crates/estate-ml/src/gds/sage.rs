//! GraphSAGE embeddings for apartments, owners and districts.

use anyhow::{Context, Result};
use async_trait::async_trait;
use neo4rs::Query;
use serde::Serialize;
use tracing::info;

use estate_graph::GraphClient;
use super::projection::{drop_all, project, ProjectionSummary};
use super::{within_timeout, GdsConfig, GraphLearner, APARTMENT_FEATURES};

pub const MODEL_NAME: &str = "sage_apartment_model";

/// Node property the trained embeddings are written to.
pub const EMBEDDING_PROPERTY: &str = "sage_embeddings";

const TRAIN_MODEL: &str = "
    CALL gds.beta.graphSage.train($graph_name, {
        modelName: $model_name,
        featureProperties: $features,
        randomSeed: 420,
        embeddingDimension: 64,
        projectedFeatureDimension: 64,
        activationFunction: 'sigmoid',
        maxIterations: 20,
        searchDepth: 10,
        learningRate: 0.001,
        penaltyL2: 1e-5,
        tolerance: 0.0,
        epochs: 100
    })
    YIELD modelInfo
    RETURN modelInfo.metrics.epochLosses AS epoch_losses,
           modelInfo.metrics.didConverge AS did_converge";

const WRITE_EMBEDDINGS: &str = "
    CALL gds.beta.graphSage.write($graph_name, {
        modelName: $model_name,
        writeProperty: $property
    })
    YIELD nodePropertiesWritten
    RETURN nodePropertiesWritten AS written";

const STREAM_EMBEDDINGS: &str = "
    CALL gds.beta.graphSage.stream($graph_name, {modelName: $model_name})
    YIELD nodeId, embedding
    WITH gds.util.asNode(nodeId) AS n, embedding
    RETURN labels(n)[0] AS label,
           coalesce(n.id, n.name, toString(n.postal_code)) AS key,
           embedding";

/// Training summary for a GraphSAGE run.
#[derive(Debug, Clone, Serialize)]
pub struct SageReport {
    pub projection: ProjectionSummary,
    pub epoch_losses: Vec<f64>,
    pub did_converge: bool,
    pub properties_written: i64,
}

/// Embedding of one projected node.
#[derive(Debug, Clone, Serialize)]
pub struct NodeEmbedding {
    pub label: String,
    pub key: String,
    pub embedding: Vec<f64>,
}

/// GraphSAGE learner. Training also writes the embeddings back to the
/// graph so the similarity queries can read them.
pub struct GraphSage {
    config: GdsConfig,
}

impl GraphSage {
    pub fn new(config: GdsConfig) -> Self {
        Self { config }
    }

    async fn write_embeddings(&self, client: &GraphClient) -> Result<i64> {
        let query = Query::new(WRITE_EMBEDDINGS.to_string())
            .param("graph_name", self.config.graph_name.as_str())
            .param("model_name", MODEL_NAME)
            .param("property", EMBEDDING_PROPERTY);

        let written: Option<i64> = within_timeout(&self.config, "embedding write", client.query_scalar(query, "written"))
            .await
            .context("Failed to write GraphSAGE embeddings")?;
        Ok(written.unwrap_or(0))
    }
}

#[async_trait]
impl GraphLearner for GraphSage {
    type Report = SageReport;
    type Output = NodeEmbedding;

    async fn train(&self, client: &GraphClient) -> Result<SageReport> {
        drop_all(client, &self.config, &[MODEL_NAME], &[]).await?;
        let projection = project(client, &self.config).await?;

        let features: Vec<String> = APARTMENT_FEATURES.iter().map(|f| f.to_string()).collect();
        let query = Query::new(TRAIN_MODEL.to_string())
            .param("graph_name", self.config.graph_name.as_str())
            .param("model_name", MODEL_NAME)
            .param("features", features);

        let rows = within_timeout(&self.config, "GraphSAGE training", client.query(query))
            .await
            .context("GraphSAGE training failed")?;
        let row = rows.into_iter().next()
            .context("GraphSAGE training returned no model info")?;

        let epoch_losses: Vec<f64> = row.get("epoch_losses").unwrap_or_default();
        let did_converge: bool = row.get("did_converge").unwrap_or(false);
        info!(epochs = epoch_losses.len(), did_converge, "GraphSAGE model trained");

        let properties_written = self.write_embeddings(client).await?;
        info!(written = properties_written, property = EMBEDDING_PROPERTY, "GraphSAGE embeddings written");

        Ok(SageReport {
            projection,
            epoch_losses,
            did_converge,
            properties_written,
        })
    }

    async fn stream(&self, client: &GraphClient) -> Result<Vec<NodeEmbedding>> {
        let query = Query::new(STREAM_EMBEDDINGS.to_string())
            .param("graph_name", self.config.graph_name.as_str())
            .param("model_name", MODEL_NAME);

        let rows = within_timeout(&self.config, "GraphSAGE stream", client.query(query))
            .await
            .context("Failed to stream GraphSAGE embeddings")?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                Some(NodeEmbedding {
                    label: row.get("label").ok()?,
                    key: row.get("key").ok()?,
                    embedding: row.get("embedding").ok()?,
                })
            })
            .collect())
    }
}
