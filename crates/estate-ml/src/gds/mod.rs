//! Neo4j Graph Data Science adapters.
//!
//! Every learner projects the same in-memory graph (apartments, owners and
//! districts joined by undirected `LOCATED_IN`, `OWNED_BY` and `NEIGHBOR_OF`
//! edges), trains a GDS model on it and streams results back.

pub mod projection;
pub mod regression;
pub mod sage;
pub mod similarity;

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

use estate_core::EstateError;
use estate_graph::GraphClient;

pub use regression::NodeRegression;
pub use sage::GraphSage;

pub(crate) const SERVICE_NAME: &str = "graph-data-science";

/// Numeric apartment properties projected into the in-memory graph.
pub const APARTMENT_FEATURES: [&str; 5] = ["floor", "number_of_rooms", "price", "quality", "size"];

/// Graph Data Science configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GdsConfig {
    pub graph_name: String,
    pub timeout_secs: u64,
}

impl Default for GdsConfig {
    fn default() -> Self {
        Self {
            graph_name: "apartment-graph".to_string(),
            timeout_secs: 600,
        }
    }
}

impl GdsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// A GDS model trained on the projected graph.
#[async_trait]
pub trait GraphLearner: Send + Sync {
    /// Training summary.
    type Report: Send;
    /// One streamed result row.
    type Output: Send;

    /// Project the graph and train the model.
    async fn train(&self, client: &GraphClient) -> Result<Self::Report>;

    /// Stream model output for the projected graph.
    async fn stream(&self, client: &GraphClient) -> Result<Vec<Self::Output>>;
}

/// Run a GDS call, failing with `ServiceUnavailable` once the configured
/// timeout elapses.
pub(crate) async fn within_timeout<T>(
    config: &GdsConfig,
    stage: &str,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(config.timeout(), fut).await {
        Ok(result) => result,
        Err(_) => Err(EstateError::unavailable(
            SERVICE_NAME,
            format!("{} timed out after {}s", stage, config.timeout_secs),
        )
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GdsConfig::default();
        assert_eq!(config.graph_name, "apartment-graph");
        assert_eq!(config.timeout(), Duration::from_secs(600));
    }

    #[tokio::test]
    async fn test_timeout_is_unavailable() {
        let config = GdsConfig { timeout_secs: 0, ..Default::default() };
        let err = within_timeout(&config, "training", std::future::pending::<Result<()>>())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("training timed out"));
        assert!(matches!(
            err.downcast_ref::<EstateError>(),
            Some(EstateError::ServiceUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_completed_call_passes_through() {
        let config = GdsConfig::default();
        let value = within_timeout(&config, "projection", async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }
}
