//! Apartment price regression with a GDS node regression pipeline.
//!
//! FastRP embeddings over the projected graph are combined with the price
//! feature and fed to an auto-tuned linear regression.

use anyhow::{Context, Result};
use async_trait::async_trait;
use neo4rs::Query;
use serde::Serialize;
use tracing::info;

use estate_graph::GraphClient;
use super::projection::{drop_all, project, ProjectionSummary};
use super::{within_timeout, GdsConfig, GraphLearner, APARTMENT_FEATURES};

pub const PIPELINE_NAME: &str = "regression_pipeline_apartments";
pub const MODEL_NAME: &str = "regression_apartment_model";

/// Pipeline configuration, applied in order after `create`.
const PIPELINE_STEPS: &[&str] = &[
    "CALL gds.alpha.pipeline.nodeRegression.create($pipeline)",
    "CALL gds.alpha.pipeline.nodeRegression.configureSplit($pipeline, {testFraction: 0.2, validationFolds: 5})",
    "CALL gds.alpha.pipeline.nodeRegression.addLinearRegression($pipeline, {
        penalty: 1e-5, patience: 3, tolerance: 1e-5, minEpochs: 100, maxEpochs: 500,
        learningRate: {range: [0.001, 1000.0]}
    })",
    "CALL gds.alpha.pipeline.nodeRegression.configureAutoTuning($pipeline, {maxTrials: 10})",
    "CALL gds.alpha.pipeline.nodeRegression.addNodeProperty($pipeline, 'fastRP', {
        embeddingDimension: 256, propertyRatio: 0.8, featureProperties: $features,
        mutateProperty: 'frp_embedding', randomSeed: 420
    })",
    "CALL gds.alpha.pipeline.nodeRegression.selectFeatures($pipeline, ['price', 'frp_embedding'])",
];

const TRAIN_MODEL: &str = "
    CALL gds.alpha.pipeline.nodeRegression.train($graph_name, {
        pipeline: $pipeline,
        modelName: $model_name,
        targetNodeLabels: ['Apartment'],
        targetProperty: 'price',
        metrics: ['MEAN_SQUARED_ERROR', 'MEAN_ABSOLUTE_ERROR', 'ROOT_MEAN_SQUARED_ERROR'],
        randomSeed: 420
    })
    YIELD modelInfo
    RETURN [k IN keys(modelInfo.bestParameters) | k + '=' + toString(modelInfo.bestParameters[k])] AS best_parameters,
           modelInfo.metrics.MEAN_SQUARED_ERROR.test AS mse,
           modelInfo.metrics.MEAN_ABSOLUTE_ERROR.test AS mae,
           modelInfo.metrics.ROOT_MEAN_SQUARED_ERROR.test AS rmse";

const PREDICT_STREAM: &str = "
    CALL gds.alpha.pipeline.nodeRegression.predict.stream($graph_name, {
        modelName: $model_name,
        targetNodeLabels: ['Apartment']
    })
    YIELD nodeId, predictedValue
    WITH gds.util.asNode(nodeId) AS a, predictedValue
    RETURN a.id AS id, a.price AS actual, predictedValue AS predicted
    ORDER BY id";

/// Test-set scores reported by the trained pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct RegressionReport {
    pub projection: ProjectionSummary,
    pub best_parameters: Vec<String>,
    pub mse: f64,
    pub mae: f64,
    pub rmse: f64,
}

/// Predicted and actual price of one apartment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricePrediction {
    pub id: String,
    pub actual: Option<i64>,
    pub predicted: f64,
}

/// Error metrics over apartments with a known price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ErrorSummary {
    pub count: usize,
    pub mse: f64,
    pub mae: f64,
    pub rmse: f64,
}

/// Compare predictions against actual prices.
pub fn error_summary(predictions: &[PricePrediction]) -> Option<ErrorSummary> {
    let errors: Vec<f64> = predictions
        .iter()
        .filter_map(|p| p.actual.map(|actual| p.predicted - actual as f64))
        .collect();
    if errors.is_empty() {
        return None;
    }

    let n = errors.len() as f64;
    let mse = errors.iter().map(|e| e * e).sum::<f64>() / n;
    let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;
    Some(ErrorSummary {
        count: errors.len(),
        mse,
        mae,
        rmse: mse.sqrt(),
    })
}

/// Node regression learner for apartment prices.
pub struct NodeRegression {
    config: GdsConfig,
}

impl NodeRegression {
    pub fn new(config: GdsConfig) -> Self {
        Self { config }
    }

    async fn build_pipeline(&self, client: &GraphClient) -> Result<()> {
        let features: Vec<String> = APARTMENT_FEATURES.iter().map(|f| f.to_string()).collect();
        for step in PIPELINE_STEPS {
            let mut query = Query::new(step.to_string()).param("pipeline", PIPELINE_NAME);
            if step.contains("$features") {
                query = query.param("features", features.clone());
            }
            within_timeout(&self.config, "pipeline configuration", client.execute(query))
                .await
                .with_context(|| format!("Pipeline step failed: {}", step.trim()))?;
        }
        Ok(())
    }
}

#[async_trait]
impl GraphLearner for NodeRegression {
    type Report = RegressionReport;
    type Output = PricePrediction;

    async fn train(&self, client: &GraphClient) -> Result<RegressionReport> {
        drop_all(client, &self.config, &[MODEL_NAME], &[PIPELINE_NAME]).await?;
        let projection = project(client, &self.config).await?;
        self.build_pipeline(client).await?;

        let query = Query::new(TRAIN_MODEL.to_string())
            .param("graph_name", self.config.graph_name.as_str())
            .param("pipeline", PIPELINE_NAME)
            .param("model_name", MODEL_NAME);

        let rows = within_timeout(&self.config, "regression training", client.query(query))
            .await
            .context("Node regression training failed")?;
        let row = rows.into_iter().next()
            .context("Node regression training returned no model info")?;

        let report = RegressionReport {
            projection,
            best_parameters: row.get("best_parameters").unwrap_or_default(),
            mse: row.get("mse").unwrap_or(f64::NAN),
            mae: row.get("mae").unwrap_or(f64::NAN),
            rmse: row.get("rmse").unwrap_or(f64::NAN),
        };

        info!(mse = report.mse, mae = report.mae, rmse = report.rmse, "Regression model trained");
        Ok(report)
    }

    async fn stream(&self, client: &GraphClient) -> Result<Vec<PricePrediction>> {
        let query = Query::new(PREDICT_STREAM.to_string())
            .param("graph_name", self.config.graph_name.as_str())
            .param("model_name", MODEL_NAME);

        let rows = within_timeout(&self.config, "regression prediction", client.query(query))
            .await
            .context("Failed to stream price predictions")?;

        Ok(rows
            .into_iter()
            .map(|row| PricePrediction {
                id: row.get("id").unwrap_or_default(),
                actual: row.get("actual").ok(),
                predicted: row.get("predicted").unwrap_or(f64::NAN),
            })
            .collect())
    }
}
