//! HTTP client for an external knowledge-graph embedding service.
//!
//! The service trains a model on labeled triples (`POST /train`) and ranks
//! tails for a head and relation (`POST /predict`).

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use estate_core::EstateError;
use super::{EmbeddingConfig, EmbeddingParams, EmbeddingTrainer, TailPrediction, TrainedEmbedding, Triple, TripleSplit};

pub(crate) const SERVICE_NAME: &str = "kge-service";

/// Embedding service client.
#[derive(Clone)]
pub struct KgeServiceClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct TrainRequest<'a> {
    #[serde(flatten)]
    params: &'a EmbeddingParams,
    training: Vec<[&'a str; 3]>,
    testing: Vec<[&'a str; 3]>,
    validation: Vec<[&'a str; 3]>,
}

#[derive(Deserialize)]
struct TrainResponse {
    model_id: String,
    #[serde(default)]
    losses: Vec<f64>,
}

#[derive(Serialize)]
struct PredictRequest<'a> {
    model_id: &'a str,
    head: &'a str,
    relation: &'a str,
}

#[derive(Deserialize)]
struct PredictResponse {
    predictions: Vec<TailPrediction>,
}

fn as_rows(triples: &[Triple]) -> Vec<[&str; 3]> {
    triples
        .iter()
        .map(|t| [t.subject.as_str(), t.predicate.as_str(), t.object.as_str()])
        .collect()
}

impl KgeServiceClient {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EstateError::config(format!("Failed to build embedding HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn post<B: Serialize, R: for<'de> Deserialize<'de>>(&self, path: &str, body: &B) -> Result<R> {
        let response = self.client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .map_err(|e| EstateError::unavailable(SERVICE_NAME, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = if status.is_server_error() {
                EstateError::unavailable(SERVICE_NAME, format!("{}: {}", status, body))
            } else {
                EstateError::invalid_response(SERVICE_NAME, format!("{}: {}", status, body))
            };
            return Err(err.into());
        }

        let parsed = response
            .json()
            .await
            .map_err(|e| EstateError::invalid_response(SERVICE_NAME, e.to_string()))?;
        Ok(parsed)
    }
}

#[async_trait]
impl EmbeddingTrainer for KgeServiceClient {
    async fn train(&self, split: &TripleSplit, params: &EmbeddingParams) -> Result<TrainedEmbedding> {
        let request = TrainRequest {
            params,
            training: as_rows(&split.training),
            testing: as_rows(&split.testing),
            validation: as_rows(&split.validation),
        };

        let result: TrainResponse = self.post("/train", &request).await?;
        if result.model_id.trim().is_empty() {
            return Err(EstateError::invalid_response(SERVICE_NAME, "empty model_id").into());
        }

        debug!(model_id = %result.model_id, epochs = result.losses.len(), "Embedding service trained model");
        Ok(TrainedEmbedding {
            model_id: result.model_id,
            losses: result.losses,
        })
    }

    async fn predict(&self, model: &TrainedEmbedding, head: &str, relation: &str) -> Result<Vec<TailPrediction>> {
        let request = PredictRequest {
            model_id: &model.model_id,
            head,
            relation,
        };

        let mut result: PredictResponse = self.post("/predict", &request).await?;
        result.predictions.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(result.predictions)
    }
}
