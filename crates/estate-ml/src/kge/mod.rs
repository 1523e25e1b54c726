//! Knowledge-graph embedding over apartment triples.
//!
//! Triples for `LOCATED_IN`, `IN_PRICE_RANGE` and `OWNED_BY` are read from the
//! graph, split 80/10/10 and handed to an [`EmbeddingTrainer`]. Training and
//! scoring happen in the trainer's backend.

pub mod service;

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::info;

use estate_core::{EstateError, EstateResult};
use estate_graph::queries::triples::embedding_triples;
use estate_graph::{EmbeddingRelation, GraphClient};

pub use estate_graph::Triple;
pub use service::KgeServiceClient;

/// Training/testing/validation ratios.
pub const DEFAULT_SPLIT_RATIOS: [f64; 3] = [0.8, 0.1, 0.1];

/// Embedding service configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub model: String,
    pub embedding_dim: usize,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub loss: String,
    pub seed: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8090".to_string(),
            timeout_secs: 900,
            model: "RotatE".to_string(),
            embedding_dim: 50,
            epochs: 50,
            batch_size: 32,
            learning_rate: 0.001,
            loss: "BCEWithLogitsLoss".to_string(),
            seed: 420,
        }
    }
}

/// Hyperparameters sent with a training request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbeddingParams {
    pub model: String,
    pub loss: String,
    pub embedding_dim: usize,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub seed: u64,
}

impl From<&EmbeddingConfig> for EmbeddingParams {
    fn from(config: &EmbeddingConfig) -> Self {
        Self {
            model: config.model.clone(),
            loss: config.loss.clone(),
            embedding_dim: config.embedding_dim,
            epochs: config.epochs,
            batch_size: config.batch_size,
            learning_rate: config.learning_rate,
            seed: config.seed,
        }
    }
}

/// A labeled triple set partitioned for training.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TripleSplit {
    pub training: Vec<Triple>,
    pub testing: Vec<Triple>,
    pub validation: Vec<Triple>,
}

impl TripleSplit {
    /// Shuffle `triples` with `seed` and partition them by `ratios`
    /// (training, testing, validation).
    ///
    /// Evaluation triples mentioning an entity or relation that never occurs
    /// in training are moved into training, so every label the model is
    /// asked about has an embedding.
    pub fn split(mut triples: Vec<Triple>, ratios: [f64; 3], seed: u64) -> EstateResult<Self> {
        if ratios.iter().any(|r| !r.is_finite() || *r < 0.0) || (ratios.iter().sum::<f64>() - 1.0).abs() > 1e-6 {
            return Err(EstateError::config(format!(
                "split ratios must be non-negative and sum to 1, got {:?}",
                ratios
            )));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        triples.shuffle(&mut rng);

        let total = triples.len();
        let n_testing = (total as f64 * ratios[1]).floor() as usize;
        let n_validation = (total as f64 * ratios[2]).floor() as usize;
        let n_training = total - n_testing - n_validation;

        let mut rest = triples.split_off(n_training);
        let validation = rest.split_off(n_testing);
        let mut split = Self {
            training: triples,
            testing: rest,
            validation,
        };
        split.cover_evaluation_labels();
        Ok(split)
    }

    fn cover_evaluation_labels(&mut self) {
        let mut known: HashSet<String> = HashSet::new();
        for triple in &self.training {
            known.insert(triple.subject.clone());
            known.insert(triple.object.clone());
            known.insert(triple.predicate.clone());
        }

        for bucket in [&mut self.testing, &mut self.validation] {
            let mut kept = Vec::with_capacity(bucket.len());
            for triple in bucket.drain(..) {
                let covered = known.contains(&triple.subject)
                    && known.contains(&triple.object)
                    && known.contains(&triple.predicate);
                if covered {
                    kept.push(triple);
                } else {
                    known.insert(triple.subject.clone());
                    known.insert(triple.object.clone());
                    known.insert(triple.predicate.clone());
                    self.training.push(triple);
                }
            }
            *bucket = kept;
        }
    }

    pub fn len(&self) -> usize {
        self.training.len() + self.testing.len() + self.validation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A model trained by the embedding backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedEmbedding {
    pub model_id: String,
    /// Loss per epoch.
    pub losses: Vec<f64>,
}

impl TrainedEmbedding {
    /// Persist the training report as pretty JSON.
    pub fn write_report(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write training report to {}", path.display()))
    }

    pub fn read_report(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read training report {}", path.display()))?;
        serde_json::from_str(&content).context("Invalid training report")
    }
}

/// A ranked tail for a (head, relation) query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TailPrediction {
    pub tail: String,
    pub score: f64,
}

/// Backend that trains an embedding model and scores tails.
#[async_trait]
pub trait EmbeddingTrainer: Send + Sync {
    /// Train a model on `split`.
    async fn train(&self, split: &TripleSplit, params: &EmbeddingParams) -> Result<TrainedEmbedding>;

    /// Rank candidate tails for `(head, relation)`, best first.
    async fn predict(&self, model: &TrainedEmbedding, head: &str, relation: &str) -> Result<Vec<TailPrediction>>;
}

/// Embedding adapter over the apartment graph.
pub struct ApartmentEmbedding<T: EmbeddingTrainer> {
    trainer: T,
    params: EmbeddingParams,
    ratios: [f64; 3],
    timeout: Duration,
}

impl<T: EmbeddingTrainer> ApartmentEmbedding<T> {
    pub fn new(trainer: T, config: &EmbeddingConfig) -> Self {
        Self {
            trainer,
            params: EmbeddingParams::from(config),
            ratios: DEFAULT_SPLIT_RATIOS,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Extract triples from the graph, split them and train a model.
    pub async fn train(&self, client: &GraphClient) -> Result<TrainedEmbedding> {
        let triples = embedding_triples(client).await?;
        if triples.is_empty() {
            anyhow::bail!("No embedding triples in the graph. Run `estate import` and `estate derive` first.");
        }

        let split = TripleSplit::split(triples, self.ratios, self.params.seed)?;
        info!(
            training = split.training.len(),
            testing = split.testing.len(),
            validation = split.validation.len(),
            model = %self.params.model,
            "Training embedding model"
        );

        let trained = self.within_timeout("training", self.trainer.train(&split, &self.params)).await?;
        info!(model_id = %trained.model_id, epochs = trained.losses.len(), "Embedding model trained");
        Ok(trained)
    }

    /// Rank tails for `head` under `relation`.
    pub async fn predict(
        &self,
        model: &TrainedEmbedding,
        head: &str,
        relation: EmbeddingRelation,
    ) -> Result<Vec<TailPrediction>> {
        self.within_timeout("prediction", self.trainer.predict(model, head, relation.as_str()))
            .await
    }

    async fn within_timeout<R>(
        &self,
        stage: &str,
        fut: impl std::future::Future<Output = Result<R>>,
    ) -> Result<R> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(EstateError::unavailable(
                service::SERVICE_NAME,
                format!("{} timed out after {}s", stage, self.timeout.as_secs()),
            )
            .into()),
        }
    }
}
