//! # Estate ML
//!
//! Machine-learning adapters over the finished apartment graph:
//! - `kge`: knowledge-graph embeddings trained by an external service
//! - `gds`: Neo4j Graph Data Science regression, GraphSAGE and similarity

pub mod gds;
pub mod kge;

pub use gds::{GdsConfig, GraphLearner, GraphSage, NodeRegression};
pub use kge::{ApartmentEmbedding, EmbeddingConfig, EmbeddingTrainer, KgeServiceClient, TrainedEmbedding};
