//! # Estate Graph
//!
//! Neo4j integration for the Vienna apartment knowledge graph.
//!
//! Loads validated listings, derives address, neighbor and price-range
//! relationships, and runs analytical queries.

pub mod client;
pub mod derive;
pub mod geocode;
pub mod loader;
pub mod queries;
pub mod schema;

pub use client::{GraphClient, GraphConfig, GraphCounts};
pub use derive::DeriveResult;
pub use geocode::{GeocoderConfig, NominatimClient, ReverseGeocoder, RetryPolicy};
pub use loader::{ImportOutcome, ImportReport, import_listings};
pub use queries::triples::{EmbeddingRelation, Triple};
