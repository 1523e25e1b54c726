//! Nearest neighbors over written GraphSAGE embeddings.
//!
//! Distances are Euclidean; each query returns the closest pairs first.
//! Nodes without an embedding are ignored.

use anyhow::{Context, Result};
use neo4rs::Query;
use serde::Serialize;

use estate_graph::GraphClient;
use super::{within_timeout, GdsConfig};

/// Number of pairs each similarity query returns.
pub const SIMILARITY_LIMIT: i64 = 5;

/// Two nodes and the distance between their embeddings.
#[derive(Debug, Clone, Serialize)]
pub struct SimilarPair {
    pub left: String,
    pub right: String,
    pub distance: f64,
}

async fn similar_pairs(client: &GraphClient, config: &GdsConfig, query: Query) -> Result<Vec<SimilarPair>> {
    let rows = within_timeout(config, "similarity query", client.query(query.param("limit", SIMILARITY_LIMIT)))
        .await
        .context("Similarity query failed")?;

    Ok(rows
        .into_iter()
        .map(|row| SimilarPair {
            left: row.get("left").unwrap_or_default(),
            right: row.get("right").unwrap_or_default(),
            distance: row.get("distance").unwrap_or(f64::NAN),
        })
        .collect())
}

/// Apartments closest to `apartment_id`.
pub async fn similar_apartments(client: &GraphClient, config: &GdsConfig, apartment_id: &str) -> Result<Vec<SimilarPair>> {
    let query = Query::new(
        "MATCH (a1:Apartment {id: $id})
         MATCH (a2:Apartment)
         WHERE a2.id <> a1.id AND a1.sage_embeddings IS NOT NULL AND a2.sage_embeddings IS NOT NULL
         WITH a1, a2, gds.similarity.euclideanDistance(a1.sage_embeddings, a2.sage_embeddings) AS distance
         RETURN a1.id AS left, a2.id AS right, distance
         ORDER BY distance, right
         LIMIT $limit"
            .to_string(),
    )
    .param("id", apartment_id);

    similar_pairs(client, config, query).await
}

/// Closest owner pairs. Each unordered pair is reported once.
pub async fn similar_owners(client: &GraphClient, config: &GdsConfig) -> Result<Vec<SimilarPair>> {
    let query = Query::new(
        "MATCH (o1:Owner)
         MATCH (o2:Owner)
         WHERE o1.name < o2.name AND o1.sage_embeddings IS NOT NULL AND o2.sage_embeddings IS NOT NULL
         WITH o1, o2, gds.similarity.euclideanDistance(o1.sage_embeddings, o2.sage_embeddings) AS distance
         RETURN o1.name AS left, o2.name AS right, distance
         ORDER BY distance, left, right
         LIMIT $limit"
            .to_string(),
    );

    similar_pairs(client, config, query).await
}

/// Closest district pairs. Each unordered pair is reported once.
pub async fn similar_districts(client: &GraphClient, config: &GdsConfig) -> Result<Vec<SimilarPair>> {
    let query = Query::new(
        "MATCH (d1:District)
         MATCH (d2:District)
         WHERE d1.name < d2.name AND d1.sage_embeddings IS NOT NULL AND d2.sage_embeddings IS NOT NULL
         WITH d1, d2, gds.similarity.euclideanDistance(d1.sage_embeddings, d2.sage_embeddings) AS distance
         RETURN d1.name AS left, d2.name AS right, distance
         ORDER BY distance, left, right
         LIMIT $limit"
            .to_string(),
    );

    similar_pairs(client, config, query).await
}
