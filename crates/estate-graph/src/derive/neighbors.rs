//! Neighbor linking between apartments at identical coordinates.

use std::collections::HashMap;

use anyhow::Result;
use neo4rs::{BoltType, Query};
use tracing::debug;

use estate_core::neighbors::{group_by_coordinates, neighbor_pairs};
use super::{located_apartments, DeriveResult};
use crate::GraphClient;

const PAIR_BATCH_SIZE: usize = 1000;

/// Link every pair of distinct apartments sharing `(lon, lat)` with a
/// `NEIGHBOR_OF` edge in each direction.
pub async fn link_neighbors(client: &GraphClient) -> Result<DeriveResult> {
    let located = located_apartments(client).await?;
    let groups = group_by_coordinates(&located);
    let pairs = neighbor_pairs(&groups);

    debug!(apartments = located.len(), groups = groups.len(), pairs = pairs.len(), "Planned neighbor links");

    let mut result = DeriveResult::default();
    for chunk in pairs.chunks(PAIR_BATCH_SIZE) {
        let batch: Vec<HashMap<String, BoltType>> = chunk
            .iter()
            .map(|(from, to)| {
                let mut m: HashMap<String, BoltType> = HashMap::new();
                m.insert("from".to_string(), from.clone().into());
                m.insert("to".to_string(), to.clone().into());
                m
            })
            .collect();

        let query = Query::new(
            "UNWIND $pairs AS pair
             MATCH (a1:Apartment {id: pair.from}), (a2:Apartment {id: pair.to})
             MERGE (a1)-[:NEIGHBOR_OF]->(a2)"
                .to_string(),
        )
        .param("pairs", batch);

        client.execute(query).await?;
        result.relationships_merged += chunk.len();
    }

    Ok(result)
}
