//! Price bucketing.

use std::collections::HashMap;

use anyhow::Result;
use neo4rs::{BoltType, Query};
use tracing::warn;

use estate_core::reference::is_partition;
use estate_core::PriceRange;
use super::DeriveResult;
use crate::GraphClient;

fn range_param(ranges: &[PriceRange]) -> Vec<HashMap<String, BoltType>> {
    ranges
        .iter()
        .map(|range| {
            let mut m: HashMap<String, BoltType> = HashMap::new();
            m.insert("name".to_string(), range.name.into());
            m.insert("min_price".to_string(), range.min_price.into());
            m.insert("max_price".to_string(), range.max_price.into());
            m
        })
        .collect()
}

/// Merge the price-range nodes and link every apartment whose price lies
/// within a range's stored bounds.
pub async fn link_price_ranges(client: &GraphClient, ranges: &[PriceRange]) -> Result<DeriveResult> {
    if !is_partition(ranges) {
        warn!(ranges = ranges.len(), "Price ranges overlap or leave gaps; apartments may get zero or several ranges");
    }

    let query = Query::new(
        "UNWIND $ranges AS bucket
         MERGE (p:PriceRange {name: bucket.name})
         ON CREATE SET p.min_price = bucket.min_price, p.max_price = bucket.max_price
         WITH p
         OPTIONAL MATCH (a:Apartment)
         WHERE a.price >= p.min_price AND a.price <= p.max_price
         FOREACH (apartment IN CASE WHEN a IS NULL THEN [] ELSE [a] END |
             MERGE (apartment)-[:IN_PRICE_RANGE]->(p))
         RETURN count(a) AS linked"
            .to_string(),
    )
    .param("ranges", range_param(ranges));

    let linked: i64 = client.query_scalar(query, "linked").await?.unwrap_or(0);

    Ok(DeriveResult {
        nodes_merged: ranges.len(),
        relationships_merged: linked as usize,
        skipped: 0,
    })
}
