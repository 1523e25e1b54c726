//! Derivation passes over the imported apartments.
//!
//! Each pass is independent and idempotent:
//! - addresses: (:Apartment)-[:LOCATED_AT_ADDRESS]->(:Address)
//! - neighbors: (:Apartment)-[:NEIGHBOR_OF]->(:Apartment)
//! - price ranges: (:Apartment)-[:IN_PRICE_RANGE]->(:PriceRange)

pub mod addresses;
pub mod neighbors;
pub mod price_ranges;

use anyhow::{Context, Result};
use neo4rs::Query;
use serde::Serialize;
use tracing::info;

use estate_core::neighbors::Located;
use estate_core::PriceRange;
use crate::geocode::{ReverseGeocoder, RetryPolicy};
use crate::GraphClient;

/// Result of a derivation pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeriveResult {
    pub nodes_merged: usize,
    pub relationships_merged: usize,
    pub skipped: usize,
}

impl DeriveResult {
    fn merge(&mut self, other: &DeriveResult) {
        self.nodes_merged += other.nodes_merged;
        self.relationships_merged += other.relationships_merged;
        self.skipped += other.skipped;
    }
}

/// Fetch every apartment that has both coordinates.
pub(crate) async fn located_apartments(client: &GraphClient) -> Result<Vec<Located>> {
    let query = Query::new(
        "MATCH (a:Apartment)
         WHERE a.lon IS NOT NULL AND a.lat IS NOT NULL
         RETURN a.id AS id, a.lon AS lon, a.lat AS lat"
            .to_string(),
    );

    let rows = client.query(query).await.context("Failed to load apartment coordinates")?;
    let mut located = Vec::with_capacity(rows.len());
    for row in rows {
        let id: String = row.get("id").context("Apartment row without id")?;
        let lon: f64 = row.get("lon").context("Apartment row without lon")?;
        let lat: f64 = row.get("lat").context("Apartment row without lat")?;
        located.push(Located { id, lon, lat });
    }
    Ok(located)
}

/// Run the neighbor, price-range and address passes in sequence.
pub async fn run_all(
    client: &GraphClient,
    ranges: &[PriceRange],
    geocoder: &dyn ReverseGeocoder,
    policy: &RetryPolicy,
) -> Result<DeriveResult> {
    let mut total = DeriveResult::default();

    let neighbor_result = neighbors::link_neighbors(client).await
        .context("Failed to link neighbors")?;
    info!(rels = neighbor_result.relationships_merged, "Neighbors linked");
    total.merge(&neighbor_result);

    let range_result = price_ranges::link_price_ranges(client, ranges).await
        .context("Failed to link price ranges")?;
    info!(rels = range_result.relationships_merged, "Price ranges linked");
    total.merge(&range_result);

    let address_result = addresses::resolve_addresses(client, geocoder, policy).await
        .context("Failed to resolve addresses")?;
    info!(
        nodes = address_result.nodes_merged,
        rels = address_result.relationships_merged,
        skipped = address_result.skipped,
        "Addresses resolved"
    );
    total.merge(&address_result);

    Ok(total)
}
