//! Apartment import.
//!
//! Validates listing records and writes them as apartment nodes:
//! - (:Apartment)-[:LOCATED_IN]->(:District)
//! - (:Apartment)-[:OWNED_BY]->(:Owner)
//!
//! Apartments are merged on `id` with `ON CREATE SET`, so re-importing a
//! record never changes stored fields. The first district and owner linked
//! to an apartment stay its only ones.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use neo4rs::{BoltNull, BoltType, Query};
use serde::Serialize;
use tracing::{debug, info, warn};

use estate_core::listing::validate::validate;
use estate_core::{ApartmentFact, EstateError, RawListing, RejectReason};
use crate::GraphClient;

const MERGE_APARTMENT: &str = "
    MATCH (d:District {postal_code: $postal_code})
    MERGE (a:Apartment {id: $id})
    ON CREATE SET a.price = $price, a.floor = $floor, a.lon = $lon, a.lat = $lat,
                  a.quality = $quality, a.size = $size, a.number_of_rooms = $number_of_rooms
    FOREACH (i IN CASE WHEN size([(a)-[:LOCATED_IN]->(x:District) WHERE x <> d | x]) = 0 THEN [1] ELSE [] END |
        MERGE (a)-[:LOCATED_IN]->(d))
    RETURN a.id AS id";

const MERGE_OWNED_APARTMENT: &str = "
    MATCH (d:District {postal_code: $postal_code})
    MERGE (o:Owner {name: $owner})
    MERGE (a:Apartment {id: $id})
    ON CREATE SET a.price = $price, a.floor = $floor, a.lon = $lon, a.lat = $lat,
                  a.quality = $quality, a.size = $size, a.number_of_rooms = $number_of_rooms
    FOREACH (i IN CASE WHEN size([(a)-[:LOCATED_IN]->(x:District) WHERE x <> d | x]) = 0 THEN [1] ELSE [] END |
        MERGE (a)-[:LOCATED_IN]->(d))
    FOREACH (i IN CASE WHEN size([(a)-[:OWNED_BY]->(x:Owner) WHERE x <> o | x]) = 0 THEN [1] ELSE [] END |
        MERGE (a)-[:OWNED_BY]->(o))
    RETURN a.id AS id";

/// What happened to one listing record.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportOutcome {
    Imported { id: String },
    Rejected(RejectReason),
    MissingDistrict { id: String, postal_code: Option<i64> },
}

/// Totals for an import run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub rejected: BTreeMap<String, usize>,
    pub missing_district: Vec<String>,
}

impl ImportReport {
    pub fn record(&mut self, outcome: &ImportOutcome) {
        match outcome {
            ImportOutcome::Imported { .. } => self.imported += 1,
            ImportOutcome::Rejected(reason) => {
                *self.rejected.entry(reason.as_str().to_string()).or_default() += 1;
            }
            ImportOutcome::MissingDistrict { id, .. } => self.missing_district.push(id.clone()),
        }
    }

    pub fn rejected_total(&self) -> usize {
        self.rejected.values().sum()
    }
}

fn optional_float(value: Option<f64>) -> BoltType {
    match value {
        Some(v) => v.into(),
        None => BoltType::Null(BoltNull),
    }
}

/// Build the apartment upsert statement for a validated fact.
fn apartment_query(fact: &ApartmentFact, postal_code: i64) -> Query {
    let cypher = if fact.owner.is_some() { MERGE_OWNED_APARTMENT } else { MERGE_APARTMENT };

    let mut query = Query::new(cypher.to_string())
        .param("postal_code", postal_code)
        .param("id", fact.id.as_str())
        .param("price", fact.price)
        .param("floor", fact.floor)
        .param("lon", optional_float(fact.lon))
        .param("lat", optional_float(fact.lat))
        .param("quality", fact.quality)
        .param("size", fact.size)
        .param("number_of_rooms", fact.number_of_rooms);

    if let Some(owner) = &fact.owner {
        query = query.param("owner", owner.as_str());
    }
    query
}

/// Write one validated apartment. The owner is merged only once its district
/// has matched, so an unknown postcode writes nothing.
pub async fn import_apartment(client: &GraphClient, fact: &ApartmentFact) -> Result<ImportOutcome> {
    let Some(postal_code) = fact.postal_code else {
        let err = EstateError::MissingReference { entity: "District", key: "<none>".to_string() };
        debug!(apartment_id = %fact.id, error = %err, "Apartment has no postcode");
        return Ok(ImportOutcome::MissingDistrict { id: fact.id.clone(), postal_code: None });
    };

    let rows = client
        .query(apartment_query(fact, postal_code))
        .await
        .with_context(|| format!("Failed to import apartment {}", fact.id))?;

    if rows.is_empty() {
        let err = EstateError::MissingReference { entity: "District", key: postal_code.to_string() };
        warn!(apartment_id = %fact.id, error = %err, "Apartment not imported");
        return Ok(ImportOutcome::MissingDistrict { id: fact.id.clone(), postal_code: Some(postal_code) });
    }

    debug!(apartment_id = %fact.id, postal_code, owner = ?fact.owner, "Imported apartment");
    Ok(ImportOutcome::Imported { id: fact.id.clone() })
}

/// Validate and import one raw listing. Invalid records are skipped without
/// touching the graph.
pub async fn import_listing(client: &GraphClient, listing: &RawListing) -> Result<ImportOutcome> {
    match validate(listing) {
        Ok(fact) => import_apartment(client, &fact).await,
        Err(reason) => {
            debug!(reason = %reason, id = ?listing.id, "Skipping listing");
            Ok(ImportOutcome::Rejected(reason))
        }
    }
}

/// Import a batch of listings, calling `on_record` after each one.
pub async fn import_listings<F>(client: &GraphClient, listings: &[RawListing], mut on_record: F) -> Result<ImportReport>
where
    F: FnMut(&ImportOutcome),
{
    info!(listings = listings.len(), "Starting apartment import");

    let mut report = ImportReport::default();
    for listing in listings {
        let outcome = import_listing(client, listing).await?;
        report.record(&outcome);
        on_record(&outcome);
    }

    info!(
        imported = report.imported,
        rejected = report.rejected_total(),
        missing_district = report.missing_district.len(),
        "Apartment import complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counts_by_reason() {
        let mut report = ImportReport::default();
        report.record(&ImportOutcome::Imported { id: "A2".into() });
        report.record(&ImportOutcome::Rejected(RejectReason::TextualPrice));
        report.record(&ImportOutcome::Rejected(RejectReason::TextualPrice));
        report.record(&ImportOutcome::Rejected(RejectReason::MissingFloor));
        report.record(&ImportOutcome::MissingDistrict { id: "A7".into(), postal_code: Some(4020) });

        assert_eq!(report.imported, 1);
        assert_eq!(report.rejected_total(), 3);
        assert_eq!(report.rejected.get("textual_price"), Some(&2));
        assert_eq!(report.missing_district, vec!["A7".to_string()]);
    }

    #[test]
    fn test_owned_statement_links_owner() {
        assert!(MERGE_OWNED_APARTMENT.contains("MERGE (a)-[:OWNED_BY]->(o)"));
        let district = MERGE_OWNED_APARTMENT.find("MATCH (d:District").unwrap();
        let owner = MERGE_OWNED_APARTMENT.find("MERGE (o:Owner").unwrap();
        assert!(district < owner, "owner must not be merged before the district matches");
        assert!(!MERGE_APARTMENT.contains("OWNED_BY"));
        for cypher in [MERGE_APARTMENT, MERGE_OWNED_APARTMENT] {
            assert!(cypher.contains("ON CREATE SET"));
            assert!(!cypher.contains("USE "));
        }
    }
}
