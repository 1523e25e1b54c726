//! Read-only aggregation queries over apartments and districts.

use anyhow::Result;
use neo4rs::Query;
use serde::Serialize;

use crate::GraphClient;

/// Apartments priced above this multiple of their district average are outliers.
pub const OUTLIER_PRICE_FACTOR: f64 = 3.0;

/// Districts whose apartments average fewer rooms than this are overcrowded.
pub const OVERCROWDING_ROOM_THRESHOLD: f64 = 2.3;

/// Average apartment price of a district.
#[derive(Debug, Clone, Serialize)]
pub struct DistrictAverage {
    pub district: String,
    pub postal_code: i64,
    pub average_price: f64,
}

/// Number of apartments in a district.
#[derive(Debug, Clone, Serialize)]
pub struct DistrictCount {
    pub district: String,
    pub postal_code: i64,
    pub apartment_count: i64,
}

/// An apartment priced far above its district average.
#[derive(Debug, Clone, Serialize)]
pub struct ExpensiveApartment {
    pub id: String,
    pub district: String,
    pub price: i64,
    pub district_average_price: f64,
}

/// Average room count of a district.
#[derive(Debug, Clone, Serialize)]
pub struct DistrictRooms {
    pub district: String,
    pub postal_code: i64,
    pub average_rooms: f64,
}

/// Apartment count of an owner.
#[derive(Debug, Clone, Serialize)]
pub struct OwnerCount {
    pub owner: String,
    pub apartment_count: i64,
}

/// Average price per district, highest first.
pub async fn average_price_per_district(client: &GraphClient) -> Result<Vec<DistrictAverage>> {
    let query = Query::new(
        "MATCH (a:Apartment)-[:LOCATED_IN]->(d:District)
         WHERE a.price IS NOT NULL
         RETURN d.name AS district, d.postal_code AS postal_code, avg(a.price) AS average_price
         ORDER BY average_price DESC, district"
            .to_string(),
    );

    let rows = client.query(query).await?;
    Ok(rows
        .into_iter()
        .map(|row| DistrictAverage {
            district: row.get("district").unwrap_or_default(),
            postal_code: row.get("postal_code").unwrap_or_default(),
            average_price: row.get("average_price").unwrap_or(0.0),
        })
        .collect())
}

/// Districts ranked by number of apartments, most first.
pub async fn districts_by_apartment_count(client: &GraphClient) -> Result<Vec<DistrictCount>> {
    let query = Query::new(
        "MATCH (a:Apartment)-[:LOCATED_IN]->(d:District)
         RETURN d.name AS district, d.postal_code AS postal_code, count(a) AS apartment_count
         ORDER BY apartment_count DESC, district"
            .to_string(),
    );

    let rows = client.query(query).await?;
    Ok(rows
        .into_iter()
        .map(|row| DistrictCount {
            district: row.get("district").unwrap_or_default(),
            postal_code: row.get("postal_code").unwrap_or_default(),
            apartment_count: row.get("apartment_count").unwrap_or(0),
        })
        .collect())
}

/// Apartments priced more than `factor` times their district's average.
pub async fn expensive_apartments(client: &GraphClient, factor: f64) -> Result<Vec<ExpensiveApartment>> {
    let query = Query::new(
        "MATCH (a:Apartment)-[:LOCATED_IN]->(d:District)
         WHERE a.price IS NOT NULL
         WITH d, avg(a.price) AS district_average_price
         MATCH (a:Apartment)-[:LOCATED_IN]->(d)
         WHERE a.price > district_average_price * $factor
         RETURN a.id AS id, d.name AS district, a.price AS price, district_average_price
         ORDER BY price DESC, id"
            .to_string(),
    )
    .param("factor", factor);

    let rows = client.query(query).await?;
    Ok(rows
        .into_iter()
        .map(|row| ExpensiveApartment {
            id: row.get("id").unwrap_or_default(),
            district: row.get("district").unwrap_or_default(),
            price: row.get("price").unwrap_or(0),
            district_average_price: row.get("district_average_price").unwrap_or(0.0),
        })
        .collect())
}

/// Districts whose average room count is below `threshold`, most crowded first.
pub async fn overcrowded_districts(client: &GraphClient, threshold: f64) -> Result<Vec<DistrictRooms>> {
    let query = Query::new(
        "MATCH (a:Apartment)-[:LOCATED_IN]->(d:District)
         WHERE a.number_of_rooms IS NOT NULL
         WITH d, avg(a.number_of_rooms) AS average_rooms
         WHERE average_rooms < $threshold
         RETURN d.name AS district, d.postal_code AS postal_code, average_rooms
         ORDER BY average_rooms, district"
            .to_string(),
    )
    .param("threshold", threshold);

    let rows = client.query(query).await?;
    Ok(rows
        .into_iter()
        .map(|row| DistrictRooms {
            district: row.get("district").unwrap_or_default(),
            postal_code: row.get("postal_code").unwrap_or_default(),
            average_rooms: row.get("average_rooms").unwrap_or(0.0),
        })
        .collect())
}

/// The owner with the most apartments. Ties go to the alphabetically first
/// owner name.
pub async fn top_owner(client: &GraphClient) -> Result<Option<OwnerCount>> {
    let query = Query::new(
        "MATCH (o:Owner)<-[:OWNED_BY]-(a:Apartment)
         WITH o, count(a) AS apartment_count
         RETURN o.name AS owner, apartment_count
         ORDER BY apartment_count DESC, owner ASC
         LIMIT 1"
            .to_string(),
    );

    let rows = client.query(query).await?;
    Ok(rows.into_iter().next().map(|row| OwnerCount {
        owner: row.get("owner").unwrap_or_default(),
        apartment_count: row.get("apartment_count").unwrap_or(0),
    }))
}
