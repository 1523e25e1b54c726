//! End-to-end tests against a live Neo4j instance.
//!
//! These wipe the target database. Point `NEO4J_URI` (and optionally
//! `NEO4J_USER`, `NEO4J_PASSWORD`, `NEO4J_DATABASE`) at a scratch instance
//! and run with `cargo test -p estate-graph -- --ignored --test-threads=1`.

use neo4rs::Query;
use serde_json::json;

use estate_core::{RawListing, PRICE_RANGES, VIENNA_DISTRICTS};
use estate_graph::derive::{neighbors, price_ranges};
use estate_graph::queries::analytics;
use estate_graph::queries::triples::embedding_triples;
use estate_graph::{import_listings, schema, GraphClient, GraphConfig};

async fn fresh_graph() -> GraphClient {
    let defaults = GraphConfig::default();
    let config = GraphConfig {
        uri: std::env::var("NEO4J_URI").unwrap_or(defaults.uri),
        user: std::env::var("NEO4J_USER").unwrap_or(defaults.user),
        password: std::env::var("NEO4J_PASSWORD").unwrap_or(defaults.password),
        db: std::env::var("NEO4J_DATABASE").unwrap_or(defaults.db),
    };

    let client = GraphClient::connect(&config).await.expect("connect to Neo4j");
    client.clear().await.unwrap();
    schema::initialize_schema(&client).await.unwrap();
    schema::seed_districts(&client, &VIENNA_DISTRICTS).await.unwrap();
    client
}

fn listings(values: Vec<serde_json::Value>) -> Vec<RawListing> {
    values.into_iter().filter_map(RawListing::from_value).collect()
}

async fn count(client: &GraphClient, cypher: &str) -> i64 {
    client
        .query_scalar(Query::new(cypher.to_string()), "count")
        .await
        .unwrap()
        .unwrap_or(0)
}

fn apartment(id: &str, price: i64, postcode: i64) -> serde_json::Value {
    json!({
        "id": id,
        "price": price,
        "floor": 1,
        "number_of_rooms": 2,
        "estate_size": 55,
        "location_quality": 4,
        "postcode": postcode,
    })
}

#[tokio::test]
#[ignore = "requires a running Neo4j instance"]
async fn textual_price_creates_no_apartment() {
    let client = fresh_graph().await;
    let records = listings(vec![json!({
        "id": "A1", "price": "not-a-number", "floor": 2, "number_of_rooms": 3,
        "estate_size": 70, "location_quality": 4, "postcode": 1010,
    })]);

    let report = import_listings(&client, &records, |_| {}).await.unwrap();

    assert_eq!(report.imported, 0);
    assert_eq!(report.rejected.get("textual_price"), Some(&1));
    assert_eq!(count(&client, "MATCH (a:Apartment {id: 'A1'}) RETURN count(a) AS count").await, 0);
}

#[tokio::test]
#[ignore = "requires a running Neo4j instance"]
async fn valid_record_links_district_and_price_range() {
    let client = fresh_graph().await;
    let records = listings(vec![json!({
        "id": "A2", "price": 500000, "floor": 3, "number_of_rooms": 2,
        "estate_size": 60, "location_quality": 5, "postcode": 1010,
    })]);

    import_listings(&client, &records, |_| {}).await.unwrap();
    price_ranges::link_price_ranges(&client, &PRICE_RANGES).await.unwrap();

    let rows = client
        .query(Query::new(
            "MATCH (p:PriceRange)<-[:IN_PRICE_RANGE]-(a:Apartment {id: 'A2'})-[:LOCATED_IN]->(d:District)
             RETURN d.name AS district, p.name AS range"
                .to_string(),
        ))
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get::<String>("district").unwrap(), "Innere Stadt");
    assert_eq!(rows[0].get::<String>("range").unwrap(), "Medium");
}

#[tokio::test]
#[ignore = "requires a running Neo4j instance"]
async fn reimport_is_idempotent() {
    let client = fresh_graph().await;
    let first = listings(vec![json!({
        "id": "A5", "price": 300000, "floor": 1, "number_of_rooms": 2,
        "estate_size": 50, "location_quality": 3, "postcode": 1020, "orgname": "Immo GmbH",
    })]);
    let changed = listings(vec![json!({
        "id": "A5", "price": 999999, "floor": 1, "number_of_rooms": 2,
        "estate_size": 50, "location_quality": 3, "postcode": 1030, "orgname": "Other AG",
    })]);

    import_listings(&client, &first, |_| {}).await.unwrap();
    import_listings(&client, &first, |_| {}).await.unwrap();
    import_listings(&client, &changed, |_| {}).await.unwrap();

    assert_eq!(count(&client, "MATCH (a:Apartment) RETURN count(a) AS count").await, 1);
    assert_eq!(count(&client, "MATCH (:Apartment)-[r:LOCATED_IN]->() RETURN count(r) AS count").await, 1);
    assert_eq!(count(&client, "MATCH (:Apartment)-[r:OWNED_BY]->() RETURN count(r) AS count").await, 1);

    let price: Option<i64> = client
        .query_scalar(Query::new("MATCH (a:Apartment {id: 'A5'}) RETURN a.price AS price".to_string()), "price")
        .await
        .unwrap();
    assert_eq!(price, Some(300000));
}

#[tokio::test]
#[ignore = "requires a running Neo4j instance"]
async fn unknown_postcode_is_reported() {
    let client = fresh_graph().await;
    let mut record = apartment("A6", 250000, 4020);
    record["orgname"] = json!("Linz Wohnbau");
    let records = listings(vec![record]);

    let report = import_listings(&client, &records, |_| {}).await.unwrap();

    assert_eq!(report.missing_district, vec!["A6".to_string()]);
    assert_eq!(count(&client, "MATCH (a:Apartment) RETURN count(a) AS count").await, 0);
    assert_eq!(count(&client, "MATCH (o:Owner) RETURN count(o) AS count").await, 0);
}

#[tokio::test]
#[ignore = "requires a running Neo4j instance"]
async fn shared_coordinates_become_neighbors() {
    let client = fresh_graph().await;
    let mut a3 = apartment("A3", 200000, 1010);
    let mut a4 = apartment("A4", 210000, 1010);
    let mut a8 = apartment("A8", 220000, 1010);
    for (record, lon, lat) in [(&mut a3, 16.37, 48.21), (&mut a4, 16.37, 48.21), (&mut a8, 16.40, 48.20)] {
        record["lon"] = json!(lon);
        record["lat"] = json!(lat);
    }

    import_listings(&client, &listings(vec![a3, a4, a8]), |_| {}).await.unwrap();
    neighbors::link_neighbors(&client).await.unwrap();
    neighbors::link_neighbors(&client).await.unwrap();

    let rows = client
        .query(Query::new(
            "MATCH (a:Apartment)-[:NEIGHBOR_OF]->(b:Apartment)
             RETURN a.id AS from, b.id AS to ORDER BY from, to"
                .to_string(),
        ))
        .await
        .unwrap();
    let edges: Vec<(String, String)> = rows
        .iter()
        .map(|row| (row.get("from").unwrap(), row.get("to").unwrap()))
        .collect();

    assert_eq!(
        edges,
        vec![("A3".to_string(), "A4".to_string()), ("A4".to_string(), "A3".to_string())]
    );
}

#[tokio::test]
#[ignore = "requires a running Neo4j instance"]
async fn average_price_sorted_descending() {
    let client = fresh_graph().await;
    let records = listings(vec![
        apartment("B1", 100000, 1010),
        apartment("B2", 300000, 1010),
        apartment("B3", 150000, 1100),
    ]);
    import_listings(&client, &records, |_| {}).await.unwrap();

    let averages = analytics::average_price_per_district(&client).await.unwrap();

    assert_eq!(averages.len(), 2);
    assert_eq!(averages[0].district, "Innere Stadt");
    assert!((averages[0].average_price - 200000.0).abs() < f64::EPSILON);
    assert_eq!(averages[1].postal_code, 1100);
}

#[tokio::test]
#[ignore = "requires a running Neo4j instance"]
async fn expensive_apartments_exceed_three_times_average() {
    let client = fresh_graph().await;
    // Innere Stadt averages 200000: E5 at 600000 sits exactly on 3x, E6 above it.
    let mut records = Vec::new();
    for (id, price) in [("E1", 100000), ("E2", 100000), ("E3", 100000), ("E4", 100000), ("E5", 600000)] {
        records.push(apartment(id, price, 1010));
    }
    // Favoriten: 100000 x 9 and 2000000 average 290000, so 2000000 is an outlier.
    for i in 0..9 {
        records.push(apartment(&format!("F{}", i), 100000, 1100));
    }
    records.push(apartment("F9", 2_000_000, 1100));
    import_listings(&client, &listings(records), |_| {}).await.unwrap();

    let expensive = analytics::expensive_apartments(&client, analytics::OUTLIER_PRICE_FACTOR)
        .await
        .unwrap();

    let ids: Vec<&str> = expensive.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["F9"]);
    assert_eq!(expensive[0].district, "Favoriten");
    assert!((expensive[0].district_average_price - 290000.0).abs() < 1e-6);
}

#[tokio::test]
#[ignore = "requires a running Neo4j instance"]
async fn overcrowded_districts_below_room_threshold() {
    let client = fresh_graph().await;
    let with_rooms = |id: &str, postcode: i64, rooms: f64| {
        let mut record = apartment(id, 300000, postcode);
        record["number_of_rooms"] = json!(rooms);
        record
    };
    let records = listings(vec![
        // Innere Stadt averages exactly 2.3 rooms.
        with_rooms("G1", 1010, 2.3),
        with_rooms("G2", 1010, 2.3),
        // Leopoldstadt averages 2.0.
        with_rooms("G3", 1020, 1.0),
        with_rooms("G4", 1020, 3.0),
        // Hietzing averages 4.0.
        with_rooms("G5", 1130, 4.0),
    ]);
    import_listings(&client, &records, |_| {}).await.unwrap();

    let crowded = analytics::overcrowded_districts(&client, analytics::OVERCROWDING_ROOM_THRESHOLD)
        .await
        .unwrap();

    assert_eq!(crowded.len(), 1);
    assert_eq!(crowded[0].district, "Leopoldstadt");
    assert_eq!(crowded[0].postal_code, 1020);
    assert!((crowded[0].average_rooms - 2.0).abs() < 1e-9);
}

#[tokio::test]
#[ignore = "requires a running Neo4j instance"]
async fn top_owner_ties_break_by_name() {
    let client = fresh_graph().await;
    let mut records = Vec::new();
    for (id, owner) in [("C1", "Zeta Immobilien"), ("C2", "Zeta Immobilien"), ("C3", "Alpha Wohnen"), ("C4", "Alpha Wohnen")] {
        let mut record = apartment(id, 300000, 1070);
        record["orgname"] = json!(owner);
        records.push(record);
    }
    import_listings(&client, &listings(records), |_| {}).await.unwrap();

    let top = analytics::top_owner(&client).await.unwrap().unwrap();

    assert_eq!(top.owner, "Alpha Wohnen");
    assert_eq!(top.apartment_count, 2);
}

#[tokio::test]
#[ignore = "requires a running Neo4j instance"]
async fn triples_cover_embedding_relations() {
    let client = fresh_graph().await;
    let mut record = apartment("D1", 1_000_000, 1190);
    record["orgname"] = json!("Döbling Invest");
    import_listings(&client, &listings(vec![record]), |_| {}).await.unwrap();
    price_ranges::link_price_ranges(&client, &PRICE_RANGES).await.unwrap();

    let triples = embedding_triples(&client).await.unwrap();
    let rendered: Vec<(&str, &str)> = triples
        .iter()
        .map(|t| (t.predicate.as_str(), t.object.as_str()))
        .collect();

    assert_eq!(
        rendered,
        vec![("IN_PRICE_RANGE", "High"), ("LOCATED_IN", "1190"), ("OWNED_BY", "Döbling Invest")]
    );
}
