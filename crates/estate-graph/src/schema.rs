//! Neo4j schema initialization (constraints) and reference data seeding.

use anyhow::{Context, Result};
use neo4rs::Query;
use tracing::info;

use estate_core::District;
use crate::GraphClient;

/// Cypher statements for schema initialization.
const SCHEMA_STATEMENTS: &[&str] = &[
    "CREATE CONSTRAINT apartment_id IF NOT EXISTS FOR (a:Apartment) REQUIRE a.id IS UNIQUE",
    "CREATE CONSTRAINT district_postal_code IF NOT EXISTS FOR (d:District) REQUIRE d.postal_code IS UNIQUE",
    "CREATE CONSTRAINT owner_name IF NOT EXISTS FOR (o:Owner) REQUIRE o.name IS UNIQUE",
    "CREATE CONSTRAINT address_name IF NOT EXISTS FOR (ad:Address) REQUIRE ad.name IS UNIQUE",
    "CREATE CONSTRAINT price_range_name IF NOT EXISTS FOR (p:PriceRange) REQUIRE p.name IS UNIQUE",
];

/// Initialize Neo4j schema with uniqueness constraints.
///
/// Safe to run multiple times - uses IF NOT EXISTS clauses.
pub async fn initialize_schema(client: &GraphClient) -> Result<()> {
    info!("Initializing Neo4j schema...");

    for statement in SCHEMA_STATEMENTS {
        client.execute(Query::new(statement.to_string())).await?;
    }

    info!("Neo4j schema initialized ({} statements)", SCHEMA_STATEMENTS.len());
    Ok(())
}

/// Merge the reference districts in one transaction. Existing districts keep
/// their name.
pub async fn seed_districts(client: &GraphClient, districts: &[District]) -> Result<usize> {
    let statements = districts
        .iter()
        .map(|district| {
            Query::new(
                "MERGE (d:District {postal_code: $postal_code})
                 ON CREATE SET d.name = $name"
                    .to_string(),
            )
            .param("postal_code", district.postal_code)
            .param("name", district.name)
        })
        .collect();

    client.execute_in_transaction(statements).await
        .context("Failed to seed districts")?;

    info!(districts = districts.len(), "Districts seeded");
    Ok(districts.len())
}
