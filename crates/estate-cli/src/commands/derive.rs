//! Derive commands - addresses, neighbors and price ranges.

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use estate_core::PRICE_RANGES;
use estate_graph::derive::{self, addresses, neighbors, price_ranges};
use estate_graph::{DeriveResult, NominatimClient};

use super::Context;

#[derive(Subcommand)]
pub enum DeriveCommands {
    /// Reverse-geocode coordinates into Address nodes
    Addresses,

    /// Link apartments sharing coordinates with NEIGHBOR_OF
    Neighbors,

    /// Link apartments to their PriceRange
    PriceRanges,

    /// Run every derivation pass
    All,
}

pub async fn execute(cmd: DeriveCommands, ctx: &Context) -> Result<()> {
    let client = ctx.graph().await?;
    let policy = ctx.config.geocoder.retry_policy();

    let (title, result) = match cmd {
        DeriveCommands::Addresses => {
            let geocoder = NominatimClient::new(&ctx.config.geocoder)?;
            ("Addresses", addresses::resolve_addresses(&client, &geocoder, &policy).await?)
        }
        DeriveCommands::Neighbors => ("Neighbors", neighbors::link_neighbors(&client).await?),
        DeriveCommands::PriceRanges => ("Price ranges", price_ranges::link_price_ranges(&client, &PRICE_RANGES).await?),
        DeriveCommands::All => {
            let geocoder = NominatimClient::new(&ctx.config.geocoder)?;
            ("All passes", derive::run_all(&client, &PRICE_RANGES, &geocoder, &policy).await?)
        }
    };

    print_result(title, &result);
    Ok(())
}

fn print_result(title: &str, result: &DeriveResult) {
    println!("{} {}", title.bold(), "derived:".green().bold());
    println!("  Nodes merged:         {}", result.nodes_merged.to_string().cyan());
    println!("  Relationships merged: {}", result.relationships_merged.to_string().cyan());
    if result.skipped > 0 {
        println!("  Skipped:              {}", result.skipped.to_string().yellow());
    }
}
