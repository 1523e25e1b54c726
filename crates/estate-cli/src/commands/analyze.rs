//! Analysis commands over the apartment graph.

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use estate_graph::queries::analytics::{self, OUTLIER_PRICE_FACTOR, OVERCROWDING_ROOM_THRESHOLD};

use super::Context;
use crate::output;

#[derive(Subcommand)]
pub enum AnalyzeCommands {
    /// Average apartment price per district
    AvgPrice,

    /// Districts ranked by number of apartments
    DistrictCount,

    /// Apartments priced far above their district average
    Expensive {
        /// Multiple of the district average that counts as expensive
        #[arg(long, default_value_t = OUTLIER_PRICE_FACTOR)]
        factor: f64,
    },

    /// Districts with a low average room count
    Overcrowded {
        /// Average room count below which a district is overcrowded
        #[arg(long, default_value_t = OVERCROWDING_ROOM_THRESHOLD)]
        threshold: f64,
    },

    /// Owner with the most apartments
    TopOwner,
}

pub async fn execute(cmd: AnalyzeCommands, ctx: &Context) -> Result<()> {
    let client = ctx.graph().await?;

    match cmd {
        AnalyzeCommands::AvgPrice => {
            let rows = analytics::average_price_per_district(&client).await?;
            output::print_district_averages(&rows);
        }
        AnalyzeCommands::DistrictCount => {
            let rows = analytics::districts_by_apartment_count(&client).await?;
            output::print_district_counts(&rows);
        }
        AnalyzeCommands::Expensive { factor } => {
            let rows = analytics::expensive_apartments(&client, factor).await?;
            output::print_expensive_apartments(&rows, factor);
        }
        AnalyzeCommands::Overcrowded { threshold } => {
            let rows = analytics::overcrowded_districts(&client, threshold).await?;
            output::print_overcrowded_districts(&rows, threshold);
        }
        AnalyzeCommands::TopOwner => match analytics::top_owner(&client).await? {
            Some(top) => println!(
                "{} {} ({} apartments)",
                "Top owner:".bold(),
                top.owner.cyan(),
                top.apartment_count
            ),
            None => println!("{}", "No owned apartments found.".dimmed()),
        },
    }

    Ok(())
}
