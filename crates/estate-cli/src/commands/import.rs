//! Import command - load listing records into Neo4j.

use anyhow::{Context as _, Result};
use clap::Args;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

use estate_core::listing::extract::DEFAULT_OUTPUT_FILE;
use estate_core::listing::load_listings;
use estate_core::VIENNA_DISTRICTS;
use estate_graph::loader::ImportOutcome;
use estate_graph::{import_listings, schema};

use super::Context;

#[derive(Args)]
pub struct ImportArgs {
    /// Listing records produced by `estate extract`
    #[arg(default_value = DEFAULT_OUTPUT_FILE)]
    pub input: PathBuf,

    /// Hide the progress bar
    #[arg(long)]
    pub quiet: bool,
}

pub async fn execute(args: ImportArgs, ctx: &Context) -> Result<()> {
    let listings = load_listings(&args.input)
        .with_context(|| format!("Failed to load listings from {}", args.input.display()))?;

    let client = ctx.graph().await?;
    schema::initialize_schema(&client).await?;
    let seeded = schema::seed_districts(&client, &VIENNA_DISTRICTS).await?;
    println!("  {} {} districts ready", "✓".green(), seeded);

    let pb = if args.quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(listings.len() as u64)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let report = import_listings(&client, &listings, |outcome| {
        if let ImportOutcome::Imported { id } = outcome {
            pb.set_message(id.clone());
        }
        pb.inc(1);
    })
    .await?;
    pb.finish_and_clear();

    println!("\n{}", "Import complete:".green().bold());
    println!("  Imported:          {}", report.imported.to_string().cyan());
    println!("  Rejected:          {}", report.rejected_total().to_string().yellow());
    for (reason, count) in &report.rejected {
        println!("    {} {:<28} {}", "•".dimmed(), reason, count);
    }
    println!("  Unknown district:  {}", report.missing_district.len().to_string().yellow());
    if !report.missing_district.is_empty() {
        let sample: Vec<&str> = report.missing_district.iter().take(10).map(String::as_str).collect();
        println!("    {}", sample.join(", ").dimmed());
    }

    Ok(())
}
