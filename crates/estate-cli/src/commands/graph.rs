//! Graph maintenance commands.

use anyhow::{Context as _, Result};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;

use super::Context;

#[derive(Subcommand)]
pub enum GraphCommands {
    /// Show node and relationship counts
    Status,

    /// Delete every node and relationship
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

pub async fn execute(cmd: GraphCommands, ctx: &Context) -> Result<()> {
    match cmd {
        GraphCommands::Status => cmd_status(ctx).await,
        GraphCommands::Clear { yes } => cmd_clear(ctx, yes).await,
    }
}

/// Show graph status (node/relationship counts).
async fn cmd_status(ctx: &Context) -> Result<()> {
    let client = ctx.graph().await?;
    let counts = client.get_counts().await?;

    println!("{} {}", "Knowledge Graph Status".bold(), format!("({})", ctx.config.graph.db).dimmed());
    println!("{}", "─".repeat(40));
    println!("  Nodes:         {}", counts.nodes.to_string().cyan());
    for (label, count) in &counts.by_label {
        println!("    {:<20} {}", label, count);
    }
    println!("  Relationships: {}", counts.relationships.to_string().cyan());
    for (rel_type, count) in &counts.by_relationship {
        println!("    {:<20} {}", rel_type, count);
    }
    println!("{}", "─".repeat(40));

    Ok(())
}

async fn cmd_clear(ctx: &Context, yes: bool) -> Result<()> {
    let graph = &ctx.config.graph;
    if !yes {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete all data in database '{}' at {}?", graph.db, graph.uri))
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;
        if !confirmed {
            println!("{}", "Aborted.".dimmed());
            return Ok(());
        }
    }

    let client = ctx.graph().await?;
    client.clear().await?;
    println!("  {} Graph cleared", "✓".green());

    Ok(())
}
