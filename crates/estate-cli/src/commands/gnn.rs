//! Graph Data Science commands.

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use estate_ml::gds::regression::error_summary;
use estate_ml::gds::similarity::{self, SimilarPair};
use estate_ml::{GraphLearner, GraphSage, NodeRegression};

use super::Context;

#[derive(Subcommand)]
pub enum GnnCommands {
    /// Train the price regression pipeline and compare predictions
    Regression {
        /// Number of prediction rows to show
        #[arg(long, default_value = "10")]
        rows: usize,
    },

    /// Train GraphSAGE and write node embeddings
    Sage {
        /// Write epoch losses to this JSON file
        #[arg(long)]
        losses: Option<PathBuf>,
    },

    /// Nearest neighbors over GraphSAGE embeddings
    Similar {
        #[command(subcommand)]
        target: SimilarTarget,
    },
}

#[derive(Subcommand)]
pub enum SimilarTarget {
    /// Apartments closest to one apartment
    Apartments { id: String },
    /// Closest owner pairs
    Owners,
    /// Closest district pairs
    Districts,
}

pub async fn execute(cmd: GnnCommands, ctx: &Context) -> Result<()> {
    let client = ctx.graph().await?;
    let gds = ctx.config.gds.clone();

    match cmd {
        GnnCommands::Regression { rows } => {
            let learner = NodeRegression::new(gds);
            let report = learner.train(&client).await?;

            println!("{}", "Regression model trained:".green().bold());
            println!(
                "  Projected:  {} nodes, {} relationships",
                report.projection.node_count, report.projection.relationship_count
            );
            println!("  Parameters: {}", report.best_parameters.join(", ").dimmed());
            println!("  MSE  (test): {:.2}", report.mse);
            println!("  MAE  (test): {:.2}", report.mae);
            println!("  RMSE (test): {:.2}", report.rmse);

            let predictions = learner.stream(&client).await?;
            if let Some(summary) = error_summary(&predictions) {
                println!(
                    "  All apartments ({}): MAE {:.2}, RMSE {:.2}",
                    summary.count, summary.mae, summary.rmse
                );
            }

            println!("\n{:<16} {:>14} {:>14}", "Apartment", "Actual", "Predicted");
            println!("{}", "─".repeat(46));
            let skip = predictions.len().saturating_sub(rows);
            for p in predictions.iter().skip(skip) {
                let actual = p.actual.map(|a| a.to_string()).unwrap_or_else(|| "-".into());
                println!("{:<16} {:>14} {:>14.0}", p.id, actual, p.predicted);
            }
        }
        GnnCommands::Sage { losses } => {
            let report = GraphSage::new(gds).train(&client).await?;

            println!("{}", "GraphSAGE model trained:".green().bold());
            println!("  Epochs:     {}", report.epoch_losses.len());
            println!("  Converged:  {}", report.did_converge);
            println!("  Written:    {} node properties", report.properties_written.to_string().cyan());

            if let Some(path) = losses {
                std::fs::write(&path, serde_json::to_string_pretty(&report.epoch_losses)?)?;
                println!("  Losses:     {}", path.display());
            }
        }
        GnnCommands::Similar { target } => {
            let pairs = match target {
                SimilarTarget::Apartments { id } => similarity::similar_apartments(&client, &gds, &id).await?,
                SimilarTarget::Owners => similarity::similar_owners(&client, &gds).await?,
                SimilarTarget::Districts => similarity::similar_districts(&client, &gds).await?,
            };
            print_pairs(&pairs);
        }
    }

    Ok(())
}

fn print_pairs(pairs: &[SimilarPair]) {
    if pairs.is_empty() {
        println!("{}", "No embeddings found. Run `estate gnn sage` first.".dimmed());
        return;
    }

    for pair in pairs {
        println!("  {:<30} {:<30} {:.4}", pair.left, pair.right.cyan(), pair.distance);
    }
}
