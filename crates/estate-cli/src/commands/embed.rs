//! Knowledge-graph embedding commands.

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use estate_graph::queries::triples::{embedding_triples, write_tsv};
use estate_graph::EmbeddingRelation;
use estate_ml::{ApartmentEmbedding, KgeServiceClient, TrainedEmbedding};

use super::Context;

const DEFAULT_REPORT_FILE: &str = "embedding_model.json";

#[derive(Subcommand)]
pub enum EmbedCommands {
    /// Write the embedding triples to a TSV file
    Export {
        #[arg(short, long, default_value = "triples.tsv")]
        output: PathBuf,
    },

    /// Train an embedding model on the graph triples
    Train {
        /// Where to store the model id and per-epoch losses
        #[arg(short, long, default_value = DEFAULT_REPORT_FILE)]
        report: PathBuf,
    },

    /// Rank tails for a head entity and relation
    Predict {
        /// Head entity (apartment id)
        head: String,

        /// Relation: LOCATED_IN, IN_PRICE_RANGE or OWNED_BY
        relation: String,

        /// Training report written by `estate embed train`
        #[arg(short, long, default_value = DEFAULT_REPORT_FILE)]
        report: PathBuf,

        /// Number of predictions to show
        #[arg(long, default_value = "10")]
        limit: usize,
    },
}

pub async fn execute(cmd: EmbedCommands, ctx: &Context) -> Result<()> {
    match cmd {
        EmbedCommands::Export { output } => {
            let client = ctx.graph().await?;
            let triples = embedding_triples(&client).await?;
            write_tsv(&triples, &output)?;
            println!("{} {} triples to {}", "✓".green(), triples.len(), output.display());
        }
        EmbedCommands::Train { report } => {
            let client = ctx.graph().await?;
            let adapter = ApartmentEmbedding::new(KgeServiceClient::new(&ctx.config.embedding)?, &ctx.config.embedding);

            let trained = adapter.train(&client).await?;
            trained.write_report(&report)?;

            println!("{}", "Embedding model trained:".green().bold());
            println!("  Model:   {}", trained.model_id.cyan());
            println!("  Epochs:  {}", trained.losses.len());
            if let (Some(first), Some(last)) = (trained.losses.first(), trained.losses.last()) {
                println!("  Loss:    {:.4} → {:.4}", first, last);
            }
            println!("  Report:  {}", report.display());
        }
        EmbedCommands::Predict { head, relation, report, limit } => {
            let relation = EmbeddingRelation::from_str(&relation)?;
            let model = TrainedEmbedding::read_report(&report)?;
            let adapter = ApartmentEmbedding::new(KgeServiceClient::new(&ctx.config.embedding)?, &ctx.config.embedding);

            let predictions = adapter.predict(&model, &head, relation).await?;
            if predictions.is_empty() {
                println!("{}", "No predictions.".dimmed());
                return Ok(());
            }

            println!("{} {} {}", head.cyan(), relation.as_str().yellow(), "→".dimmed());
            for (i, prediction) in predictions.iter().take(limit).enumerate() {
                println!("  {:>2}. {:<30} {:.4}", i + 1, prediction.tail, prediction.score);
            }
        }
    }

    Ok(())
}
