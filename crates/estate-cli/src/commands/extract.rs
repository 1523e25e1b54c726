//! Extract command - turn crawler dumps into loader input.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use estate_core::listing::extract::{extract_files, DEFAULT_OUTPUT_FILE};

#[derive(Args)]
pub struct ExtractArgs {
    /// Crawler dump files (JSON arrays of adverts)
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output file for the loader
    #[arg(short, long, default_value = DEFAULT_OUTPUT_FILE)]
    pub output: PathBuf,
}

pub fn execute(args: ExtractArgs) -> Result<()> {
    let summary = extract_files(&args.inputs, &args.output)
        .with_context(|| format!("Failed to extract into {}", args.output.display()))?;

    println!("{}", "Extraction complete:".green().bold());
    println!("  Adverts read:          {}", summary.adverts_read);
    println!("  Records written:       {}", summary.records_written.to_string().cyan());
    if summary.without_coordinates > 0 {
        println!("  Without coordinates:   {}", summary.without_coordinates.to_string().yellow());
    }
    if summary.malformed_coordinates > 0 {
        println!("  Malformed coordinates: {}", summary.malformed_coordinates.to_string().yellow());
    }
    println!("  Output:                {}", args.output.display());

    Ok(())
}
