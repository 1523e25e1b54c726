//! CLI command definitions and handlers.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};

use estate_core::EstateError;
use estate_graph::GraphClient;

use crate::config::{EstateConfig, GraphOverrides};

pub mod analyze;
pub mod derive;
pub mod embed;
pub mod extract;
pub mod gnn;
pub mod graph;
pub mod import;

/// Vienna apartment knowledge graph
#[derive(Parser)]
#[command(name = "estate")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (defaults to $ESTATE_CONFIG, then the user config dir)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Neo4j bolt URI
    #[arg(long, global = true, env = "NEO4J_URI")]
    pub neo4j_uri: Option<String>,

    /// Neo4j user
    #[arg(long, global = true, env = "NEO4J_USER")]
    pub neo4j_user: Option<String>,

    /// Neo4j password
    #[arg(long, global = true, env = "NEO4J_PASSWORD", hide_env_values = true)]
    pub neo4j_password: Option<String>,

    /// Target Neo4j database
    #[arg(long, global = true, env = "NEO4J_DATABASE")]
    pub neo4j_database: Option<String>,

    /// Seconds to wait for the Neo4j connection
    #[arg(long, global = true, default_value = "10")]
    pub connect_timeout: u64,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reduce crawler dumps to importable listing records
    Extract(extract::ExtractArgs),

    /// Import listing records into the graph
    Import(import::ImportArgs),

    /// Derive addresses, neighbors and price ranges
    #[command(subcommand)]
    Derive(derive::DeriveCommands),

    /// Analytical queries
    #[command(subcommand)]
    Analyze(analyze::AnalyzeCommands),

    /// Knowledge-graph embeddings
    #[command(subcommand)]
    Embed(embed::EmbedCommands),

    /// Graph Data Science models
    #[command(subcommand)]
    Gnn(gnn::GnnCommands),

    /// Graph maintenance
    #[command(subcommand)]
    Graph(graph::GraphCommands),
}

/// Resolved settings shared by command handlers.
pub struct Context {
    pub config: EstateConfig,
    connect_timeout: Duration,
}

impl Context {
    /// Connect to Neo4j, failing once the connect timeout elapses.
    pub async fn graph(&self) -> Result<GraphClient> {
        let graph = &self.config.graph;
        match tokio::time::timeout(self.connect_timeout, GraphClient::connect(graph)).await {
            Ok(client) => client.with_context(|| format!("Cannot connect to Neo4j at {}", graph.uri)),
            Err(_) => Err(EstateError::unavailable(
                "neo4j",
                format!("no connection to {} within {}s", graph.uri, self.connect_timeout.as_secs()),
            )
            .into()),
        }
    }
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let mut config = EstateConfig::load(self.config.as_deref())?;
        config.apply_overrides(GraphOverrides {
            uri: self.neo4j_uri,
            user: self.neo4j_user,
            password: self.neo4j_password,
            db: self.neo4j_database,
        });

        let ctx = Context {
            config,
            connect_timeout: Duration::from_secs(self.connect_timeout),
        };

        match self.command {
            Commands::Extract(args) => extract::execute(args),
            Commands::Import(args) => import::execute(args, &ctx).await,
            Commands::Derive(cmd) => derive::execute(cmd, &ctx).await,
            Commands::Analyze(cmd) => analyze::execute(cmd, &ctx).await,
            Commands::Embed(cmd) => embed::execute(cmd, &ctx).await,
            Commands::Gnn(cmd) => gnn::execute(cmd, &ctx).await,
            Commands::Graph(cmd) => graph::execute(cmd, &ctx).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_nested_commands() {
        let cli = Cli::try_parse_from(["estate", "analyze", "expensive", "--factor", "4"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Analyze(analyze::AnalyzeCommands::Expensive { factor }) if factor == 4.0
        ));

        let cli = Cli::try_parse_from(["estate", "gnn", "similar", "apartments", "666356897"]).unwrap();
        assert!(matches!(cli.command, Commands::Gnn(gnn::GnnCommands::Similar { .. })));

        let cli = Cli::try_parse_from(["estate", "derive", "price-ranges"]).unwrap();
        assert!(matches!(cli.command, Commands::Derive(derive::DeriveCommands::PriceRanges)));
    }

    #[test]
    fn test_global_connection_flags() {
        let cli = Cli::try_parse_from([
            "estate", "graph", "status", "--neo4j-uri", "bolt://db:7687", "--connect-timeout", "3",
        ])
        .unwrap();
        assert_eq!(cli.neo4j_uri.as_deref(), Some("bolt://db:7687"));
        assert_eq!(cli.connect_timeout, 3);
    }
}
