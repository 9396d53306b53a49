//! gnosis-graph CLI — knowledge graph engine with MCP server.
//!
//! Usage:
//!   gnosis-graph mcp [--transport stdio] [--db path] [--config path]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "gnosis-graph",
    version,
    about = "Knowledge-graph ingestion and query engine with vocabulary self-evolution"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP (Model Context Protocol) server
    Mcp {
        /// Transport type (currently only stdio)
        #[arg(long, default_value = "stdio")]
        transport: String,
        /// Path to SQLite database file (defaults to `<data_dir>/gnosis.db`)
        #[arg(long)]
        db: Option<PathBuf>,
        /// Path to a TOML config file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Mcp { transport, db, config } => {
            if transport != "stdio" {
                eprintln!("error: only 'stdio' transport is currently supported");
                std::process::exit(1);
            }
            let config = match gnosis_graph::EngineConfig::load(config.as_deref()) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("error loading config: {e}");
                    std::process::exit(1);
                }
            };
            let code = gnosis_graph::mcp::run_mcp_server(config, db);
            std::process::exit(code);
        }
    }
}
