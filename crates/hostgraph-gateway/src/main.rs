//! Hostgraph — working graph of hosts with per-node command execution

use clap::{Parser, Subcommand};
use hostgraph_core::{BindMode, ServerConfig};
use hostgraph_gateway::start_server;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "hostgraph", about = "Hostgraph — operator working graph with command execution")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        #[arg(short, long, default_value = "5000")]
        port: u16,
        #[arg(short, long, default_value = "lan")]
        bind: String,
        /// Path to the graph JSON file
        #[arg(short, long, default_value = "graph_db.json")]
        db: PathBuf,
    },
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve { port, bind, db }) => {
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| "hostgraph=info,tower_http=info".into()),
                )
                .with(tracing_subscriber::fmt::layer())
                .init();

            let bind = match bind.as_str() {
                "loopback" | "localhost" | "127.0.0.1" => BindMode::Loopback,
                _ => BindMode::Lan,
            };
            start_server(ServerConfig { port, bind }, db).await
        }
        Some(Commands::Version) => {
            println!("hostgraph {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        None => {
            println!("Usage: hostgraph serve [--port 5000] [--bind lan] [--db graph_db.json]");
            Ok(())
        }
    }
}
