//! Whereabouts MCP Server — entry point.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use whereabouts::{SightingStore, TrainPolicy};
use whereabouts_mcp::config::{build_engine_config, Overrides};
use whereabouts_mcp::protocol::ProtocolHandler;
use whereabouts_mcp::session::WhereaboutsSession;
use whereabouts_mcp::tools::ToolRegistry;
use whereabouts_mcp::transport::StdioTransport;

#[derive(Parser)]
#[command(
    name = "whereabouts-mcp",
    about = "MCP server for Whereabouts — where was it seen, and where is it likely now",
    version
)]
struct Cli {
    /// Directory holding the per-label sighting logs.
    #[arg(short, long, global = true)]
    dir: Option<String>,

    /// JSON engine config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// JSON file with an array of zones ({name, lat, lon, radius_m}).
    #[arg(short, long, global = true)]
    zones: Option<PathBuf>,

    /// Seconds a sighting stays authoritative for predictions.
    #[arg(long, global = true)]
    freshness: Option<i64>,

    /// Clustering radius in meters for unzoned sightings.
    #[arg(long, global = true)]
    cluster_radius: Option<f64>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start MCP server over stdio (default).
    Serve {
        /// Never train on demand; predict only from models built by train_model.
        #[arg(long)]
        cached_only: bool,
    },

    /// Load the sighting logs and print per-label counts.
    Stats,

    /// Print server capabilities as JSON.
    Info,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   whereabouts-mcp completions bash > ~/.local/share/bash-completion/completions/whereabouts-mcp
    ///   whereabouts-mcp completions zsh > ~/.zfunc/_whereabouts-mcp
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

impl Cli {
    fn overrides(&self) -> Overrides<'_> {
        Overrides {
            config_file: self.config.as_deref(),
            dir: self.dir.as_deref(),
            zones_file: self.zones.as_deref(),
            freshness_seconds: self.freshness,
            cluster_radius_m: self.cluster_radius,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.as_ref().unwrap_or(&Commands::Serve { cached_only: false }) {
        Commands::Serve { cached_only } => {
            let config = build_engine_config(&cli.overrides())?;
            tracing::info!("Whereabouts MCP server");
            tracing::info!("Storage: {}", config.storage_dir.display());

            let mut session = WhereaboutsSession::open(&config)?;
            if *cached_only {
                session.set_train_policy(TrainPolicy::CachedOnly);
            }
            let handler = ProtocolHandler::new(Arc::new(session));
            let transport = StdioTransport::new(handler);
            transport.run().await?;
        }

        Commands::Stats => {
            let config = build_engine_config(&cli.overrides())?;
            let store = match SightingStore::open(&config.storage_dir) {
                Ok(store) => store,
                Err(e) => {
                    eprintln!("Invalid storage directory: {e}");
                    std::process::exit(1);
                }
            };

            let stats = store.load_stats();
            println!("Storage: {}", config.storage_dir.display());
            println!("  Log files: {}", stats.files);
            println!("  Sightings: {}", stats.rows);
            println!("  Skipped rows: {}", stats.skipped);
            println!("  Zones: {}", config.zones.len());
            for label in store.labels() {
                let last = store
                    .get_last_seen(&label)
                    .map(|s| format!("{} at {}", s.timestamp, s.location))
                    .unwrap_or_default();
                println!("  {label}: {} sightings, last {last}", store.count(&label));
            }
        }

        Commands::Info => {
            let capabilities = whereabouts_mcp::types::InitializeResult::default_result();
            let tools = ToolRegistry::list_tools();
            let info = serde_json::json!({
                "server": capabilities.server_info,
                "protocol_version": capabilities.protocol_version,
                "capabilities": capabilities.capabilities,
                "tools": tools.iter().map(|t| &t.name).collect::<Vec<_>>(),
                "tool_count": tools.len(),
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(*shell, &mut cmd, "whereabouts-mcp", &mut std::io::stdout());
        }
    }

    Ok(())
}
