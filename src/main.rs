//! gatesim - simulated-client load generator for a game-server gateway
//! cluster.

use anyhow::{Context, Result};
use clap::Parser;
use gatesim_client::{run_swarm, ClientEntity, MethodRegistry, MethodTable};
use gatesim_config::{find_config_file, SwarmConfig};
use gatesim_proto::FieldValue;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "gatesim")]
#[command(about = "Simulated-client load generator for the gateway cluster")]
struct Args {
    /// Deployment config path (default: gatesim.toml next to the
    /// executable, then the working directory).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the number of bots from the config.
    #[arg(short = 'n', long)]
    bots: Option<usize>,

    /// Upgrade recoverable errors to process exit (fail-fast runs).
    #[arg(long)]
    strict: bool,

    /// Log warnings and errors only.
    #[arg(long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    info!("starting gatesim v{}", env!("CARGO_PKG_VERSION"));

    let config_path = args
        .config
        .or_else(find_config_file)
        .context("no --config given and no gatesim.toml found")?;
    info!("using config {}", config_path.display());

    let mut config = SwarmConfig::load(&config_path)?;
    if let Some(bots) = args.bots {
        config.bots = bots;
    }
    if args.strict {
        config.strict = true;
    }

    run_swarm(Arc::new(config), Arc::new(default_registry())).await
}

/// Methods the server may invoke on any mirrored player entity.
fn default_registry() -> MethodRegistry {
    let mut table = MethodTable::new();
    table.register("OnLogin", |entity: &mut ClientEntity, (): ()| {
        entity.set_field("logged_in", FieldValue::Bool(true));
        debug!(entity = entity.id, "login acknowledged");
    });
    table.register(
        "OnAttrChange",
        |entity: &mut ClientEntity, (key, value): (String, FieldValue)| {
            entity.set_field(key, value);
        },
    );

    let mut registry = MethodRegistry::new();
    registry.set_default(table);
    registry
}
