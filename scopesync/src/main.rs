use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

mod config;
mod logging;
mod orchestrator;

#[derive(Debug, Parser)]
#[command(
    name = "scopesync",
    version,
    about = "Bidirectional asset sync between the inventory store and the scanner"
)]
struct Cli {
    /// Optional config file (YAML). If omitted, loads ./scopesync.yaml if present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Debug-level logging
    #[arg(long, global = true, default_value_t = false)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print version information
    Version,
    /// Run one reconciliation pass
    Run {
        /// Compute and log every plan without writing to either side
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    match cli.command {
        Commands::Version => {
            println!(
                "scopesync {} (core {})",
                env!("CARGO_PKG_VERSION"),
                scopesync_core::version()
            );
        }
        Commands::Run { dry_run } => {
            let cfg = config::load_config(cli.config.as_deref());
            let settings = config::resolve(cfg)?;
            let rt = tokio::runtime::Runtime::new()?;
            let summary = rt.block_on(orchestrator::run(&settings, dry_run))?;
            info!("run complete: {summary}");
        }
    }
    Ok(())
}
