//! hcsvm CLI entry point.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cli;

/// hcsvm - Hyper-V Host Compute System VM lifecycle tool
#[derive(Parser, Debug)]
#[command(name = "hcsvm")]
#[command(about = "Hyper-V Host Compute System VM lifecycle tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create and start a VM from a JSON spec or VHDX file.
    Create(cli::create::CreateCmd),

    /// List all compute systems.
    #[command(alias = "ls")]
    List(cli::list::ListCmd),

    /// Show basic properties of a compute system.
    Inspect(cli::inspect::InspectCmd),

    /// Dump all available properties (memory, stats, processes).
    Dump(cli::dump::DumpCmd),

    /// Gracefully shut down a compute system.
    Stop(cli::stop::StopCmd),

    /// Forcibly terminate a compute system.
    Kill(cli::kill::KillCmd),
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging based on RUST_LOG or default to warn
    init_logging();

    tracing::debug!(version = hcsvm::VERSION, "starting hcsvm");

    // Compute service mutations require elevation; warn up front rather
    // than failing halfway through a transaction.
    #[cfg(windows)]
    if !hcsvm::hcs::compute_core::is_elevated() {
        eprintln!("Warning: not running as Administrator. Compute service operations require elevation.");
    }

    let result = match cli.command {
        Commands::Create(cmd) => cmd.run(),
        Commands::List(cmd) => cmd.run(),
        Commands::Inspect(cmd) => cmd.run(),
        Commands::Dump(cmd) => cmd.run(),
        Commands::Stop(cmd) => cmd.run(),
        Commands::Kill(cmd) => cmd.run(),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "command failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize the tracing subscriber.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("hcsvm=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
