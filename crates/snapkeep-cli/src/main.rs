//! snapkeep CLI
//!
//! Inspect, purge and verify a snapshot database.

use clap::{Parser, Subcommand};
use snapkeep_core::logging_facility::{init, Profile};
use std::path::PathBuf;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "snapkeep")]
#[command(about = "snapkeep - Entity snapshot store", long_about = None)]
struct Cli {
    /// Snapshot database file
    #[arg(long, global = true, default_value = "snapshots.db")]
    db: PathBuf,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Debug-level human-readable logs on stderr
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List snapshots of a class or source, or counts per class
    List(commands::inspect::ListArgs),
    /// Show the newest snapshot of one source
    Latest(commands::inspect::LatestArgs),
    /// Show one snapshot by id
    Show(commands::inspect::ShowArgs),
    /// Delete snapshots created before a cutoff
    Purge(commands::maintenance::PurgeArgs),
    /// Report snapshots whose stored checksum no longer matches their data
    Verify,
    /// Capture sample Product and Order snapshots
    SeedDemo,
}

fn main() {
    // Missing .env is fine
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init(if cli.verbose {
        Profile::Development
    } else {
        Profile::Production
    });

    let output = commands::Output { json: cli.json };
    let result = match cli.command {
        Commands::List(args) => commands::inspect::list(&cli.db, args, output),
        Commands::Latest(args) => commands::inspect::latest(&cli.db, args, output),
        Commands::Show(args) => commands::inspect::show(&cli.db, args, output),
        Commands::Purge(args) => commands::maintenance::purge(&cli.db, args, output),
        Commands::Verify => commands::maintenance::verify(&cli.db, output),
        Commands::SeedDemo => commands::seed::seed_demo(&cli.db, output),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
