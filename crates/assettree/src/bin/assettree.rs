use std::path::PathBuf;

use anyhow::{Context, Result};
use assettree::common::logging;
use assettree::performance::PerformanceMonitor;
use assettree::persistence::PersistenceManager;
use assettree::AssetTreeConfig;
use clap::{Parser, Subcommand};

/// Inspect and maintain persisted asset tree state
#[derive(Parser)]
#[command(name = "assettree", version)]
#[command(about = "Inspect, export and maintain persisted asset tree view state")]
struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the storage directory
    #[arg(long, global = true)]
    storage_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show what is stored
    Info,
    /// Write the stored state as an export envelope
    Export {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replace the stored state with an export envelope
    Import {
        /// Envelope produced by `export`
        file: PathBuf,
    },
    /// Delete the stored state
    Clear,
    /// Time loading and migrating the stored state
    RestoreSpeed,
    /// Rendering recommendations for a tree of the given shape
    Recommend {
        /// Number of nodes in the tree
        #[arg(long)]
        tree_size: usize,

        /// Deepest nesting level
        #[arg(long, default_value_t = 0)]
        max_depth: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AssetTreeConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(dir) = cli.storage_dir {
        config.storage.directory = Some(dir);
    }
    logging::init(config.log_options()).context("Failed to initialize logging")?;

    match cli.command {
        Commands::Info => {
            let info = persistence(&config).get_storage_info().await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Commands::Export { output } => {
            let Some(exported) = persistence(&config).export_state().await? else {
                eprintln!("No stored state to export");
                return Ok(());
            };
            match output {
                Some(path) => {
                    std::fs::write(&path, exported)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Exported state to {}", path.display());
                }
                None => println!("{}", exported),
            }
        }
        Commands::Import { file } => {
            let json = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let state = persistence(&config).import_state(&json).await?;
            println!(
                "Imported state: {} expanded nodes, {} history entries",
                state.expanded_keys.len(),
                state.navigation.len()
            );
        }
        Commands::Clear => {
            if persistence(&config).clear_state().await? {
                println!("Stored state cleared");
            } else {
                println!("No stored state");
            }
        }
        Commands::RestoreSpeed => {
            let timing = persistence(&config).measure_restoration_speed().await?;
            println!("Load:      {:.2}ms", timing.load_time_ms);
            println!("Migration: {:.2}ms", timing.migration_time_ms);
            println!("Total:     {:.2}ms", timing.total_time_ms);
            println!(
                "Status:    {}",
                if !timing.state_found {
                    "no stored state"
                } else if timing.is_optimal {
                    "optimal"
                } else {
                    "slow"
                }
            );
        }
        Commands::Recommend { tree_size, max_depth } => {
            let monitor = PerformanceMonitor::with_thresholds(config.performance.clone());
            monitor.measure_memory_usage();
            let recommendations = monitor.get_recommendations(tree_size, max_depth);
            if recommendations.is_empty() {
                println!("No recommendations for {} nodes at depth {}", tree_size, max_depth);
            }
            for rec in recommendations {
                println!("[{:?}] {}: {}", rec.priority, rec.kind.as_str(), rec.description);
                println!("    impact: {}", rec.impact);
                println!("    how:    {}", rec.implementation);
            }
            monitor.destroy();
        }
    }

    Ok(())
}

fn persistence(config: &AssetTreeConfig) -> PersistenceManager {
    PersistenceManager::new(config.storage.open(), config.persistence.clone())
}
