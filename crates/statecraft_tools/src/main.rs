//! Statecraft - Development Tools

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "statecraft-tools")]
#[command(about = "Development tools for Statecraft")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a scenario file, or every data file in a directory
    Validate {
        /// Scenario file or data directory
        #[arg(default_value = "data")]
        path: PathBuf,
        /// Engine configuration (RON)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Run a scenario offline and print the final state as JSON
    Simulate {
        /// Scenario file
        scenario: PathBuf,
        /// Number of ticks to run
        #[arg(long, default_value_t = 10)]
        ticks: u64,
        /// Engine configuration (RON)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { path, .. } if path.is_dir() => {
            tracing::info!("Validating data files in: {}", path.display());
            statecraft_tools::validate::validate_data_directory(&path)
                .map(|checked| tracing::info!("Validation passed ({checked} file(s))"))
        }
        Commands::Validate { path, config } => {
            tracing::info!("Validating scenario: {}", path.display());
            statecraft_tools::validate::validate_scenario_file(&path, config.as_deref())
                .and_then(|summary| print_json(&summary))
                .map(|()| tracing::info!("Validation passed"))
        }
        Commands::Simulate {
            scenario,
            ticks,
            config,
        } => statecraft_tools::simulate::simulate(&scenario, config.as_deref(), ticks)
            .and_then(|report| print_json(&report)),
    };

    if let Err(e) = result {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

fn print_json(value: &impl Serialize) -> Result<(), statecraft_tools::ToolError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
