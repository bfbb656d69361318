use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod display;

use commands::run::{handle_run_command, RunArgs};
use commands::series::{handle_series_command, SeriesArgs};

/// Home-value and income affordability rankings for metro areas
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a scoring pipeline over the metro, income and state-score files
    Run(RunArgs),
    /// Print one region's home-value series with summary statistics
    Series(SeriesArgs),
    /// List the registered pipelines
    Pipelines,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => handle_run_command(args),
        Command::Series(args) => handle_series_command(args),
        Command::Pipelines => {
            println!("{}", display::pipelines_table());
            Ok(())
        }
    }
}
