use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::ValueEnum;
use metroflux_core::config::PipelineConfig;
use metroflux_core::ingestion::{load_inputs, SourcePaths};
use metroflux_core::outputs::{write_summary, write_tables};
use metroflux_core::pipelines::{find_pipeline, COMPOSITE_SCORE_V1, HOUSING_AFFORDABILITY_V1};
use tracing::info;

use crate::display;

const CONFIG_ENV: &str = "METROFLUX_CONFIG";

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Parquet,
    Csv,
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            OutputFormat::Parquet => "parquet",
            OutputFormat::Csv => "csv",
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Wide home-value CSV (one row per region, one column per date)
    #[arg(long)]
    pub metro: PathBuf,
    /// Per-capita income CSV
    #[arg(long)]
    pub income: Option<PathBuf>,
    /// Two-column state score CSV
    #[arg(long)]
    pub state_scores: Option<PathBuf>,
    /// TOML configuration; falls back to $METROFLUX_CONFIG, then built-in defaults
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Pipeline code; defaults to the composite pipeline when an income file is given
    #[arg(long)]
    pub pipeline: Option<String>,
    #[arg(long)]
    pub date_a: Option<NaiveDate>,
    #[arg(long)]
    pub date_b: Option<NaiveDate>,
    /// Rows kept in each ranking
    #[arg(long)]
    pub top: Option<usize>,
    /// Directory receiving every output table
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Parquet)]
    pub format: OutputFormat,
    /// Write the run summary as JSON
    #[arg(long)]
    pub summary_json: Option<PathBuf>,
}

pub fn handle_run_command(args: RunArgs) -> Result<()> {
    let config = resolve_config(&args)?;

    let pipeline_code = args.pipeline.as_deref().unwrap_or(if args.income.is_some() {
        COMPOSITE_SCORE_V1
    } else {
        HOUSING_AFFORDABILITY_V1
    });
    let pipeline = find_pipeline(pipeline_code)?;

    let inputs = load_inputs(
        &SourcePaths {
            metro: args.metro.clone(),
            income: args.income.clone(),
            state_scores: args.state_scores.clone(),
        },
        &config.income,
    )?;

    info!(
        pipeline = pipeline.code_identifier(),
        date_a = %config.snapshot.date_a,
        date_b = %config.snapshot.date_b,
        top_n = config.ranking.top_n,
        "running pipeline"
    );
    let output = pipeline
        .run(&inputs, &config)
        .with_context(|| format!("pipeline '{}' failed", pipeline.code_identifier()))?;

    for table in &output.tables {
        println!("\n{}", display::title(table.name, &output.summary));
        println!("{}", display::dataframe_table(&table.dataframe)?);
    }
    println!("\n{}", display::summary_table(&output.summary));

    if let Some(dir) = &args.output_dir {
        let written = write_tables(&output, dir, args.format.extension())?;
        info!(dir = %dir.display(), files = written.len(), "wrote output tables");
    }
    if let Some(path) = &args.summary_json {
        write_summary(&output.summary, path)?;
        info!(path = %path.display(), "wrote run summary");
    }

    Ok(())
}

fn resolve_config(args: &RunArgs) -> Result<PipelineConfig> {
    let path = args
        .config
        .clone()
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

    let mut config = match &path {
        Some(path) => load_config(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(date_a) = args.date_a {
        config.snapshot.date_a = date_a;
    }
    if let Some(date_b) = args.date_b {
        config.snapshot.date_b = date_b;
    }
    if let Some(top) = args.top {
        config.ranking.top_n = top;
    }

    config
        .validate()
        .context("invalid configuration after applying command-line overrides")?;
    Ok(config)
}

fn load_config(path: &Path) -> Result<PipelineConfig> {
    PipelineConfig::load(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))
}
