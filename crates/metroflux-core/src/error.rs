use std::path::PathBuf;

use metroflux_parser::ParserError;
use polars::error::PolarsError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::income::IncomeError;
use crate::ranking::RankingError;
use crate::reshape::ReshapeError;
use crate::scoring::ScoringError;
use crate::snapshot::SnapshotError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("failed to read {source_name} file {}: {source}", path.display())]
    Io {
        source_name: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {source_name} file {} as {parser}: {source}", path.display())]
    Source {
        source_name: &'static str,
        parser: &'static str,
        path: PathBuf,
        #[source]
        source: ParserError,
    },

    #[error("pipeline '{pipeline}' requires the {source_name} source")]
    MissingSource {
        pipeline: &'static str,
        source_name: &'static str,
    },

    #[error("unknown pipeline '{0}'")]
    UnknownPipeline(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Reshape failed: {0}")]
    Reshape(#[from] ReshapeError),

    #[error("Snapshot extraction failed: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("Income preparation failed: {0}")]
    Income(#[from] IncomeError),

    #[error("Scoring failed: {0}")]
    Scoring(#[from] ScoringError),

    #[error("Ranking failed: {0}")]
    Ranking(#[from] RankingError),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] PolarsError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
