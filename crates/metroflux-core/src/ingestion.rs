use std::fs;
use std::path::{Path, PathBuf};

use metroflux_parser::formats::{BeaIncomeParser, StateScoreParser, ZhviWideParser};
use metroflux_parser::SourceParser;
use tracing::info;

use crate::config::IncomeConfig;
use crate::error::{PipelineError, Result};
use crate::pipelines::PipelineInputs;

#[derive(Debug, Clone)]
pub struct SourcePaths {
    pub metro: PathBuf,
    pub income: Option<PathBuf>,
    pub state_scores: Option<PathBuf>,
}

/// Reads and parses every configured source. Any unreadable or unparseable file aborts
/// the load with an error naming the file.
pub fn load_inputs(paths: &SourcePaths, income: &IncomeConfig) -> Result<PipelineInputs> {
    let metro = load_source("metro", &ZhviWideParser, &paths.metro)?;
    info!(
        path = %paths.metro.display(),
        regions = metro.height(),
        dates = metro.dates.len(),
        "loaded metro home-value table"
    );

    let income = match &paths.income {
        Some(path) => {
            let parser = BeaIncomeParser {
                skip_rows: income.skip_rows,
                line_code: income.line_code.clone(),
            };
            let table = load_source("income", &parser, path)?;
            info!(
                path = %path.display(),
                rows = table.df.height(),
                years = ?table.years,
                "loaded income table"
            );
            Some(table)
        }
        None => None,
    };

    let state_scores = match &paths.state_scores {
        Some(path) => {
            let table = load_source("state-score", &StateScoreParser, path)?;
            info!(path = %path.display(), states = table.df.height(), "loaded state scores");
            Some(table)
        }
        None => None,
    };

    Ok(PipelineInputs {
        metro,
        income,
        state_scores,
    })
}

pub fn load_source<P: SourceParser>(
    source_name: &'static str,
    parser: &P,
    path: &Path,
) -> Result<P::Output> {
    let content = fs::read_to_string(path).map_err(|source| PipelineError::Io {
        source_name,
        path: path.to_path_buf(),
        source,
    })?;
    parser
        .parse(&content)
        .map_err(|source| PipelineError::Source {
            source_name,
            parser: parser.name(),
            path: path.to_path_buf(),
            source,
        })
}
