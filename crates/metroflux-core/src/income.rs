use metroflux_parser::IncomeTable;
use polars::prelude::*;
use thiserror::Error;
use tracing::info;

use crate::config::{ConfigError, IncomeConfig};
use crate::percent_change::{apply_percent_change, PercentChangeColumns, ZeroBasePolicy};
use crate::region_names::normalize_region_names;

pub const INCOME_PERCENT_CHANGE: &str = "income_percent_change";

#[derive(Debug, Error)]
pub enum IncomeError {
    #[error("polars operation failed: {0}")]
    Polars(#[from] PolarsError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug)]
pub struct IncomeOutput {
    /// `region_name`, `income_<base>`, `income_<target>`, `income_percent_change`.
    pub dataframe: DataFrame,
    pub excluded_rows: usize,
    pub missing_value_rows: usize,
    pub non_finite_rows: usize,
    pub zero_base_rows: usize,
}

/// Selects the two configured years, normalizes region names (dropping the national
/// aggregate) and computes the income percent change.
pub fn prepare_income(
    table: &IncomeTable,
    config: &IncomeConfig,
    policy: ZeroBasePolicy,
) -> Result<IncomeOutput, IncomeError> {
    for year in [&config.base_year, &config.target_year] {
        if !table.has_year(year) {
            return Err(ConfigError::IncomeYearMissing {
                year: year.clone(),
                available: table.years.clone(),
            }
            .into());
        }
    }

    let base_column = config.base_column();
    let target_column = config.target_column();

    let mut selected = DataFrame::new(vec![
        table.df.column("region_name")?.clone(),
        table.df.column(&config.base_year)?.clone(),
        table.df.column(&config.target_year)?.clone(),
    ])?;
    selected.rename(&config.base_year, base_column.as_str().into())?;
    selected.rename(&config.target_year, target_column.as_str().into())?;

    let normalized = normalize_region_names(&selected, "region_name")?;
    let changed = apply_percent_change(
        &normalized.dataframe,
        PercentChangeColumns {
            base: &base_column,
            target: &target_column,
            output: INCOME_PERCENT_CHANGE,
        },
        policy,
    )?;

    info!(
        rows_in = table.df.height(),
        rows_out = changed.dataframe.height(),
        excluded_rows = normalized.excluded_rows,
        missing_value_rows = changed.missing_value_rows,
        non_finite_rows = changed.non_finite_rows,
        zero_base_rows = changed.zero_base_rows,
        "prepared income table"
    );

    Ok(IncomeOutput {
        dataframe: changed.dataframe,
        excluded_rows: normalized.excluded_rows,
        missing_value_rows: changed.missing_value_rows,
        non_finite_rows: changed.non_finite_rows,
        zero_base_rows: changed.zero_base_rows,
    })
}
