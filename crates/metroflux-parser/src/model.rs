use std::collections::HashSet;

use chrono::NaiveDate;
use polars::prelude::*;

use crate::errors::ParserError;
use crate::formats::{format_date_header, parse_date_header};

/// Identifier columns carried by every wide metric row, in canonical order.
pub const IDENTIFIER_COLUMNS: [&str; 5] = [
    "region_id",
    "size_rank",
    "region_name",
    "region_type",
    "state_name",
];

const WIDE_MODEL: &str = "wide_metric_table";

/// One row per region, one `f64` column per date (named `YYYY-MM-DD`).
#[derive(Debug, Clone)]
pub struct WideMetricTable {
    pub df: DataFrame,
    pub dates: Vec<NaiveDate>,
}

impl WideMetricTable {
    /// Validates an already-built frame: identifier columns present, `region_id` unique,
    /// every other column a date header in strictly increasing order. Value columns are
    /// cast to `f64`, anything non-numeric becomes null.
    pub fn from_dataframe(df: DataFrame) -> Result<Self, ParserError> {
        for name in IDENTIFIER_COLUMNS {
            if df.column(name).is_err() {
                return Err(ParserError::MissingColumn {
                    parser: WIDE_MODEL,
                    column: name.to_string(),
                });
            }
        }

        let mut dates: Vec<NaiveDate> = Vec::new();
        let mut columns: Vec<Column> = Vec::with_capacity(df.width());

        for column in df.get_columns() {
            let name = column.name().as_str();
            let target = match name {
                "region_id" | "size_rank" => DataType::Int64,
                "region_name" | "region_type" | "state_name" => DataType::String,
                _ => {
                    let date = parse_date_header(WIDE_MODEL, name)?;
                    if let Some(previous) = dates.last() {
                        if date <= *previous {
                            return Err(ParserError::Validation {
                                parser: WIDE_MODEL,
                                message: format!(
                                    "date column {date} is not after preceding column {previous}"
                                ),
                            });
                        }
                    }
                    dates.push(date);
                    DataType::Float64
                }
            };

            let cast = column.cast(&target).map_err(|err| ParserError::Validation {
                parser: WIDE_MODEL,
                message: format!("failed to cast column '{name}': {err}"),
            })?;
            columns.push(cast);
        }

        let df = DataFrame::new(columns).map_err(|err| ParserError::Validation {
            parser: WIDE_MODEL,
            message: format!("failed to rebuild wide table: {err}"),
        })?;

        ensure_unique_region_ids(&df)?;

        Ok(Self { df, dates })
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn date_column_names(&self) -> Vec<String> {
        self.dates.iter().map(|date| format_date_header(*date)).collect()
    }
}

fn ensure_unique_region_ids(df: &DataFrame) -> Result<(), ParserError> {
    let unreadable = |err: PolarsError| ParserError::Validation {
        parser: WIDE_MODEL,
        message: format!("region_id column unreadable: {err}"),
    };
    let column = df.column("region_id").map_err(unreadable)?;
    let ids = column.i64().map_err(unreadable)?;

    let mut seen = HashSet::with_capacity(ids.len());
    for (idx, id) in ids.into_iter().enumerate() {
        let Some(id) = id else {
            return Err(ParserError::Validation {
                parser: WIDE_MODEL,
                message: format!("row {idx} has no region_id"),
            });
        };
        if !seen.insert(id) {
            return Err(ParserError::Validation {
                parser: WIDE_MODEL,
                message: format!("duplicate region_id {id}"),
            });
        }
    }
    Ok(())
}

/// Regional income figures: `geo_fips`, raw `region_name` and one `f64` column per year.
#[derive(Debug, Clone)]
pub struct IncomeTable {
    pub df: DataFrame,
    pub years: Vec<String>,
}

impl IncomeTable {
    pub fn has_year(&self, year: &str) -> bool {
        self.years.iter().any(|candidate| candidate == year)
    }
}

/// Precomputed per-state ranking: `state_name`, `state_score`.
#[derive(Debug, Clone)]
pub struct StateScoreTable {
    pub df: DataFrame,
}
