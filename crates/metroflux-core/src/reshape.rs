use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::{Datelike, NaiveDate};
use metroflux_parser::formats::format_date_header;
use metroflux_parser::WideMetricTable;
use polars::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

#[derive(Debug, Error)]
pub enum ReshapeError {
    #[error("polars operation failed: {0}")]
    Polars(#[from] PolarsError),
    #[error("wide table lists {dates} dates but {columns} value columns")]
    DateColumnMismatch { dates: usize, columns: usize },
    #[error("date {date} is not after preceding date {previous}")]
    UnorderedDates { date: NaiveDate, previous: NaiveDate },
    #[error("date value {days} is outside the supported calendar range")]
    DateOutOfRange { days: i32 },
    #[error("long table has more than one row for region {region_id} on {date}")]
    DuplicateKey { region_id: i64, date: NaiveDate },
    #[error("region '{0}' does not appear in the long table")]
    RegionNotFound(String),
}

pub fn date_to_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

pub fn days_to_date(days: i32) -> Result<NaiveDate, ReshapeError> {
    NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_DAYS_FROM_CE)
        .ok_or(ReshapeError::DateOutOfRange { days })
}

pub(crate) fn date_series(name: &str, dates: Vec<i32>) -> PolarsResult<Series> {
    Series::new(name.into(), dates).cast(&DataType::Date)
}

/// Reads a `Date` column back as day offsets from the unix epoch.
pub(crate) fn date_days(df: &DataFrame, name: &str) -> PolarsResult<Int32Chunked> {
    let days = df.column(name)?.cast(&DataType::Int32)?;
    Ok(days.i32()?.clone())
}

/// Melts the wide table into one row per (region, date column), region-major. Identifier
/// fields are copied onto every row; missing values stay null.
pub fn wide_to_long(table: &WideMetricTable) -> Result<DataFrame, ReshapeError> {
    let wide = &table.df;
    let column_names = table.date_column_names();

    for pair in table.dates.windows(2) {
        if pair[1] <= pair[0] {
            return Err(ReshapeError::UnorderedDates {
                date: pair[1],
                previous: pair[0],
            });
        }
    }

    let value_width = wide.width().saturating_sub(metroflux_parser::IDENTIFIER_COLUMNS.len());
    if value_width != column_names.len() {
        return Err(ReshapeError::DateColumnMismatch {
            dates: column_names.len(),
            columns: value_width,
        });
    }

    let region_ids = wide.column("region_id")?.i64()?;
    let size_ranks = wide.column("size_rank")?.i64()?;
    let region_names = wide.column("region_name")?.str()?;
    let region_types = wide.column("region_type")?.str()?;
    let state_names = wide.column("state_name")?.str()?;

    let mut value_columns: Vec<&Float64Chunked> = Vec::with_capacity(column_names.len());
    for name in &column_names {
        value_columns.push(wide.column(name)?.f64()?);
    }
    let day_offsets: Vec<i32> = table.dates.iter().copied().map(date_to_days).collect();

    let len = wide.height() * day_offsets.len();
    let mut out_ids = Vec::with_capacity(len);
    let mut out_ranks = Vec::with_capacity(len);
    let mut out_names = Vec::with_capacity(len);
    let mut out_types = Vec::with_capacity(len);
    let mut out_states = Vec::with_capacity(len);
    let mut out_dates = Vec::with_capacity(len);
    let mut out_values = Vec::with_capacity(len);

    for idx in 0..wide.height() {
        for (values, days) in value_columns.iter().zip(&day_offsets) {
            out_ids.push(region_ids.get(idx));
            out_ranks.push(size_ranks.get(idx));
            out_names.push(region_names.get(idx));
            out_types.push(region_types.get(idx));
            out_states.push(state_names.get(idx));
            out_dates.push(*days);
            out_values.push(values.get(idx));
        }
    }

    let long = DataFrame::new(vec![
        Series::new("region_id".into(), out_ids).into(),
        Series::new("size_rank".into(), out_ranks).into(),
        Series::new("region_name".into(), out_names).into(),
        Series::new("region_type".into(), out_types).into(),
        Series::new("state_name".into(), out_states).into(),
        date_series("date", out_dates)?.into(),
        Series::new("value".into(), out_values).into(),
    ])?;

    debug!(
        regions = wide.height(),
        dates = day_offsets.len(),
        rows = long.height(),
        "reshaped wide table to long format"
    );

    Ok(long)
}

/// Spreads a long table back into one row per region, with regions in first-appearance
/// order and date columns ascending.
pub fn long_to_wide(long: &DataFrame) -> Result<DataFrame, ReshapeError> {
    let region_ids = long.column("region_id")?.i64()?;
    let size_ranks = long.column("size_rank")?.i64()?;
    let region_names = long.column("region_name")?.str()?;
    let region_types = long.column("region_type")?.str()?;
    let state_names = long.column("state_name")?.str()?;
    let dates = date_days(long, "date")?;
    let values = long.column("value")?.f64()?;

    let mut order: Vec<(i64, usize)> = Vec::new();
    let mut seen_regions: HashSet<i64> = HashSet::new();
    let mut all_days: BTreeSet<i32> = BTreeSet::new();
    let mut cells: HashMap<(i64, i32), Option<f64>> = HashMap::new();

    for idx in 0..long.height() {
        let (Some(region_id), Some(days)) = (region_ids.get(idx), dates.get(idx)) else {
            continue;
        };
        if seen_regions.insert(region_id) {
            order.push((region_id, idx));
        }
        all_days.insert(days);
        if cells.insert((region_id, days), values.get(idx)).is_some() {
            return Err(ReshapeError::DuplicateKey {
                region_id,
                date: days_to_date(days)?,
            });
        }
    }

    let mut columns: Vec<Column> = vec![
        Series::new(
            "region_id".into(),
            order.iter().map(|(id, _)| *id).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "size_rank".into(),
            order.iter().map(|(_, row)| size_ranks.get(*row)).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "region_name".into(),
            order.iter().map(|(_, row)| region_names.get(*row)).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "region_type".into(),
            order.iter().map(|(_, row)| region_types.get(*row)).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "state_name".into(),
            order.iter().map(|(_, row)| state_names.get(*row)).collect::<Vec<_>>(),
        )
        .into(),
    ];

    for days in all_days {
        let header = format_date_header(days_to_date(days)?);
        let column_values: Vec<Option<f64>> = order
            .iter()
            .map(|(id, _)| cells.get(&(*id, days)).copied().flatten())
            .collect();
        columns.push(Series::new(header.as_str().into(), column_values).into());
    }

    Ok(DataFrame::new(columns)?)
}

/// Time series for one region: values averaged across duplicate rows on the same date,
/// missing values dropped, sorted by date.
pub fn region_series(long: &DataFrame, region_name: &str) -> Result<DataFrame, ReshapeError> {
    let names = long.column("region_name")?.str()?;
    let dates = date_days(long, "date")?;
    let values = long.column("value")?.f64()?;

    let mut matched = false;
    let mut per_date: BTreeMap<i32, (f64, usize)> = BTreeMap::new();

    for idx in 0..long.height() {
        if names.get(idx) != Some(region_name) {
            continue;
        }
        matched = true;
        if let (Some(days), Some(value)) = (dates.get(idx), values.get(idx)) {
            let entry = per_date.entry(days).or_insert((0.0, 0));
            entry.0 += value;
            entry.1 += 1;
        }
    }

    if !matched {
        return Err(ReshapeError::RegionNotFound(region_name.to_string()));
    }

    let mut out_dates = Vec::with_capacity(per_date.len());
    let mut out_values = Vec::with_capacity(per_date.len());
    for (days, (sum, count)) in per_date {
        out_dates.push(days);
        out_values.push(sum / count as f64);
    }

    Ok(DataFrame::new(vec![
        date_series("date", out_dates)?.into(),
        Series::new("value".into(), out_values).into(),
    ])?)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

/// Count, mean, sample standard deviation and extrema of a `region_series` frame.
pub fn describe_series(series: &DataFrame) -> Result<SeriesSummary, ReshapeError> {
    let values: Vec<f64> = series.column("value")?.f64()?.into_iter().flatten().collect();
    let dates = date_days(series, "date")?;

    let count = values.len();
    let mean = (count > 0).then(|| values.iter().sum::<f64>() / count as f64);
    let std = match (mean, count) {
        (Some(mean), n) if n > 1 => {
            let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
            Some(variance.sqrt())
        }
        _ => None,
    };
    let min = values.iter().copied().reduce(f64::min);
    let max = values.iter().copied().reduce(f64::max);

    let present_days: Vec<i32> = dates.into_iter().flatten().collect();
    let first_date = present_days.iter().copied().min().map(days_to_date).transpose()?;
    let last_date = present_days.iter().copied().max().map(days_to_date).transpose()?;

    Ok(SeriesSummary {
        count,
        mean,
        std,
        min,
        max,
        first_date,
        last_date,
    })
}
