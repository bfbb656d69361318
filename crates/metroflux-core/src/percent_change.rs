use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What to do with a row whose base value is zero, where percent change is undefined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroBasePolicy {
    /// Drop the row.
    #[default]
    Exclude,
    /// Keep the row with a `NaN` percent change.
    Flag,
}

/// `(b - a) / a * 100`, or `None` when `a` is zero or the inputs or result are not finite.
pub fn percent_change(a: f64, b: f64) -> Option<f64> {
    if a == 0.0 || !a.is_finite() || !b.is_finite() {
        return None;
    }
    let change = (b - a) / a * 100.0;
    change.is_finite().then_some(change)
}

#[derive(Debug, Clone, Copy)]
pub struct PercentChangeColumns<'a> {
    pub base: &'a str,
    pub target: &'a str,
    pub output: &'a str,
}

#[derive(Debug)]
pub struct PercentChangeOutput {
    pub dataframe: DataFrame,
    /// Rows whose base value was zero (dropped or flagged, per policy).
    pub zero_base_rows: usize,
    /// Rows dropped because the base or target value was missing.
    pub missing_value_rows: usize,
    /// Rows dropped because a non-zero base still gave a non-finite change.
    pub non_finite_rows: usize,
}

/// Appends `columns.output` holding the percent change from `columns.base` to
/// `columns.target`. Rows missing either value are dropped.
pub fn apply_percent_change(
    df: &DataFrame,
    columns: PercentChangeColumns<'_>,
    policy: ZeroBasePolicy,
) -> Result<PercentChangeOutput, PolarsError> {
    let base = df.column(columns.base)?.cast(&DataType::Float64)?;
    let base = base.f64()?;
    let target = df.column(columns.target)?.cast(&DataType::Float64)?;
    let target = target.f64()?;

    let len = df.height();
    let mut changes: Vec<Option<f64>> = Vec::with_capacity(len);
    let mut keep: Vec<bool> = Vec::with_capacity(len);
    let mut zero_base_rows = 0usize;
    let mut missing_value_rows = 0usize;
    let mut non_finite_rows = 0usize;

    for idx in 0..len {
        let (Some(a), Some(b)) = (base.get(idx), target.get(idx)) else {
            missing_value_rows += 1;
            changes.push(None);
            keep.push(false);
            continue;
        };

        match percent_change(a, b) {
            Some(change) => {
                changes.push(Some(change));
                keep.push(true);
            }
            None if a == 0.0 => {
                zero_base_rows += 1;
                match policy {
                    ZeroBasePolicy::Exclude => {
                        changes.push(None);
                        keep.push(false);
                    }
                    ZeroBasePolicy::Flag => {
                        changes.push(Some(f64::NAN));
                        keep.push(true);
                    }
                }
            }
            None => {
                non_finite_rows += 1;
                changes.push(None);
                keep.push(false);
            }
        }
    }

    let mut output = df.clone();
    output.with_column(Series::new(columns.output.into(), changes))?;
    let mask = BooleanChunked::from_slice("keep".into(), &keep);
    let dataframe = output.filter(&mask)?;

    debug!(
        column = columns.output,
        rows_in = len,
        rows_out = dataframe.height(),
        zero_base_rows,
        missing_value_rows,
        non_finite_rows,
        "computed percent change"
    );

    Ok(PercentChangeOutput {
        dataframe,
        zero_base_rows,
        missing_value_rows,
        non_finite_rows,
    })
}
