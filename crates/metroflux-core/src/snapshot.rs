use std::collections::HashMap;

use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::ConfigError;
use crate::reshape::{date_days, date_to_days};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("polars operation failed: {0}")]
    Polars(#[from] PolarsError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// The before/after dates compared by a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnapshotDates {
    pub date_a: NaiveDate,
    pub date_b: NaiveDate,
}

impl SnapshotDates {
    pub fn new(date_a: NaiveDate, date_b: NaiveDate) -> Result<Self, ConfigError> {
        let dates = Self { date_a, date_b };
        dates.validate()?;
        Ok(dates)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.date_a >= self.date_b {
            return Err(ConfigError::UnorderedSnapshotDates {
                date_a: self.date_a,
                date_b: self.date_b,
            });
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct SnapshotOutput {
    /// `region_name`, `value_a`, `value_b`; both values present.
    pub dataframe: DataFrame,
    /// Regions with no usable value at one or both dates.
    pub dropped_regions: usize,
    /// Extra rows folded into a mean because several rows shared a region and date.
    pub collapsed_duplicates: usize,
}

#[derive(Default)]
struct DateAccumulator {
    rows: usize,
    sum: f64,
    present: usize,
}

impl DateAccumulator {
    fn push(&mut self, value: Option<f64>) {
        self.rows += 1;
        if let Some(value) = value {
            self.sum += value;
            self.present += 1;
        }
    }

    fn mean(&self) -> Option<f64> {
        (self.present > 0).then(|| self.sum / self.present as f64)
    }

    fn collapsed(&self) -> usize {
        self.rows.saturating_sub(1)
    }
}

/// Pivots the long table into one row per region holding the values at `date_a` and
/// `date_b`. Rows sharing a region name and date are averaged. Regions appear in the order
/// they are first seen.
pub fn extract_snapshot(
    long: &DataFrame,
    dates: &SnapshotDates,
) -> Result<SnapshotOutput, SnapshotError> {
    dates.validate()?;

    let day_a = date_to_days(dates.date_a);
    let day_b = date_to_days(dates.date_b);

    let names = long.column("region_name")?.str()?;
    let days = date_days(long, "date")?;
    let values = long.column("value")?.f64()?;

    let mut seen_a = false;
    let mut seen_b = false;
    let mut order: Vec<&str> = Vec::new();
    let mut per_region: HashMap<&str, (DateAccumulator, DateAccumulator)> = HashMap::new();

    for idx in 0..long.height() {
        let Some(day) = days.get(idx) else {
            continue;
        };
        let is_a = day == day_a;
        let is_b = day == day_b;
        if !is_a && !is_b {
            continue;
        }
        seen_a |= is_a;
        seen_b |= is_b;

        let Some(name) = names.get(idx) else {
            continue;
        };
        let entry = per_region.entry(name).or_insert_with(|| {
            order.push(name);
            Default::default()
        });
        if is_a {
            entry.0.push(values.get(idx));
        } else {
            entry.1.push(values.get(idx));
        }
    }

    if !seen_a {
        return Err(ConfigError::SnapshotDateMissing(dates.date_a).into());
    }
    if !seen_b {
        return Err(ConfigError::SnapshotDateMissing(dates.date_b).into());
    }

    let mut out_names: Vec<&str> = Vec::with_capacity(order.len());
    let mut out_a: Vec<f64> = Vec::with_capacity(order.len());
    let mut out_b: Vec<f64> = Vec::with_capacity(order.len());
    let mut dropped_regions = 0usize;
    let mut collapsed_duplicates = 0usize;

    for name in order {
        let Some((acc_a, acc_b)) = per_region.get(name) else {
            continue;
        };
        collapsed_duplicates += acc_a.collapsed() + acc_b.collapsed();
        match (acc_a.mean(), acc_b.mean()) {
            (Some(a), Some(b)) => {
                out_names.push(name);
                out_a.push(a);
                out_b.push(b);
            }
            _ => dropped_regions += 1,
        }
    }

    let dataframe = DataFrame::new(vec![
        Series::new("region_name".into(), out_names).into(),
        Series::new("value_a".into(), out_a).into(),
        Series::new("value_b".into(), out_b).into(),
    ])?;

    debug!(
        date_a = %dates.date_a,
        date_b = %dates.date_b,
        regions = dataframe.height(),
        dropped_regions,
        collapsed_duplicates,
        "extracted snapshot pair"
    );

    Ok(SnapshotOutput {
        dataframe,
        dropped_regions,
        collapsed_duplicates,
    })
}
