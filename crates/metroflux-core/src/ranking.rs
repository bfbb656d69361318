use std::cmp::Ordering;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const RANK: &str = "rank";

#[derive(Debug, Error)]
pub enum RankingError {
    #[error("polars operation failed: {0}")]
    Polars(#[from] PolarsError),
    #[error("column '{column}' of type {dtype} cannot be used as a sort key")]
    UnsupportedKey { column: String, dtype: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankSpec {
    pub column: String,
    pub direction: SortDirection,
    pub limit: Option<usize>,
    /// Secondary key, always ascending, consulted only when the primary keys tie.
    pub tie_breaker: Option<String>,
}

impl RankSpec {
    pub fn new(column: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            column: column.into(),
            direction,
            limit: None,
            tie_breaker: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_tie_breaker(mut self, column: impl Into<String>) -> Self {
        self.tie_breaker = Some(column.into());
        self
    }
}

/// Sort keys read from one column. Strings compare lexically, numbers by value.
enum SortKeys<'a> {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<&'a str>>),
}

impl SortKeys<'_> {
    fn compare(&self, a: usize, b: usize, direction: SortDirection) -> Ordering {
        match self {
            SortKeys::Numeric(keys) => compare_keys(keys[a], keys[b], direction, f64::total_cmp),
            SortKeys::Text(keys) => compare_keys(keys[a], keys[b], direction, Ord::cmp),
        }
    }
}

fn sort_keys<'a>(df: &'a DataFrame, column: &str) -> Result<SortKeys<'a>, RankingError> {
    let keys = df.column(column)?;
    match keys.dtype() {
        DataType::String => Ok(SortKeys::Text(keys.str()?.into_iter().collect())),
        DataType::Float64
        | DataType::Float32
        | DataType::Int64
        | DataType::Int32
        | DataType::UInt64
        | DataType::UInt32 => {
            let values = keys.cast(&DataType::Float64)?;
            Ok(SortKeys::Numeric(
                values
                    .f64()?
                    .into_iter()
                    .map(|value| value.filter(|v| !v.is_nan()))
                    .collect(),
            ))
        }
        other => Err(RankingError::UnsupportedKey {
            column: column.to_string(),
            dtype: other.to_string(),
        }),
    }
}

/// Missing keys sort after present ones regardless of direction.
fn compare_keys<T>(
    a: Option<T>,
    b: Option<T>,
    direction: SortDirection,
    cmp: impl Fn(&T, &T) -> Ordering,
) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => {
            let ordering = cmp(&a, &b);
            match direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable sort by `spec.column`, truncated to `spec.limit` rows, with a 1-based `rank`
/// column prepended. Ties keep their input order unless a tie breaker is given. Keys must
/// be numeric or string columns.
pub fn rank(df: &DataFrame, spec: &RankSpec) -> Result<DataFrame, RankingError> {
    let primary = sort_keys(df, &spec.column)?;
    let secondary = match &spec.tie_breaker {
        Some(column) => Some(sort_keys(df, column)?),
        None => None,
    };

    let mut order: Vec<usize> = (0..df.height()).collect();
    order.sort_by(|&a, &b| {
        primary
            .compare(a, b, spec.direction)
            .then_with(|| match &secondary {
                Some(keys) => keys.compare(a, b, SortDirection::Ascending),
                None => Ordering::Equal,
            })
    });
    if let Some(limit) = spec.limit {
        order.truncate(limit);
    }

    let indices: Vec<IdxSize> = order.iter().map(|&idx| idx as IdxSize).collect();
    let ranks: Vec<i64> = (1..=indices.len() as i64).collect();

    // re-ranking replaces any earlier rank column
    let source = match df.column(RANK) {
        Ok(_) => df.drop(RANK)?,
        Err(_) => df.clone(),
    };
    let mut ranked = source.take(&IdxCa::from_vec("idx".into(), indices))?;
    ranked.insert_column(0, Series::new(RANK.into(), ranks))?;
    Ok(ranked)
}
