use std::collections::{HashMap, HashSet};

use metroflux_parser::{StateScoreTable, WideMetricTable};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::config::{ConfigError, ScoringConfig};
use crate::income::INCOME_PERCENT_CHANGE;
use crate::percent_change::ZeroBasePolicy;
use crate::ranking::SortDirection;

pub const HOUSING_PERCENT_CHANGE: &str = "housing_percent_change";
pub const AFFORDABILITY_SCORE: &str = "affordability_score";
pub const SCORE: &str = "score";

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("polars operation failed: {0}")]
    Polars(#[from] PolarsError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Weights of the composite score
/// `(100 - housing_pct) * housing + income_pct * income + state_score * state`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoreWeights {
    pub housing: f64,
    pub income: f64,
    pub state: f64,
}

impl ScoreWeights {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("housing", self.housing),
            ("income", self.income),
            ("state", self.state),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight { name, value });
            }
        }
        if self.sum() <= 0.0 {
            return Err(ConfigError::AllWeightsZero);
        }
        Ok(())
    }

    pub fn sum(&self) -> f64 {
        self.housing + self.income + self.state
    }
}

/// How income growth and housing growth combine into a single affordability figure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AffordabilityFormula {
    /// `income_pct - housing_pct`; higher is more affordable.
    #[default]
    IncomeMinusHousing,
    /// `housing_pct / income_pct`; lower is more affordable, undefined for zero income growth.
    HousingOverIncome,
}

impl AffordabilityFormula {
    pub fn code(&self) -> &'static str {
        match self {
            AffordabilityFormula::IncomeMinusHousing => "income_minus_housing",
            AffordabilityFormula::HousingOverIncome => "housing_over_income",
        }
    }

    pub fn apply(&self, housing_pct: f64, income_pct: f64) -> Option<f64> {
        let value = match self {
            AffordabilityFormula::IncomeMinusHousing => income_pct - housing_pct,
            AffordabilityFormula::HousingOverIncome => {
                if income_pct == 0.0 {
                    return None;
                }
                housing_pct / income_pct
            }
        };
        value.is_finite().then_some(value)
    }

    /// Sort order that puts the most affordable regions first.
    pub fn preferred_direction(&self) -> SortDirection {
        match self {
            AffordabilityFormula::IncomeMinusHousing => SortDirection::Descending,
            AffordabilityFormula::HousingOverIncome => SortDirection::Ascending,
        }
    }
}

/// Region → state lookup plus per-state scores for the optional state join.
#[derive(Debug, Clone, Default)]
pub struct StateContext {
    pub region_states: HashMap<String, String>,
    pub state_scores: HashMap<String, f64>,
}

impl StateContext {
    pub fn new(wide: &WideMetricTable, scores: &StateScoreTable) -> Result<Self, PolarsError> {
        Ok(Self {
            region_states: state_lookup(wide)?,
            state_scores: score_map(scores)?,
        })
    }
}

/// Maps each region name in the wide table to its state. When a name repeats, the first
/// row with a state wins.
pub fn state_lookup(wide: &WideMetricTable) -> Result<HashMap<String, String>, PolarsError> {
    let names = wide.df.column("region_name")?.str()?;
    let states = wide.df.column("state_name")?.str()?;

    let mut lookup = HashMap::new();
    for (name, state) in names.into_iter().zip(states) {
        if let (Some(name), Some(state)) = (name, state) {
            lookup
                .entry(name.to_string())
                .or_insert_with(|| state.to_string());
        }
    }
    Ok(lookup)
}

fn score_map(scores: &StateScoreTable) -> Result<HashMap<String, f64>, PolarsError> {
    let states = scores.df.column("state_name")?.str()?;
    let values = scores.df.column("state_score")?.f64()?;

    Ok(states
        .into_iter()
        .zip(values)
        .filter_map(|(state, score)| Some((state?.to_string(), score?)))
        .collect())
}

/// Counts of rows lost at each join step. None of these are errors.
/// `undefined_affordability` rows are kept with a null or `NaN` affordability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JoinDiagnostics {
    pub housing_rows: usize,
    pub income_rows: usize,
    pub housing_unmatched: usize,
    pub income_unmatched: usize,
    pub duplicate_income_names: usize,
    pub missing_state: usize,
    pub missing_state_score: usize,
    pub undefined_affordability: usize,
    pub output_rows: usize,
}

#[derive(Debug)]
pub struct ScoringOutput {
    pub dataframe: DataFrame,
    pub diagnostics: JoinDiagnostics,
}

/// Inner-joins housing and income percent changes on `region_name`, optionally attaches
/// state scores, then appends `affordability_score` and the weighted `score`. A row whose
/// affordability is undefined keeps its score; its affordability is null, or `NaN` under
/// [`ZeroBasePolicy::Flag`].
///
/// `housing` must carry `region_name`, `value_a`, `value_b`, `percent_change`; `income`
/// must carry `region_name` and `income_percent_change`. Other income columns are
/// carried through.
pub fn score_regions(
    housing: &DataFrame,
    income: &DataFrame,
    states: Option<&StateContext>,
    config: &ScoringConfig,
) -> Result<ScoringOutput, ScoringError> {
    let weights = config.require_weights()?;
    let mut diagnostics = JoinDiagnostics {
        housing_rows: housing.height(),
        income_rows: income.height(),
        ..Default::default()
    };

    let mut joined = join_on_region(housing, income, &mut diagnostics)?;
    joined.rename("value_a", "home_value_a".into())?;
    joined.rename("value_b", "home_value_b".into())?;
    joined.rename("percent_change", HOUSING_PERCENT_CHANGE.into())?;

    if let Some(context) = states {
        joined = attach_state_scores(&joined, context, &mut diagnostics)?;
    }

    let dataframe = append_scores(&joined, states.is_some(), &weights, config, &mut diagnostics)?;
    diagnostics.output_rows = dataframe.height();

    info!(
        housing_rows = diagnostics.housing_rows,
        income_rows = diagnostics.income_rows,
        housing_unmatched = diagnostics.housing_unmatched,
        income_unmatched = diagnostics.income_unmatched,
        missing_state = diagnostics.missing_state,
        missing_state_score = diagnostics.missing_state_score,
        output_rows = diagnostics.output_rows,
        formula = config.affordability_formula.code(),
        "scored regions"
    );

    Ok(ScoringOutput {
        dataframe,
        diagnostics,
    })
}

/// Rows of a scored table whose affordability figure is defined. Rows marked undefined
/// under [`ZeroBasePolicy::Exclude`] carry a null and are removed; flagged `NaN` rows stay.
pub fn defined_affordability(scored: &DataFrame) -> Result<DataFrame, PolarsError> {
    let mask = scored.column(AFFORDABILITY_SCORE)?.is_not_null();
    scored.filter(&mask)
}

fn join_on_region(
    housing: &DataFrame,
    income: &DataFrame,
    diagnostics: &mut JoinDiagnostics,
) -> Result<DataFrame, PolarsError> {
    let housing_names = housing.column("region_name")?.str()?;
    let income_names = income.column("region_name")?.str()?;

    let mut income_index: HashMap<&str, usize> = HashMap::new();
    for (idx, name) in income_names.into_iter().enumerate() {
        let Some(name) = name else {
            continue;
        };
        if income_index.contains_key(name) {
            diagnostics.duplicate_income_names += 1;
        } else {
            income_index.insert(name, idx);
        }
    }

    let mut housing_take: Vec<IdxSize> = Vec::new();
    let mut income_take: Vec<IdxSize> = Vec::new();
    let mut matched_income: HashSet<usize> = HashSet::new();

    for (idx, name) in housing_names.into_iter().enumerate() {
        match name.and_then(|name| income_index.get(name)) {
            Some(&income_idx) => {
                housing_take.push(idx as IdxSize);
                income_take.push(income_idx as IdxSize);
                matched_income.insert(income_idx);
            }
            None => diagnostics.housing_unmatched += 1,
        }
    }
    diagnostics.income_unmatched = income_index.len() - matched_income.len();

    let mut joined = housing.take(&IdxCa::from_vec("idx".into(), housing_take))?;
    let income_rows = income
        .take(&IdxCa::from_vec("idx".into(), income_take))?
        .drop("region_name")?;
    joined.hstack_mut(income_rows.get_columns())?;
    Ok(joined)
}

fn attach_state_scores(
    joined: &DataFrame,
    context: &StateContext,
    diagnostics: &mut JoinDiagnostics,
) -> Result<DataFrame, PolarsError> {
    let names = joined.column("region_name")?.str()?;

    let mut state_names: Vec<Option<&str>> = Vec::with_capacity(joined.height());
    let mut state_scores: Vec<Option<f64>> = Vec::with_capacity(joined.height());
    let mut keep: Vec<bool> = Vec::with_capacity(joined.height());

    for name in names {
        let state = name.and_then(|name| context.region_states.get(name));
        let score = state.and_then(|state| context.state_scores.get(state));
        match (state, score) {
            (Some(state), Some(score)) => {
                state_names.push(Some(state.as_str()));
                state_scores.push(Some(*score));
                keep.push(true);
            }
            (Some(state), None) => {
                diagnostics.missing_state_score += 1;
                state_names.push(Some(state.as_str()));
                state_scores.push(None);
                keep.push(false);
            }
            (None, _) => {
                diagnostics.missing_state += 1;
                state_names.push(None);
                state_scores.push(None);
                keep.push(false);
            }
        }
    }

    let mut output = joined.clone();
    output.hstack_mut(&[
        Series::new("state_name".into(), state_names).into(),
        Series::new("state_score".into(), state_scores).into(),
    ])?;
    output.filter(&BooleanChunked::from_slice("keep".into(), &keep))
}

fn append_scores(
    joined: &DataFrame,
    with_state: bool,
    weights: &ScoreWeights,
    config: &ScoringConfig,
    diagnostics: &mut JoinDiagnostics,
) -> Result<DataFrame, PolarsError> {
    let housing_pct = joined.column(HOUSING_PERCENT_CHANGE)?.f64()?;
    let income_pct = joined.column(INCOME_PERCENT_CHANGE)?.f64()?;
    let state_scores = if with_state {
        Some(joined.column("state_score")?.f64()?)
    } else {
        None
    };

    let len = joined.height();
    let mut affordability: Vec<Option<f64>> = Vec::with_capacity(len);
    let mut scores: Vec<Option<f64>> = Vec::with_capacity(len);
    let mut keep: Vec<bool> = Vec::with_capacity(len);

    for idx in 0..len {
        let (Some(h), Some(i)) = (housing_pct.get(idx), income_pct.get(idx)) else {
            affordability.push(None);
            scores.push(None);
            keep.push(false);
            continue;
        };

        let mut score = (100.0 - h) * weights.housing + i * weights.income;
        if let Some(state_scores) = state_scores {
            score += state_scores.get(idx).unwrap_or(f64::NAN) * weights.state;
        }
        scores.push(Some(score));

        keep.push(true);
        match config.affordability_formula.apply(h, i) {
            Some(value) => affordability.push(Some(value)),
            None => {
                diagnostics.undefined_affordability += 1;
                affordability.push(match config.zero_base_policy {
                    ZeroBasePolicy::Exclude => None,
                    ZeroBasePolicy::Flag => Some(f64::NAN),
                });
            }
        }
    }

    let mut output = joined.clone();
    output.hstack_mut(&[
        Series::new(AFFORDABILITY_SCORE.into(), affordability).into(),
        Series::new(SCORE.into(), scores).into(),
    ])?;
    output.filter(&BooleanChunked::from_slice("keep".into(), &keep))
}
