use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::percent_change::ZeroBasePolicy;
use crate::scoring::{AffordabilityFormula, ScoreWeights};
use crate::snapshot::SnapshotDates;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("snapshot date_a ({date_a}) must be earlier than date_b ({date_b})")]
    UnorderedSnapshotDates { date_a: NaiveDate, date_b: NaiveDate },
    #[error("snapshot date {0} does not appear in the metric table")]
    SnapshotDateMissing(NaiveDate),
    #[error("score weights were not provided")]
    MissingWeights,
    #[error("score weight '{name}' must be a finite, non-negative number (got {value})")]
    InvalidWeight { name: &'static str, value: f64 },
    #[error("at least one score weight must be positive")]
    AllWeightsZero,
    #[error("income year '{0}' is not a four-digit year")]
    InvalidIncomeYear(String),
    #[error("income base_year and target_year must differ (both '{0}')")]
    SameIncomeYears(String),
    #[error("income year '{year}' not found; available years: {available:?}")]
    IncomeYearMissing { year: String, available: Vec<String> },
    #[error("ranking top_n must be at least 1")]
    ZeroTopN,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IncomeConfig {
    pub base_year: String,
    pub target_year: String,
    pub skip_rows: Option<usize>,
    pub line_code: Option<String>,
}

impl Default for IncomeConfig {
    fn default() -> Self {
        Self {
            base_year: "2015".to_string(),
            target_year: "2023".to_string(),
            skip_rows: None,
            line_code: None,
        }
    }
}

impl IncomeConfig {
    pub fn base_column(&self) -> String {
        format!("income_{}", self.base_year)
    }

    pub fn target_column(&self) -> String {
        format!("income_{}", self.target_year)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoringConfig {
    pub weights: Option<ScoreWeights>,
    pub affordability_formula: AffordabilityFormula,
    pub zero_base_policy: ZeroBasePolicy,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: Some(ScoreWeights {
                housing: 0.4,
                income: 0.3,
                state: 0.3,
            }),
            affordability_formula: AffordabilityFormula::default(),
            zero_base_policy: ZeroBasePolicy::default(),
        }
    }
}

impl ScoringConfig {
    pub fn require_weights(&self) -> Result<ScoreWeights, ConfigError> {
        let weights = self.weights.ok_or(ConfigError::MissingWeights)?;
        weights.validate()?;
        Ok(weights)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RankingConfig {
    pub top_n: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self { top_n: 10 }
    }
}

/// Everything a pipeline run needs besides the source tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub snapshot: SnapshotDates,
    pub income: IncomeConfig,
    pub scoring: ScoringConfig,
    pub ranking: RankingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            snapshot: SnapshotDates {
                date_a: NaiveDate::from_ymd_opt(2015, 6, 30).expect("valid default date"),
                date_b: NaiveDate::from_ymd_opt(2024, 6, 30).expect("valid default date"),
            },
            income: IncomeConfig::default(),
            scoring: ScoringConfig::default(),
            ranking: RankingConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Checks everything that can be checked without the source tables. Weights are only
    /// validated when present; pipelines that score require them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.snapshot.validate()?;

        for year in [&self.income.base_year, &self.income.target_year] {
            if year.len() != 4 || !year.chars().all(|ch| ch.is_ascii_digit()) {
                return Err(ConfigError::InvalidIncomeYear(year.clone()));
            }
        }
        if self.income.base_year == self.income.target_year {
            return Err(ConfigError::SameIncomeYears(self.income.base_year.clone()));
        }

        if let Some(weights) = &self.scoring.weights {
            weights.validate()?;
            let sum = weights.sum();
            if (sum - 1.0).abs() > 1e-9 {
                warn!(sum, "score weights do not sum to 1");
            }
        }

        if self.ranking.top_n == 0 {
            return Err(ConfigError::ZeroTopN);
        }

        Ok(())
    }
}
