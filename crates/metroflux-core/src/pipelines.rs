use metroflux_parser::{IncomeTable, StateScoreTable, WideMetricTable};
use once_cell::sync::Lazy;
use polars::prelude::DataFrame;
use serde::Serialize;
use tracing::info;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::income::prepare_income;
use crate::percent_change::{apply_percent_change, PercentChangeColumns};
use crate::ranking::{rank, RankSpec, SortDirection};
use crate::reshape::wide_to_long;
use crate::scoring::{
    defined_affordability, score_regions, JoinDiagnostics, StateContext, AFFORDABILITY_SCORE,
    HOUSING_PERCENT_CHANGE, SCORE,
};
use crate::snapshot::{extract_snapshot, SnapshotDates};

pub const HOUSING_AFFORDABILITY_V1: &str = "housing_affordability_v1";
pub const COMPOSITE_SCORE_V1: &str = "composite_score_v1";

/// Parsed sources handed to a pipeline run. Read-only; every run builds fresh tables.
#[derive(Debug, Clone)]
pub struct PipelineInputs {
    pub metro: WideMetricTable,
    pub income: Option<IncomeTable>,
    pub state_scores: Option<StateScoreTable>,
}

#[derive(Debug, Clone)]
pub struct NamedTable {
    pub name: &'static str,
    pub dataframe: DataFrame,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IncomeSummary {
    pub rows_in: usize,
    pub rows_out: usize,
    pub excluded_rows: usize,
    pub missing_value_rows: usize,
    pub non_finite_rows: usize,
    pub zero_base_rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineSummary {
    pub pipeline: &'static str,
    pub version: &'static str,
    pub snapshot: SnapshotDates,
    pub metro_regions: usize,
    pub long_rows: usize,
    pub snapshot_regions: usize,
    pub snapshot_dropped_regions: usize,
    pub collapsed_duplicates: usize,
    pub housing_rows: usize,
    pub housing_zero_base_rows: usize,
    pub housing_missing_value_rows: usize,
    pub housing_non_finite_rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub income: Option<IncomeSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join: Option<JoinDiagnostics>,
    pub ranked_rows: usize,
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub tables: Vec<NamedTable>,
    pub summary: PipelineSummary,
}

impl PipelineOutput {
    pub fn table(&self, name: &str) -> Option<&DataFrame> {
        self.tables
            .iter()
            .find(|table| table.name == name)
            .map(|table| &table.dataframe)
    }
}

pub trait ProcessingPipeline: Send + Sync {
    fn code_identifier(&self) -> &'static str;
    fn version(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn requires_income(&self) -> bool {
        false
    }
    fn run(&self, inputs: &PipelineInputs, config: &PipelineConfig) -> Result<PipelineOutput>;
}

#[derive(Debug, Clone)]
pub struct ProcessingPipelineDescriptor {
    pub code: &'static str,
    pub version: &'static str,
    pub requires_income: bool,
    pub description: &'static str,
}

static PIPELINES: Lazy<Vec<ProcessingPipelineDescriptor>> = Lazy::new(|| {
    all_pipelines()
        .iter()
        .map(|pipeline| ProcessingPipelineDescriptor {
            code: pipeline.code_identifier(),
            version: pipeline.version(),
            requires_income: pipeline.requires_income(),
            description: pipeline.description(),
        })
        .collect()
});

pub fn all_pipeline_descriptors() -> &'static [ProcessingPipelineDescriptor] {
    PIPELINES.as_slice()
}

static PIPELINE_IMPLEMENTATIONS: Lazy<Vec<&'static dyn ProcessingPipeline>> = Lazy::new(|| {
    vec![
        &HousingAffordabilityPipeline as &dyn ProcessingPipeline,
        &CompositeScorePipeline as &dyn ProcessingPipeline,
    ]
});

pub fn all_pipelines() -> &'static [&'static dyn ProcessingPipeline] {
    PIPELINE_IMPLEMENTATIONS.as_slice()
}

pub fn find_pipeline(code: &str) -> Result<&'static dyn ProcessingPipeline> {
    all_pipelines()
        .iter()
        .copied()
        .find(|pipeline| pipeline.code_identifier() == code)
        .ok_or_else(|| PipelineError::UnknownPipeline(code.to_string()))
}

/// Housing side shared by both pipelines: long form, snapshot pair, percent change.
struct HousingStage {
    changes: DataFrame,
    long_rows: usize,
    snapshot_regions: usize,
    dropped_regions: usize,
    collapsed_duplicates: usize,
    zero_base_rows: usize,
    missing_value_rows: usize,
    non_finite_rows: usize,
}

fn housing_stage(inputs: &PipelineInputs, config: &PipelineConfig) -> Result<HousingStage> {
    let long = wide_to_long(&inputs.metro)?;
    let snapshot = extract_snapshot(&long, &config.snapshot)?;
    let changed = apply_percent_change(
        &snapshot.dataframe,
        PercentChangeColumns {
            base: "value_a",
            target: "value_b",
            output: "percent_change",
        },
        config.scoring.zero_base_policy,
    )?;

    info!(
        long_rows = long.height(),
        snapshot_regions = snapshot.dataframe.height(),
        dropped_regions = snapshot.dropped_regions,
        housing_rows = changed.dataframe.height(),
        zero_base_rows = changed.zero_base_rows,
        "computed housing percent change"
    );

    Ok(HousingStage {
        long_rows: long.height(),
        snapshot_regions: snapshot.dataframe.height(),
        dropped_regions: snapshot.dropped_regions,
        collapsed_duplicates: snapshot.collapsed_duplicates,
        zero_base_rows: changed.zero_base_rows,
        missing_value_rows: changed.missing_value_rows,
        non_finite_rows: changed.non_finite_rows,
        changes: changed.dataframe,
    })
}

fn base_summary(
    pipeline: &dyn ProcessingPipeline,
    inputs: &PipelineInputs,
    config: &PipelineConfig,
    housing: &HousingStage,
) -> PipelineSummary {
    PipelineSummary {
        pipeline: pipeline.code_identifier(),
        version: pipeline.version(),
        snapshot: config.snapshot,
        metro_regions: inputs.metro.height(),
        long_rows: housing.long_rows,
        snapshot_regions: housing.snapshot_regions,
        snapshot_dropped_regions: housing.dropped_regions,
        collapsed_duplicates: housing.collapsed_duplicates,
        housing_rows: housing.changes.height(),
        housing_zero_base_rows: housing.zero_base_rows,
        housing_missing_value_rows: housing.missing_value_rows,
        housing_non_finite_rows: housing.non_finite_rows,
        income: None,
        join: None,
        ranked_rows: 0,
    }
}

fn most_affordable(changes: &DataFrame, config: &PipelineConfig) -> Result<DataFrame> {
    let spec = RankSpec::new("percent_change", SortDirection::Ascending)
        .with_limit(config.ranking.top_n);
    Ok(rank(changes, &spec)?)
}

/// Ranks regions by home-value growth between the two snapshot dates, lowest first.
pub struct HousingAffordabilityPipeline;

impl ProcessingPipeline for HousingAffordabilityPipeline {
    fn code_identifier(&self) -> &'static str {
        HOUSING_AFFORDABILITY_V1
    }

    fn version(&self) -> &'static str {
        "0.1.0"
    }

    fn description(&self) -> &'static str {
        "Home-value percent change between two snapshot dates, lowest growth first"
    }

    fn run(&self, inputs: &PipelineInputs, config: &PipelineConfig) -> Result<PipelineOutput> {
        config.validate()?;

        let housing = housing_stage(inputs, config)?;
        let ranked = most_affordable(&housing.changes, config)?;

        let mut summary = base_summary(self, inputs, config, &housing);
        summary.ranked_rows = ranked.height();

        Ok(PipelineOutput {
            tables: vec![
                NamedTable {
                    name: "housing_changes",
                    dataframe: housing.changes,
                },
                NamedTable {
                    name: "most_affordable",
                    dataframe: ranked,
                },
            ],
            summary,
        })
    }
}

/// Joins housing and income growth (and optionally state scores) into a weighted
/// composite score, highest first.
pub struct CompositeScorePipeline;

impl ProcessingPipeline for CompositeScorePipeline {
    fn code_identifier(&self) -> &'static str {
        COMPOSITE_SCORE_V1
    }

    fn version(&self) -> &'static str {
        "0.1.0"
    }

    fn description(&self) -> &'static str {
        "Housing and income growth joined by metro name, weighted composite score, highest first"
    }

    fn requires_income(&self) -> bool {
        true
    }

    fn run(&self, inputs: &PipelineInputs, config: &PipelineConfig) -> Result<PipelineOutput> {
        config.validate()?;

        let income_table = inputs
            .income
            .as_ref()
            .ok_or(PipelineError::MissingSource {
                pipeline: COMPOSITE_SCORE_V1,
                source_name: "income",
            })?;

        let housing = housing_stage(inputs, config)?;
        let ranked_housing = most_affordable(&housing.changes, config)?;

        let income = prepare_income(income_table, &config.income, config.scoring.zero_base_policy)?;

        let states = match &inputs.state_scores {
            Some(scores) => Some(StateContext::new(&inputs.metro, scores)?),
            None => None,
        };
        let scored = score_regions(
            &housing.changes,
            &income.dataframe,
            states.as_ref(),
            &config.scoring,
        )?;

        let composite = rank(
            &scored.dataframe,
            &RankSpec::new(SCORE, SortDirection::Descending)
                .with_limit(config.ranking.top_n)
                .with_tie_breaker(HOUSING_PERCENT_CHANGE),
        )?;
        let affordability = rank(
            &defined_affordability(&scored.dataframe)?,
            &RankSpec::new(
                AFFORDABILITY_SCORE,
                config.scoring.affordability_formula.preferred_direction(),
            )
            .with_limit(config.ranking.top_n),
        )?;

        let mut summary = base_summary(self, inputs, config, &housing);
        summary.income = Some(IncomeSummary {
            rows_in: income_table.df.height(),
            rows_out: income.dataframe.height(),
            excluded_rows: income.excluded_rows,
            missing_value_rows: income.missing_value_rows,
            non_finite_rows: income.non_finite_rows,
            zero_base_rows: income.zero_base_rows,
        });
        summary.join = Some(scored.diagnostics);
        summary.ranked_rows = composite.height();

        Ok(PipelineOutput {
            tables: vec![
                NamedTable {
                    name: "housing_changes",
                    dataframe: housing.changes,
                },
                NamedTable {
                    name: "income_changes",
                    dataframe: income.dataframe,
                },
                NamedTable {
                    name: "most_affordable",
                    dataframe: ranked_housing,
                },
                NamedTable {
                    name: "composite_scores",
                    dataframe: composite,
                },
                NamedTable {
                    name: "affordability",
                    dataframe: affordability,
                },
            ],
            summary,
        })
    }
}
