use std::path::{Path, PathBuf};

use metroflux_core::config::{ConfigError, PipelineConfig};
use metroflux_core::error::PipelineError;
use metroflux_core::ingestion::{load_inputs, SourcePaths};
use metroflux_core::outputs::{write_summary, write_table, write_tables};
use metroflux_core::pipelines::{
    all_pipeline_descriptors, all_pipelines, find_pipeline, PipelineOutput, COMPOSITE_SCORE_V1,
    HOUSING_AFFORDABILITY_V1,
};
use polars::prelude::*;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../metroflux-parser/tests/data")
        .join(name)
}

fn sources(income: bool, states: bool) -> SourcePaths {
    SourcePaths {
        metro: fixture("metro_sample.csv"),
        income: income.then(|| fixture("income_sample.csv")),
        state_scores: states.then(|| fixture("state_scores.csv")),
    }
}

fn run(code: &str, paths: &SourcePaths) -> anyhow::Result<PipelineOutput> {
    let config = PipelineConfig::default();
    let inputs = load_inputs(paths, &config.income)?;
    Ok(find_pipeline(code)?.run(&inputs, &config)?)
}

fn region_names(df: &DataFrame) -> PolarsResult<Vec<String>> {
    Ok(df
        .column("region_name")?
        .str()?
        .into_iter()
        .map(|name| name.unwrap_or_default().to_string())
        .collect())
}

#[test]
fn registry_lists_both_pipelines() -> anyhow::Result<()> {
    let codes: Vec<&str> = all_pipelines().iter().map(|p| p.code_identifier()).collect();
    assert_eq!(codes, vec![HOUSING_AFFORDABILITY_V1, COMPOSITE_SCORE_V1]);

    let descriptors = all_pipeline_descriptors();
    assert_eq!(descriptors.len(), 2);
    assert!(!descriptors[0].requires_income);
    assert!(descriptors[1].requires_income);

    assert!(matches!(
        find_pipeline("standard_v1"),
        Err(PipelineError::UnknownPipeline(code)) if code == "standard_v1"
    ));
    Ok(())
}

#[test]
fn housing_pipeline_ranks_lowest_growth_first() -> anyhow::Result<()> {
    let output = run(HOUSING_AFFORDABILITY_V1, &sources(false, false))?;

    let ranked = output.table("most_affordable").expect("ranking table present");
    assert_eq!(
        region_names(ranked)?,
        vec!["Johnstown, PA", "Lafayette, LA", "United States", "Atlanta, GA"]
    );
    let change = ranked.column("percent_change")?.f64()?;
    assert_eq!(change.get(1), Some(25.0));
    assert_eq!(change.get(3), Some(100.0));

    let summary = &output.summary;
    assert_eq!(summary.metro_regions, 6);
    assert_eq!(summary.long_rows, 18);
    assert_eq!(summary.snapshot_regions, 5);
    assert_eq!(summary.snapshot_dropped_regions, 1);
    assert_eq!(summary.housing_zero_base_rows, 1);
    assert_eq!(summary.housing_rows, 4);
    assert_eq!(summary.ranked_rows, 4);
    assert!(summary.income.is_none());
    assert!(summary.join.is_none());
    Ok(())
}

#[test]
fn composite_pipeline_scores_joined_regions() -> anyhow::Result<()> {
    let output = run(COMPOSITE_SCORE_V1, &sources(true, true))?;

    let income = output.table("income_changes").expect("income table present");
    assert_eq!(
        region_names(income)?,
        vec!["Atlanta, GA", "Lafayette, LA", "Nowhere, ZZ"]
    );

    let composite = output.table("composite_scores").expect("composite table present");
    assert_eq!(region_names(composite)?, vec!["Lafayette, LA", "Atlanta, GA"]);
    let scores = composite.column("score")?.f64()?;
    assert!((scores.get(0).unwrap() - 51.0).abs() < 1e-9);
    assert!((scores.get(1).unwrap() - 33.75).abs() < 1e-9);

    let affordability = output.table("affordability").expect("affordability table present");
    assert_eq!(region_names(affordability)?, vec!["Lafayette, LA", "Atlanta, GA"]);

    let income_summary = output.summary.income.as_ref().expect("income summary");
    assert_eq!(income_summary.rows_in, 5);
    assert_eq!(income_summary.excluded_rows, 1);
    assert_eq!(income_summary.missing_value_rows, 1);
    assert_eq!(income_summary.rows_out, 3);

    let join = output.summary.join.as_ref().expect("join diagnostics");
    assert_eq!(join.housing_unmatched, 2);
    assert_eq!(join.income_unmatched, 1);
    assert_eq!(join.output_rows, 2);
    assert!(join.output_rows <= join.housing_rows.min(join.income_rows));
    Ok(())
}

#[test]
fn composite_pipeline_without_state_scores() -> anyhow::Result<()> {
    let output = run(COMPOSITE_SCORE_V1, &sources(true, false))?;

    let composite = output.table("composite_scores").expect("composite table present");
    assert!(composite.column("state_score").is_err());
    // (100 - 25) * 0.4 + 15 * 0.3 beats (100 - 100) * 0.4 + 40 * 0.3
    assert_eq!(region_names(composite)?, vec!["Lafayette, LA", "Atlanta, GA"]);
    Ok(())
}

#[test]
fn composite_pipeline_requires_income() -> anyhow::Result<()> {
    let config = PipelineConfig::default();
    let inputs = load_inputs(&sources(false, false), &config.income)?;
    let err = find_pipeline(COMPOSITE_SCORE_V1)?
        .run(&inputs, &config)
        .err()
        .expect("missing income fails");

    assert!(matches!(
        err,
        PipelineError::MissingSource {
            source_name: "income",
            ..
        }
    ));
    Ok(())
}

#[test]
fn missing_income_year_is_reported() -> anyhow::Result<()> {
    let mut config = PipelineConfig::default();
    config.income.target_year = "2021".to_string();
    let inputs = load_inputs(&sources(true, false), &config.income)?;

    let err = find_pipeline(COMPOSITE_SCORE_V1)?
        .run(&inputs, &config)
        .err()
        .expect("unknown income year fails");
    assert!(err.to_string().contains("2021"));
    Ok(())
}

#[test]
fn unreadable_sources_name_the_file() {
    let paths = SourcePaths {
        metro: fixture("metro_bad_header.csv"),
        income: None,
        state_scores: None,
    };
    let err = load_inputs(&paths, &PipelineConfig::default().income)
        .err()
        .expect("bad header fails");
    assert!(matches!(
        err,
        PipelineError::Source {
            source_name: "metro",
            parser: "zhvi_wide",
            ..
        }
    ));
    assert!(err.to_string().contains("metro_bad_header.csv"));
    assert!(err.to_string().contains("as zhvi_wide"));

    let missing = SourcePaths {
        metro: fixture("no_such_file.csv"),
        income: None,
        state_scores: None,
    };
    let err = load_inputs(&missing, &PipelineConfig::default().income)
        .err()
        .expect("missing file fails");
    assert!(matches!(err, PipelineError::Io { .. }));
}

#[test]
fn absent_snapshot_date_fails_the_run() -> anyhow::Result<()> {
    let mut config = PipelineConfig::default();
    config.snapshot.date_b = chrono::NaiveDate::from_ymd_opt(2023, 6, 30).unwrap();
    let inputs = load_inputs(&sources(false, false), &config.income)?;

    let err = find_pipeline(HOUSING_AFFORDABILITY_V1)?
        .run(&inputs, &config)
        .err()
        .expect("absent date fails");
    assert!(err.to_string().contains("2023-06-30"));
    Ok(())
}

#[test]
fn outputs_are_written_as_csv_parquet_and_json() -> anyhow::Result<()> {
    let output = run(COMPOSITE_SCORE_V1, &sources(true, true))?;
    let dir = tempfile::tempdir()?;

    let written = write_tables(&output, dir.path(), "csv")?;
    assert_eq!(written.len(), output.tables.len());
    let csv = std::fs::read_to_string(dir.path().join("composite_scores.csv"))?;
    assert!(csv.starts_with("rank,region_name"));
    assert!(csv.contains("Lafayette, LA"));

    let parquet_path = dir.path().join("most_affordable.parquet");
    write_table(
        output.table("most_affordable").expect("ranking table present"),
        &parquet_path,
    )?;
    let reread = ParquetReader::new(std::fs::File::open(&parquet_path)?).finish()?;
    assert_eq!(reread.height(), 4);

    assert!(write_table(&reread, &dir.path().join("table.xlsx")).is_err());

    let summary_path = dir.path().join("summary.json");
    write_summary(&output.summary, &summary_path)?;
    let summary: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&summary_path)?)?;
    assert_eq!(summary["pipeline"], COMPOSITE_SCORE_V1);
    assert_eq!(summary["join"]["output_rows"], 2);
    Ok(())
}

#[test]
fn invalid_config_is_rejected_before_running() -> anyhow::Result<()> {
    let mut config = PipelineConfig::default();
    config.ranking.top_n = 0;
    let inputs = load_inputs(&sources(false, false), &config.income)?;

    let err = find_pipeline(HOUSING_AFFORDABILITY_V1)?
        .run(&inputs, &config)
        .err()
        .expect("zero top_n fails");
    assert!(matches!(err, PipelineError::Config(ConfigError::ZeroTopN)));
    Ok(())
}
