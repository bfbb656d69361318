use metroflux_core::ranking::{rank, RankSpec, RankingError, SortDirection, RANK};
use polars::prelude::*;

fn names(df: &DataFrame) -> PolarsResult<Vec<String>> {
    Ok(df
        .column("region_name")?
        .str()?
        .into_iter()
        .map(|name| name.unwrap_or_default().to_string())
        .collect())
}

#[test]
fn lowest_growth_ranks_first_ascending() -> anyhow::Result<()> {
    let df = df!(
        "region_name" => &["Atlanta, GA", "Lafayette, LA"],
        "percent_change" => &[100.0f64, 25.0],
    )?;

    let ranked = rank(&df, &RankSpec::new("percent_change", SortDirection::Ascending))?;
    assert_eq!(names(&ranked)?, vec!["Lafayette, LA", "Atlanta, GA"]);

    let ranks: Vec<Option<i64>> = ranked.column(RANK)?.i64()?.into_iter().collect();
    assert_eq!(ranks, vec![Some(1), Some(2)]);
    assert_eq!(ranked.get_column_names_str()[0], RANK);
    Ok(())
}

#[test]
fn ties_keep_input_order() -> anyhow::Result<()> {
    let df = df!(
        "region_name" => &["a", "b", "c", "d", "e"],
        "score" => &[5.0f64, 7.0, 5.0, 7.0, 5.0],
    )?;

    let ascending = rank(&df, &RankSpec::new("score", SortDirection::Ascending))?;
    assert_eq!(names(&ascending)?, vec!["a", "c", "e", "b", "d"]);

    let descending = rank(&df, &RankSpec::new("score", SortDirection::Descending))?;
    assert_eq!(names(&descending)?, vec!["b", "d", "a", "c", "e"]);
    Ok(())
}

#[test]
fn missing_and_nan_keys_sort_last_in_both_directions() -> anyhow::Result<()> {
    let df = df!(
        "region_name" => &["nan", "high", "null", "low"],
        "score" => &[Some(f64::NAN), Some(9.0), None, Some(1.0)],
    )?;

    let ascending = rank(&df, &RankSpec::new("score", SortDirection::Ascending))?;
    assert_eq!(names(&ascending)?, vec!["low", "high", "nan", "null"]);

    let descending = rank(&df, &RankSpec::new("score", SortDirection::Descending))?;
    assert_eq!(names(&descending)?, vec!["high", "low", "nan", "null"]);
    Ok(())
}

#[test]
fn tie_breaker_orders_equal_keys() -> anyhow::Result<()> {
    let df = df!(
        "region_name" => &["a", "b", "c"],
        "score" => &[10.0f64, 10.0, 3.0],
        "housing_percent_change" => &[40.0f64, 20.0, 5.0],
    )?;

    let spec = RankSpec::new("score", SortDirection::Descending)
        .with_tie_breaker("housing_percent_change");
    assert_eq!(names(&rank(&df, &spec)?)?, vec!["b", "a", "c"]);
    Ok(())
}

#[test]
fn string_tie_breaker_compares_lexically() -> anyhow::Result<()> {
    let df = df!(
        "region_name" => &["b", "a", "c"],
        "score" => &[10.0f64, 10.0, 3.0],
    )?;

    let spec = RankSpec::new("score", SortDirection::Descending).with_tie_breaker("region_name");
    assert_eq!(names(&rank(&df, &spec)?)?, vec!["a", "b", "c"]);

    let by_name = rank(&df, &RankSpec::new("region_name", SortDirection::Descending))?;
    assert_eq!(names(&by_name)?, vec!["c", "b", "a"]);
    Ok(())
}

#[test]
fn non_sortable_key_columns_are_rejected() -> anyhow::Result<()> {
    let df = df!(
        "region_name" => &["a", "b"],
        "flagged" => &[true, false],
    )?;

    let missing = RankSpec::new("score", SortDirection::Ascending).with_tie_breaker("flagged");
    let err = rank(&df, &missing).unwrap_err();
    assert!(matches!(err, RankingError::Polars(_)), "missing column");

    let err = rank(&df, &RankSpec::new("flagged", SortDirection::Ascending)).unwrap_err();
    match err {
        RankingError::UnsupportedKey { column, .. } => assert_eq!(column, "flagged"),
        other => panic!("unexpected error: {other}"),
    }
    Ok(())
}

#[test]
fn limit_truncates_and_reranking_replaces_rank() -> anyhow::Result<()> {
    let df = df!(
        "region_name" => &["a", "b", "c", "d"],
        "score" => &[4.0f64, 3.0, 2.0, 1.0],
    )?;

    let top = rank(&df, &RankSpec::new("score", SortDirection::Descending).with_limit(2))?;
    assert_eq!(names(&top)?, vec!["a", "b"]);

    let reranked = rank(&top, &RankSpec::new("score", SortDirection::Ascending))?;
    assert_eq!(names(&reranked)?, vec!["b", "a"]);
    assert_eq!(reranked.width(), 3);

    let oversized = rank(&df, &RankSpec::new("score", SortDirection::Ascending).with_limit(10))?;
    assert_eq!(oversized.height(), 4);
    Ok(())
}
