use metroflux_core::percent_change::{
    apply_percent_change, percent_change, PercentChangeColumns, ZeroBasePolicy,
};
use polars::prelude::*;

const COLUMNS: PercentChangeColumns<'static> = PercentChangeColumns {
    base: "value_a",
    target: "value_b",
    output: "percent_change",
};

#[test]
fn doubling_is_one_hundred_percent() {
    assert_eq!(percent_change(150000.0, 300000.0), Some(100.0));
    assert_eq!(percent_change(120000.0, 150000.0), Some(25.0));
    assert_eq!(percent_change(100.0, 50.0), Some(-50.0));
}

#[test]
fn percent_change_is_scale_invariant() {
    let pairs = [(150000.0, 300000.0), (120000.0, 150000.0), (3.5, 2.1), (90.0, 99.0)];
    for (a, b) in pairs {
        let base = percent_change(a, b).unwrap();
        for k in [0.001, 2.0, 1000.0] {
            let scaled = percent_change(a * k, b * k).unwrap();
            assert!((scaled - base).abs() < 1e-9, "{a} -> {b} scaled by {k}");
        }
    }
}

#[test]
fn zero_or_non_finite_inputs_have_no_change() {
    assert_eq!(percent_change(0.0, 10.0), None);
    assert_eq!(percent_change(f64::NAN, 10.0), None);
    assert_eq!(percent_change(10.0, f64::INFINITY), None);
}

#[test]
fn zero_base_rows_are_excluded_by_default() -> PolarsResult<()> {
    let df = df!(
        "region_name" => &["Atlanta, GA", "Zeroville, TX", "Sparse, NM"],
        "value_a" => &[Some(150000.0f64), Some(0.0), None],
        "value_b" => &[Some(300000.0f64), Some(20.0), Some(80000.0)],
    )?;

    let output = apply_percent_change(&df, COLUMNS, ZeroBasePolicy::default())?;
    assert_eq!(output.dataframe.height(), 1);
    assert_eq!(output.zero_base_rows, 1);
    assert_eq!(output.missing_value_rows, 1);

    let change = output.dataframe.column("percent_change")?.f64()?;
    assert_eq!(change.get(0), Some(100.0));
    Ok(())
}

#[test]
fn flag_policy_keeps_zero_base_rows_as_nan() -> PolarsResult<()> {
    let df = df!(
        "region_name" => &["Atlanta, GA", "Zeroville, TX"],
        "value_a" => &[150000.0f64, 0.0],
        "value_b" => &[300000.0f64, 20.0],
    )?;

    let output = apply_percent_change(&df, COLUMNS, ZeroBasePolicy::Flag)?;
    assert_eq!(output.dataframe.height(), 2);
    assert_eq!(output.zero_base_rows, 1);

    let change = output.dataframe.column("percent_change")?.f64()?;
    assert!(change.get(1).unwrap().is_nan());
    Ok(())
}

#[test]
fn overflowing_changes_are_counted_apart_from_missing_values() -> PolarsResult<()> {
    let df = df!(
        "region_name" => &["Tiny", "Sparse, NM", "Atlanta, GA"],
        "value_a" => &[Some(1e-300f64), None, Some(150000.0)],
        "value_b" => &[Some(1e300f64), Some(80000.0), Some(300000.0)],
    )?;

    let output = apply_percent_change(&df, COLUMNS, ZeroBasePolicy::default())?;
    assert_eq!(output.dataframe.height(), 1);
    assert_eq!(output.non_finite_rows, 1);
    assert_eq!(output.missing_value_rows, 1);
    assert_eq!(output.zero_base_rows, 0);
    Ok(())
}
