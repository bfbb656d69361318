use metroflux_core::region_names::{normalize_region_name, normalize_region_names};
use polars::prelude::*;

#[test]
fn parenthesized_descriptors_are_stripped() {
    assert_eq!(
        normalize_region_name("Johnstown (Metropolitan Statistical Area)").as_deref(),
        Some("Johnstown")
    );
    assert_eq!(
        normalize_region_name("Atlanta, GA (Metropolitan Statistical Area)").as_deref(),
        Some("Atlanta, GA")
    );
    assert_eq!(
        normalize_region_name("  Lafayette, LA  ").as_deref(),
        Some("Lafayette, LA")
    );
    assert_eq!(
        normalize_region_name("Macon, GA (Metropolitan Statistical Area) *").as_deref(),
        Some("Macon, GA")
    );
}

#[test]
fn national_aggregate_and_blank_names_are_excluded() {
    assert_eq!(normalize_region_name("United States (Metropolitan Portion)"), None);
    assert_eq!(normalize_region_name("United States"), None);
    assert_eq!(normalize_region_name("   "), None);
    assert_eq!(normalize_region_name("(Metropolitan Statistical Area)"), None);
}

#[test]
fn normalization_is_idempotent() {
    let raw = [
        "Johnstown (Metropolitan Statistical Area)",
        "Atlanta, GA",
        "Winston-Salem, NC (Metropolitan Statistical Area) (Note)",
        "Odd (name) here",
        "Unbalanced)",
    ];
    for name in raw {
        let once = normalize_region_name(name);
        let twice = once.as_deref().and_then(normalize_region_name);
        assert_eq!(once, twice, "{name}");
    }
}

#[test]
fn frame_normalization_counts_excluded_rows() -> PolarsResult<()> {
    let df = df!(
        "region_name" => &[
            Some("United States (Metropolitan Portion)"),
            Some("Johnstown (Metropolitan Statistical Area)"),
            None,
        ],
        "income_2015" => &[48940.0f64, 38000.0, 1.0],
    )?;

    let output = normalize_region_names(&df, "region_name")?;
    assert_eq!(output.excluded_rows, 2);
    assert_eq!(output.dataframe.height(), 1);
    let names = output.dataframe.column("region_name")?.str()?;
    assert_eq!(names.get(0), Some("Johnstown"));
    Ok(())
}
