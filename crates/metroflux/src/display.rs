use anyhow::Result;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use metroflux_core::pipelines::{all_pipeline_descriptors, PipelineSummary};
use metroflux_core::reshape::{days_to_date, SeriesSummary};
use polars::prelude::{AnyValue, DataFrame, DataType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueStyle {
    Currency,
    Percent,
    Plain,
}

fn column_style(name: &str) -> ValueStyle {
    if name.ends_with("percent_change") {
        ValueStyle::Percent
    } else if name == "value"
        || name.starts_with("value_")
        || name.starts_with("home_value")
        || name.starts_with("income_")
    {
        ValueStyle::Currency
    } else {
        ValueStyle::Plain
    }
}

fn with_thousands(whole: u64) -> String {
    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

fn format_currency(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}${}", sign, with_thousands(value.abs().round() as u64))
}

fn format_float(value: f64, style: ValueStyle) -> String {
    if value.is_nan() {
        return "n/a".to_string();
    }
    match style {
        ValueStyle::Currency => format_currency(value),
        ValueStyle::Percent => format!("{:.2}%", value),
        ValueStyle::Plain => format!("{:.2}", value),
    }
}

fn format_value(value: AnyValue<'_>, style: ValueStyle) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::Float64(v) => format_float(v, style),
        AnyValue::Float32(v) => format_float(v as f64, style),
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        AnyValue::Date(days) => days_to_date(days)
            .map(|date| date.to_string())
            .unwrap_or_else(|_| days.to_string()),
        other => other.to_string(),
    }
}

pub fn dataframe_table(df: &DataFrame) -> Result<Table> {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(df.get_column_names_str());

    let styles: Vec<ValueStyle> = df
        .get_columns()
        .iter()
        .map(|column| column_style(column.name()))
        .collect();

    for idx in 0..df.height() {
        let mut row = Vec::with_capacity(df.width());
        for (column, style) in df.get_columns().iter().zip(&styles) {
            let text = format_value(column.get(idx)?, *style);
            let cell = Cell::new(text);
            let numeric = matches!(
                column.dtype(),
                DataType::Float64 | DataType::Float32 | DataType::Int64 | DataType::Int32
            );
            row.push(if numeric {
                cell.set_alignment(CellAlignment::Right)
            } else {
                cell
            });
        }
        table.add_row(row);
    }
    Ok(table)
}

pub fn title(table_name: &str, summary: &PipelineSummary) -> String {
    format!(
        "{} ({} → {})",
        table_name, summary.snapshot.date_a, summary.snapshot.date_b
    )
}

pub fn summary_table(summary: &PipelineSummary) -> Table {
    let mut rows: Vec<(&str, String)> = vec![
        ("pipeline", format!("{} v{}", summary.pipeline, summary.version)),
        ("metro regions", summary.metro_regions.to_string()),
        ("long rows", summary.long_rows.to_string()),
        ("snapshot regions", summary.snapshot_regions.to_string()),
        ("dropped at snapshot", summary.snapshot_dropped_regions.to_string()),
        ("collapsed duplicates", summary.collapsed_duplicates.to_string()),
        ("housing rows", summary.housing_rows.to_string()),
        ("housing zero base", summary.housing_zero_base_rows.to_string()),
        ("housing non-finite", summary.housing_non_finite_rows.to_string()),
    ];
    if let Some(income) = &summary.income {
        rows.push(("income rows", format!("{} → {}", income.rows_in, income.rows_out)));
        rows.push(("income excluded", income.excluded_rows.to_string()));
        rows.push(("income missing values", income.missing_value_rows.to_string()));
        rows.push(("income non-finite", income.non_finite_rows.to_string()));
    }
    if let Some(join) = &summary.join {
        rows.push(("housing unmatched", join.housing_unmatched.to_string()));
        rows.push(("income unmatched", join.income_unmatched.to_string()));
        rows.push(("missing state", join.missing_state.to_string()));
        rows.push(("missing state score", join.missing_state_score.to_string()));
        rows.push(("scored regions", join.output_rows.to_string()));
    }
    rows.push(("ranked rows", summary.ranked_rows.to_string()));

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["metric", "count"]);
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label), Cell::new(value).set_alignment(CellAlignment::Right)]);
    }
    table
}

pub fn series_summary_table(summary: &SeriesSummary) -> Table {
    let currency = |value: Option<f64>| value.map(format_currency).unwrap_or_default();
    let date = |value: Option<chrono::NaiveDate>| value.map(|d| d.to_string()).unwrap_or_default();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["statistic", "value"]);
    table.add_row(vec!["count".to_string(), summary.count.to_string()]);
    table.add_row(vec!["mean".to_string(), currency(summary.mean)]);
    table.add_row(vec!["std".to_string(), currency(summary.std)]);
    table.add_row(vec!["min".to_string(), currency(summary.min)]);
    table.add_row(vec!["max".to_string(), currency(summary.max)]);
    table.add_row(vec!["first date".to_string(), date(summary.first_date)]);
    table.add_row(vec!["last date".to_string(), date(summary.last_date)]);
    table
}

pub fn pipelines_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["code", "version", "needs income", "description"]);
    for descriptor in all_pipeline_descriptors() {
        table.add_row(vec![
            descriptor.code.to_string(),
            descriptor.version.to_string(),
            if descriptor.requires_income { "yes" } else { "no" }.to_string(),
            descriptor.description.to_string(),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_groups_thousands() {
        assert_eq!(format_currency(300000.0), "$300,000");
        assert_eq!(format_currency(1234567.4), "$1,234,567");
        assert_eq!(format_currency(999.0), "$999");
        assert_eq!(format_currency(-4500.0), "-$4,500");
    }

    #[test]
    fn styles_follow_column_names() {
        assert_eq!(column_style("housing_percent_change"), ValueStyle::Percent);
        assert_eq!(column_style("income_percent_change"), ValueStyle::Percent);
        assert_eq!(column_style("home_value_a"), ValueStyle::Currency);
        assert_eq!(column_style("income_2023"), ValueStyle::Currency);
        assert_eq!(column_style("score"), ValueStyle::Plain);
        assert_eq!(format_float(f64::NAN, ValueStyle::Percent), "n/a");
        assert_eq!(format_float(12.5, ValueStyle::Percent), "12.50%");
    }
}
