use chrono::NaiveDate;
use csv::StringRecord;
use polars::prelude::*;

use crate::errors::ParserError;

const DATE_HEADER_FORMAT: &str = "%Y-%m-%d";

pub(crate) fn read_records(
    parser: &'static str,
    content: &str,
) -> Result<Vec<StringRecord>, ParserError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    reader
        .records()
        .map(|record| record.map_err(|source| ParserError::Csv { parser, source }))
        .collect()
}

pub fn parse_date_header(parser: &'static str, value: &str) -> Result<NaiveDate, ParserError> {
    let trimmed = value.trim();
    NaiveDate::parse_from_str(trimmed, DATE_HEADER_FORMAT).map_err(|err| {
        ParserError::InvalidHeader {
            parser,
            column: trimmed.to_string(),
            message: format!("expected a YYYY-MM-DD date: {err}"),
        }
    })
}

pub fn format_date_header(date: NaiveDate) -> String {
    date.format(DATE_HEADER_FORMAT).to_string()
}

/// Coerces a raw cell to a number. Blank cells, placeholder tokens such as `(NA)` or
/// `(D)`, and anything else that does not parse become `None` instead of an error.
pub fn parse_numeric_cell(value: &str) -> Option<f64> {
    let trimmed = strip_quotes(value.trim());
    if trimmed.is_empty() {
        return None;
    }

    let cleaned: String = trimmed
        .chars()
        .filter(|ch| *ch != ',' && *ch != '$')
        .collect();

    cleaned.parse::<f64>().ok().filter(|parsed| parsed.is_finite())
}

pub(crate) fn parse_required_i64(
    parser: &'static str,
    value: &str,
    line_index: usize,
    column: &str,
) -> Result<i64, ParserError> {
    strip_quotes(value.trim())
        .parse::<i64>()
        .map_err(|err| ParserError::DataRow {
            parser,
            line_index,
            message: format!("failed to parse column '{column}' as integer: {err}"),
        })
}

pub(crate) fn parse_optional_i64(
    parser: &'static str,
    value: &str,
    line_index: usize,
    column: &str,
) -> Result<Option<i64>, ParserError> {
    let trimmed = strip_quotes(value.trim());
    if trimmed.is_empty() {
        return Ok(None);
    }
    parse_required_i64(parser, trimmed, line_index, column).map(Some)
}

pub(crate) fn clean_optional(value: Option<&str>) -> Option<String> {
    value
        .map(|v| strip_quotes(v.trim()))
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
}

pub(crate) fn find_column(
    parser: &'static str,
    header: &StringRecord,
    name: &str,
) -> Result<usize, ParserError> {
    header
        .iter()
        .position(|field| field.trim() == name)
        .ok_or_else(|| ParserError::MissingColumn {
            parser,
            column: name.to_string(),
        })
}

pub(crate) fn optional_str_series(name: &str, values: &[Option<String>]) -> Series {
    let utf8: Vec<Option<&str>> = values.iter().map(|v| v.as_deref()).collect();
    Series::new(name.into(), utf8)
}

pub(crate) fn build_frame(
    parser: &'static str,
    columns: Vec<Column>,
) -> Result<DataFrame, ParserError> {
    DataFrame::new(columns).map_err(|err| ParserError::Validation {
        parser,
        message: format!("failed to build dataframe: {err}"),
    })
}

fn strip_quotes(value: &str) -> &str {
    value.trim_matches('"').trim()
}
