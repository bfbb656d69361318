use chrono::NaiveDate;
use polars::prelude::*;

use super::common::{
    build_frame, clean_optional, find_column, format_date_header, optional_str_series,
    parse_date_header, parse_numeric_cell, parse_optional_i64, parse_required_i64, read_records,
};
use crate::errors::ParserError;
use crate::model::WideMetricTable;
use crate::registry::SourceParser;

const SOURCE_IDENTIFIERS: [&str; 5] = [
    "RegionID",
    "SizeRank",
    "RegionName",
    "RegionType",
    "StateName",
];

/// Zillow-style wide export: identifier columns followed by one `YYYY-MM-DD` column per month.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZhviWideParser;

impl ZhviWideParser {
    pub const NAME: &'static str = "zhvi_wide";
}

struct DateColumn {
    index: usize,
    date: NaiveDate,
    values: Vec<Option<f64>>,
}

impl SourceParser for ZhviWideParser {
    type Output = WideMetricTable;

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(&self, content: &str) -> Result<WideMetricTable, ParserError> {
        let records = read_records(Self::NAME, content)?;
        let mut rows = records.iter();

        let header = rows.next().ok_or(ParserError::FormatMismatch {
            parser: Self::NAME,
            reason: "file missing header row".to_string(),
        })?;

        let mut identifier_idx = [0usize; 5];
        for (slot, source) in identifier_idx.iter_mut().zip(SOURCE_IDENTIFIERS) {
            *slot = find_column(Self::NAME, header, source)?;
        }

        let mut date_columns: Vec<DateColumn> = Vec::new();
        for (index, field) in header.iter().enumerate() {
            if identifier_idx.contains(&index) {
                continue;
            }
            let date = parse_date_header(Self::NAME, field)?;
            if let Some(previous) = date_columns.last() {
                if date <= previous.date {
                    return Err(ParserError::InvalidHeader {
                        parser: Self::NAME,
                        column: field.trim().to_string(),
                        message: format!("date does not follow preceding column {}", previous.date),
                    });
                }
            }
            date_columns.push(DateColumn {
                index,
                date,
                values: Vec::new(),
            });
        }

        if date_columns.is_empty() {
            return Err(ParserError::FormatMismatch {
                parser: Self::NAME,
                reason: "no date columns after the identifier columns".to_string(),
            });
        }

        let [id_idx, rank_idx, name_idx, type_idx, state_idx] = identifier_idx;

        let mut region_ids: Vec<i64> = Vec::new();
        let mut size_ranks: Vec<Option<i64>> = Vec::new();
        let mut region_names: Vec<Option<String>> = Vec::new();
        let mut region_types: Vec<Option<String>> = Vec::new();
        let mut state_names: Vec<Option<String>> = Vec::new();

        for (row_idx, record) in rows.enumerate() {
            // header occupies line 1
            let line_index = row_idx + 2;
            if record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }

            let field = |idx: usize| record.get(idx).unwrap_or_default();

            region_ids.push(parse_required_i64(
                Self::NAME,
                field(id_idx),
                line_index,
                "RegionID",
            )?);
            size_ranks.push(parse_optional_i64(
                Self::NAME,
                field(rank_idx),
                line_index,
                "SizeRank",
            )?);

            let region_name = clean_optional(record.get(name_idx)).ok_or_else(|| {
                ParserError::DataRow {
                    parser: Self::NAME,
                    line_index,
                    message: "RegionName is empty".to_string(),
                }
            })?;
            region_names.push(Some(region_name));
            region_types.push(clean_optional(record.get(type_idx)));
            state_names.push(clean_optional(record.get(state_idx)));

            for column in &mut date_columns {
                column.values.push(parse_numeric_cell(field(column.index)));
            }
        }

        if region_ids.is_empty() {
            return Err(ParserError::EmptyData { parser: Self::NAME });
        }

        let mut columns: Vec<Column> = vec![
            Series::new("region_id".into(), region_ids).into(),
            Series::new("size_rank".into(), size_ranks).into(),
            optional_str_series("region_name", &region_names).into(),
            optional_str_series("region_type", &region_types).into(),
            optional_str_series("state_name", &state_names).into(),
        ];
        for column in date_columns {
            let name = format_date_header(column.date);
            columns.push(Series::new(name.as_str().into(), column.values).into());
        }

        let df = build_frame(Self::NAME, columns)?;
        WideMetricTable::from_dataframe(df)
    }
}
