use csv::StringRecord;
use polars::prelude::*;

use super::common::{
    build_frame, clean_optional, find_column, optional_str_series, parse_numeric_cell,
    read_records,
};
use crate::errors::ParserError;
use crate::model::IncomeTable;
use crate::registry::SourceParser;

/// BEA regional income export. Descriptive rows precede the header row; trailing note
/// rows carry fewer fields than the header and end the table.
#[derive(Debug, Default, Clone)]
pub struct BeaIncomeParser {
    /// Number of leading rows before the header. When unset, the first row containing a
    /// `GeoName` field is taken as the header.
    pub skip_rows: Option<usize>,
    /// Keep only rows whose `LineCode` matches, for exports that stack several measures.
    pub line_code: Option<String>,
}

impl BeaIncomeParser {
    pub const NAME: &'static str = "bea_income";

    fn locate_header(&self, records: &[StringRecord]) -> Result<usize, ParserError> {
        match self.skip_rows {
            Some(skip) if skip < records.len() => Ok(skip),
            Some(skip) => Err(ParserError::FormatMismatch {
                parser: Self::NAME,
                reason: format!("skip_rows {skip} is past the end of a {}-row file", records.len()),
            }),
            None => records
                .iter()
                .position(|record| record.iter().any(|field| field.trim() == "GeoName"))
                .ok_or_else(|| ParserError::MissingColumn {
                    parser: Self::NAME,
                    column: "GeoName".to_string(),
                }),
        }
    }
}

fn is_year_header(field: &str) -> bool {
    let trimmed = field.trim();
    trimmed.len() == 4 && trimmed.chars().all(|ch| ch.is_ascii_digit())
}

impl SourceParser for BeaIncomeParser {
    type Output = IncomeTable;

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(&self, content: &str) -> Result<IncomeTable, ParserError> {
        let records = read_records(Self::NAME, content)?;
        let header_idx = self.locate_header(&records)?;
        let header = &records[header_idx];

        let name_idx = find_column(Self::NAME, header, "GeoName")?;
        let fips_idx = header.iter().position(|field| field.trim() == "GeoFips");
        let line_code_idx = match &self.line_code {
            Some(_) => Some(find_column(Self::NAME, header, "LineCode")?),
            None => None,
        };

        let year_columns: Vec<(usize, String)> = header
            .iter()
            .enumerate()
            .filter(|(_, field)| is_year_header(field))
            .map(|(idx, field)| (idx, field.trim().to_string()))
            .collect();
        if year_columns.is_empty() {
            return Err(ParserError::FormatMismatch {
                parser: Self::NAME,
                reason: "header row has no year columns".to_string(),
            });
        }

        let mut fips: Vec<Option<String>> = Vec::new();
        let mut names: Vec<Option<String>> = Vec::new();
        let mut values: Vec<Vec<Option<f64>>> = vec![Vec::new(); year_columns.len()];

        for (offset, record) in records.iter().enumerate().skip(header_idx + 1) {
            let line_index = offset + 1;
            if record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }
            if record.len() < header.len() {
                break;
            }

            if let (Some(idx), Some(expected)) = (line_code_idx, self.line_code.as_deref()) {
                if record.get(idx).map(str::trim) != Some(expected.trim()) {
                    continue;
                }
            }

            let name = clean_optional(record.get(name_idx)).ok_or_else(|| {
                ParserError::DataRow {
                    parser: Self::NAME,
                    line_index,
                    message: "GeoName is empty".to_string(),
                }
            })?;

            names.push(Some(name));
            fips.push(fips_idx.and_then(|idx| clean_optional(record.get(idx))));
            for (slot, (idx, _)) in values.iter_mut().zip(&year_columns) {
                slot.push(parse_numeric_cell(record.get(*idx).unwrap_or_default()));
            }
        }

        if names.is_empty() {
            return Err(ParserError::EmptyData { parser: Self::NAME });
        }

        let mut columns: Vec<Column> = vec![
            optional_str_series("geo_fips", &fips).into(),
            optional_str_series("region_name", &names).into(),
        ];
        let mut years = Vec::with_capacity(year_columns.len());
        for ((_, year), column_values) in year_columns.into_iter().zip(values) {
            columns.push(Series::new(year.as_str().into(), column_values).into());
            years.push(year);
        }

        let df = build_frame(Self::NAME, columns)?;
        Ok(IncomeTable { df, years })
    }
}
