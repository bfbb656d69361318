use std::collections::HashSet;

use polars::prelude::*;

use super::common::{build_frame, clean_optional, parse_numeric_cell, read_records};
use crate::errors::ParserError;
use crate::model::StateScoreTable;
use crate::registry::SourceParser;

/// Two-column table of state name and numeric score. The header row is optional: the first
/// row is a header only when its first field is a state-column label and its second field
/// is not numeric.
#[derive(Debug, Default, Clone, Copy)]
pub struct StateScoreParser;

const STATE_HEADER_LABELS: [&str; 5] = ["state", "state_name", "state name", "statename", "name"];

impl StateScoreParser {
    pub const NAME: &'static str = "state_scores";
}

fn is_header(record: &csv::StringRecord) -> bool {
    let label = record.get(0).unwrap_or_default().trim().trim_matches('"');
    STATE_HEADER_LABELS
        .iter()
        .any(|candidate| label.eq_ignore_ascii_case(candidate))
        && parse_numeric_cell(record.get(1).unwrap_or_default()).is_none()
}

impl SourceParser for StateScoreParser {
    type Output = StateScoreTable;

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(&self, content: &str) -> Result<StateScoreTable, ParserError> {
        let records = read_records(Self::NAME, content)?;

        let skip = usize::from(records.first().is_some_and(is_header));

        let mut seen: HashSet<String> = HashSet::new();
        let mut states: Vec<String> = Vec::new();
        let mut scores: Vec<Option<f64>> = Vec::new();

        for (offset, record) in records.iter().enumerate().skip(skip) {
            let line_index = offset + 1;
            if record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }
            if record.len() < 2 {
                return Err(ParserError::DataRow {
                    parser: Self::NAME,
                    line_index,
                    message: format!("expected 2 fields, found {}", record.len()),
                });
            }

            let state = clean_optional(record.get(0)).ok_or_else(|| ParserError::DataRow {
                parser: Self::NAME,
                line_index,
                message: "state name is empty".to_string(),
            })?;
            if !seen.insert(state.clone()) {
                return Err(ParserError::Validation {
                    parser: Self::NAME,
                    message: format!("state '{state}' listed more than once"),
                });
            }

            states.push(state);
            scores.push(parse_numeric_cell(record.get(1).unwrap_or_default()));
        }

        if states.is_empty() {
            return Err(ParserError::EmptyData { parser: Self::NAME });
        }

        let df = build_frame(
            Self::NAME,
            vec![
                Series::new("state_name".into(), states).into(),
                Series::new("state_score".into(), scores).into(),
            ],
        )?;
        Ok(StateScoreTable { df })
    }
}
