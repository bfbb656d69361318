use polars::prelude::*;
use tracing::debug;

/// Name of the national aggregate row, which is never joined against metro areas.
pub const NATIONAL_AGGREGATE: &str = "United States";

/// Canonical join key for a region name: trailing parenthesized descriptors and footnote
/// markers stripped, surrounding whitespace trimmed. Returns `None` for the national
/// aggregate and for names that are empty once stripped.
///
/// `"Johnstown (Metropolitan Statistical Area)"` becomes `"Johnstown"`, while
/// `"Atlanta, GA"` is returned unchanged.
pub fn normalize_region_name(raw: &str) -> Option<String> {
    let mut current = raw.trim();
    loop {
        let before = current;
        current = current.trim_end_matches('*').trim();
        if let Some(stripped) = strip_trailing_group(current) {
            current = stripped.trim();
        }
        if current == before {
            break;
        }
    }

    if current.is_empty() || current.eq_ignore_ascii_case(NATIONAL_AGGREGATE) {
        return None;
    }
    Some(current.to_string())
}

/// Removes one balanced `( ... )` group at the end of `value`, if there is one.
fn strip_trailing_group(value: &str) -> Option<&str> {
    if !value.ends_with(')') {
        return None;
    }
    let mut depth = 0usize;
    for (idx, ch) in value.char_indices().rev() {
        match ch {
            ')' => depth += 1,
            '(' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&value[..idx]);
                }
            }
            _ => {}
        }
    }
    None
}

#[derive(Debug)]
pub struct NormalizeOutput {
    pub dataframe: DataFrame,
    /// Rows removed because their name was the national aggregate or blank.
    pub excluded_rows: usize,
}

/// Rewrites `column` with normalized names and drops rows whose name is excluded.
pub fn normalize_region_names(df: &DataFrame, column: &str) -> Result<NormalizeOutput, PolarsError> {
    let names = df.column(column)?.str()?;

    let normalized: Vec<Option<String>> = names
        .into_iter()
        .map(|name| name.and_then(normalize_region_name))
        .collect();
    let keep: Vec<bool> = normalized.iter().map(Option::is_some).collect();
    let excluded_rows = keep.iter().filter(|kept| !**kept).count();

    let utf8: Vec<Option<&str>> = normalized.iter().map(|v| v.as_deref()).collect();
    let mut output = df.clone();
    output.with_column(Series::new(column.into(), utf8))?;
    let dataframe = output.filter(&BooleanChunked::from_slice("keep".into(), &keep))?;

    debug!(
        column,
        rows_in = df.height(),
        excluded_rows,
        "normalized region names"
    );

    Ok(NormalizeOutput {
        dataframe,
        excluded_rows,
    })
}
