mod bea_income;
mod common;
mod state_scores;
mod zhvi_wide;

pub use bea_income::BeaIncomeParser;
pub use common::{format_date_header, parse_date_header, parse_numeric_cell};
pub use state_scores::StateScoreParser;
pub use zhvi_wide::ZhviWideParser;

pub(crate) use common::{
    build_frame, clean_optional, find_column, optional_str_series, parse_optional_i64,
    parse_required_i64, read_records,
};
