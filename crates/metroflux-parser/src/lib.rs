pub mod errors;
pub mod formats;
pub mod model;
mod registry;

pub use errors::ParserError;
pub use model::{IncomeTable, StateScoreTable, WideMetricTable, IDENTIFIER_COLUMNS};
pub use registry::{
    parse_income_file, parse_metro_file, parse_state_scores_file, SourceParser,
};
