use crate::errors::ParserError;
use crate::formats::{BeaIncomeParser, StateScoreParser, ZhviWideParser};
use crate::model::{IncomeTable, StateScoreTable, WideMetricTable};

pub trait SourceParser {
    type Output;

    fn name(&self) -> &'static str;
    fn parse(&self, content: &str) -> Result<Self::Output, ParserError>;
}

pub fn parse_metro_file(content: &str) -> Result<WideMetricTable, ParserError> {
    ZhviWideParser.parse(content)
}

pub fn parse_income_file(content: &str) -> Result<IncomeTable, ParserError> {
    BeaIncomeParser::default().parse(content)
}

pub fn parse_state_scores_file(content: &str) -> Result<StateScoreTable, ParserError> {
    StateScoreParser.parse(content)
}
