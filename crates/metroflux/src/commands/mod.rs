pub mod run;
pub mod series;
