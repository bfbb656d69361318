pub mod config;
pub mod error;
pub mod income;
pub mod ingestion;
pub mod outputs;
pub mod percent_change;
pub mod pipelines;
pub mod ranking;
pub mod region_names;
pub mod reshape;
pub mod scoring;
pub mod snapshot;
