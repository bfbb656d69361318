use std::path::PathBuf;

use anyhow::Result;
use metroflux_core::ingestion::load_source;
use metroflux_core::reshape::{describe_series, region_series, wide_to_long};
use metroflux_parser::formats::ZhviWideParser;

use crate::display;

#[derive(clap::Args, Debug)]
pub struct SeriesArgs {
    /// Wide home-value CSV
    #[arg(long)]
    pub metro: PathBuf,
    /// Region name exactly as it appears in the file
    #[arg(long)]
    pub region: String,
}

pub fn handle_series_command(args: SeriesArgs) -> Result<()> {
    let metro = load_source("metro", &ZhviWideParser, &args.metro)?;
    let long = wide_to_long(&metro)?;
    let series = region_series(&long, &args.region)?;
    let summary = describe_series(&series)?;

    println!("{}", args.region);
    println!("{}", display::dataframe_table(&series)?);
    println!("{}", display::series_summary_table(&summary));
    Ok(())
}
