use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use polars::io::parquet::write::{ParquetCompression, ParquetWriter, StatisticsOptions};
use polars::prelude::{CsvWriter, DataFrame, SerWriter};
use tracing::info;

use crate::pipelines::{PipelineOutput, PipelineSummary};

/// Writes `df` as Parquet or CSV depending on the file extension.
pub fn write_table(df: &DataFrame, path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    let mut file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut clone = df.clone();

    match extension.as_deref() {
        Some("parquet") => {
            ParquetWriter::new(&mut file)
                .with_compression(ParquetCompression::Zstd(None))
                .with_statistics(StatisticsOptions::default())
                .finish(&mut clone)
                .with_context(|| format!("failed to write parquet to {}", path.display()))?;
        }
        Some("csv") => {
            CsvWriter::new(&mut file)
                .include_header(true)
                .finish(&mut clone)
                .with_context(|| format!("failed to write csv to {}", path.display()))?;
        }
        other => {
            return Err(anyhow!(
                "unsupported output extension {:?} for {}; use .csv or .parquet",
                other,
                path.display()
            ))
        }
    }

    info!(path = %path.display(), rows = df.height(), "wrote table");
    Ok(())
}

/// Writes every table of a run into `dir` as `<table>.<extension>`.
pub fn write_tables(output: &PipelineOutput, dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let mut written = Vec::with_capacity(output.tables.len());
    for table in &output.tables {
        let path = dir.join(format!("{}.{}", table.name, extension));
        write_table(&table.dataframe, &path)?;
        written.push(path);
    }
    Ok(written)
}

pub fn write_summary(summary: &PipelineSummary, path: &Path) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(summary).context("failed to serialize run summary")?;
    fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
