//! Serialization of a finished run: the wide table, the field occurrence
//! log, and the JSON run summary.

use std::{fs::File, io::Write, path::Path};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::{
    io_utils, printable_delimiter,
    source::TransposeRun,
    transposer::{FieldCounts, TransposeOutput},
};

pub const LOG_HEADERS: [&str; 2] = ["field", "occurrences"];

/// Writes the header and every record; returns the number of data rows.
pub fn write_wide<W: Write>(writer: &mut csv::Writer<W>, output: &TransposeOutput) -> Result<usize> {
    writer
        .write_record(output.headers())
        .context("Writing output headers")?;
    let mut written = 0usize;
    for row in output.rows() {
        writer
            .write_record(&row)
            .with_context(|| format!("Writing record {}", written + 1))?;
        written += 1;
    }
    writer.flush().context("Flushing output")?;
    Ok(written)
}

pub fn write_occurrences<W: Write>(writer: &mut csv::Writer<W>, counts: &FieldCounts) -> Result<()> {
    writer.write_record(LOG_HEADERS)?;
    for (field, count) in counts.most_common() {
        writer.write_record([field, count.to_string().as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes the `field,occurrences` log, creating its directory when needed.
pub fn write_occurrence_log(path: &Path, counts: &FieldCounts) -> Result<()> {
    io_utils::ensure_parent_dir(path)?;
    let file = File::create(path).with_context(|| format!("Creating log file {path:?}"))?;
    let mut writer = io_utils::csv_writer(file, b',');
    write_occurrences(&mut writer, counts)
        .with_context(|| format!("Writing occurrence log {path:?}"))
}

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub status: &'static str,
    pub inputs: Vec<InputSummary>,
    pub fields: Vec<String>,
    pub records_count: usize,
}

#[derive(Debug, Serialize)]
pub struct InputSummary {
    pub name: String,
    pub delimiter: String,
    pub detection: &'static str,
    pub rows: usize,
}

impl RunSummary {
    pub fn from_run(run: &TransposeRun) -> Self {
        Self {
            status: "processed",
            inputs: run
                .inputs
                .iter()
                .map(|input| InputSummary {
                    name: input.name.clone(),
                    delimiter: printable_delimiter(input.delimiter),
                    detection: input.method.map(|m| m.as_str()).unwrap_or("configured"),
                    rows: input.rows,
                })
                .collect(),
            fields: run.output.headers().to_vec(),
            records_count: run.output.records().len(),
        }
    }
}

pub fn write_summary(path: &Path, summary: &RunSummary) -> Result<()> {
    io_utils::ensure_parent_dir(path)?;
    let file = File::create(path).with_context(|| format!("Creating summary file {path:?}"))?;
    serde_json::to_writer_pretty(file, summary)
        .with_context(|| format!("Writing summary {path:?}"))
}
