use std::path::Path;

use anyhow::{Context, Result, anyhow};
use log::info;

use crate::{
    cli::{BoundaryMode, InputArgs, TransposeArgs},
    io_utils,
    output::{self, RunSummary},
    source::{self, ReadOptions, TransposeRun},
    transposer::BoundaryRule,
};

pub fn execute(args: &TransposeArgs) -> Result<()> {
    reject_stdout_side_output("--log", args.log.as_deref())?;
    reject_stdout_side_output("--summary", args.summary.as_deref())?;
    let output_encoding = io_utils::resolve_encoding(args.output_encoding.as_deref())?;
    let run = load_run(&args.input)?;

    let output_path = args.output.as_deref();
    let mut writer =
        io_utils::open_csv_writer(output_path, args.output_delimiter, output_encoding)?;
    let written = output::write_wide(&mut writer, &run.output)?;
    info!(
        "Wrote {} record(s) across {} field(s) to {} (delimiter '{}')",
        written,
        run.output.headers().len(),
        output_path
            .filter(|p| !io_utils::is_dash(p))
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "stdout".into()),
        crate::printable_delimiter(args.output_delimiter)
    );

    if let Some(log_path) = &args.log {
        output::write_occurrence_log(log_path, run.output.counts())?;
        info!("Field occurrence log saved to {:?}", log_path);
    }
    if let Some(summary_path) = &args.summary {
        output::write_summary(summary_path, &RunSummary::from_run(&run))?;
        info!("Run summary saved to {:?}", summary_path);
    }
    Ok(())
}

/// Stdout carries the wide table, so side outputs need a real path.
fn reject_stdout_side_output(flag: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) if io_utils::is_dash(path) => Err(anyhow!(
            "{flag} cannot be '-'; stdout is reserved for the wide table"
        )),
        _ => Ok(()),
    }
}

pub fn read_options(args: &InputArgs) -> Result<ReadOptions> {
    let boundary = match args.boundary {
        BoundaryMode::Sentinel => BoundaryRule::Sentinel,
        BoundaryMode::RepeatedField => BoundaryRule::RepeatedField,
        BoundaryMode::IdField => {
            let field = args
                .id_field
                .as_deref()
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .ok_or_else(|| anyhow!("--boundary id-field requires --id-field"))?;
            BoundaryRule::IdField(field.to_string())
        }
    };
    Ok(ReadOptions {
        encoding: io_utils::resolve_encoding(args.input_encoding.as_deref())?,
        delimiter: args.delimiter,
        boundary,
    })
}

/// Transposes every input as one run, loading each only while it is folded.
pub fn load_run(args: &InputArgs) -> Result<TransposeRun> {
    let options = read_options(args)?;
    if args.inputs.iter().filter(|p| io_utils::is_dash(p)).count() > 1 {
        return Err(anyhow!("stdin ('-') can only be used once per run"));
    }
    let run = source::transpose_paths(&args.inputs, &options).with_context(|| {
        format!("Transposing {} input file(s)", args.inputs.len())
    })?;
    info!(
        "Transposed {} record(s) with {} field(s) from {} input(s)",
        run.output.records().len(),
        run.output.headers().len(),
        run.inputs.len()
    );
    Ok(run)
}
