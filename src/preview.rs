use anyhow::Result;
use log::info;

use crate::{cli::PreviewArgs, table, transpose};

pub fn execute(args: &PreviewArgs) -> Result<()> {
    let run = transpose::load_run(&args.input)?;
    let rows = run
        .output
        .rows()
        .take(args.rows)
        .map(|row| row.into_iter().map(str::to_string).collect::<Vec<_>>())
        .collect::<Vec<_>>();

    table::print_table(run.output.headers(), &rows);
    info!(
        "Displayed {} of {} record(s)",
        rows.len(),
        run.output.records().len()
    );
    Ok(())
}
