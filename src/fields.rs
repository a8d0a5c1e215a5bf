//! Field listing: every discovered field with its schema position and how
//! many rows named it, most common first.

use anyhow::Result;
use log::info;

use crate::{cli::FieldsArgs, table, transpose, transposer::TransposeOutput};

pub fn execute(args: &FieldsArgs) -> Result<()> {
    let run = transpose::load_run(&args.input)?;
    let rows = field_rows(&run.output, args.top);
    let headers = vec![
        "#".to_string(),
        "field".to_string(),
        "occurrences".to_string(),
        "percent".to_string(),
    ];
    table::print_table(&headers, &rows);
    info!(
        "Listed {} of {} field(s)",
        rows.len(),
        run.output.headers().len()
    );
    Ok(())
}

pub fn field_rows(output: &TransposeOutput, top: usize) -> Vec<Vec<String>> {
    let counts = output.counts();
    let total = counts.total();
    let mut items = counts.most_common();
    if top > 0 && items.len() > top {
        items.truncate(top);
    }
    items
        .into_iter()
        .map(|(field, count)| {
            let position = output
                .schema()
                .position(field)
                .map(|idx| (idx + 1).to_string())
                .unwrap_or_default();
            let percent = if total > 0 {
                (count as f64 / total as f64) * 100.0
            } else {
                0.0
            };
            vec![
                position,
                field.to_string(),
                count.to_string(),
                format!("{percent:.2}%"),
            ]
        })
        .collect()
}
