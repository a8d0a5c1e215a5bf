use std::fmt::Write as _;

/// Cells wider than this are cut and suffixed with `…` in terminal output.
pub const MAX_CELL_WIDTH: usize = 40;

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let header_cells = headers.iter().map(|h| clip(h)).collect::<Vec<_>>();
    let body = rows
        .iter()
        .map(|row| {
            (0..headers.len())
                .map(|idx| clip(row.get(idx).map(String::as_str).unwrap_or("")))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    let mut widths = header_cells
        .iter()
        .map(|h| h.chars().count().max(3))
        .collect::<Vec<_>>();
    for row in &body {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(cell.chars().count());
        }
    }
    let numeric = (0..headers.len())
        .map(|idx| {
            let mut values = body.iter().map(|row| row[idx].as_str()).filter(|v| !v.is_empty());
            let mut any = false;
            let all = values.all(|v| {
                any = true;
                v.parse::<f64>().is_ok()
            });
            any && all
        })
        .collect::<Vec<_>>();

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(&header_cells, &widths, &[]));
    let separator = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&separator, &widths, &[]));
    for row in &body {
        let _ = writeln!(output, "{}", format_row(row, &widths, &numeric));
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

fn format_row(cells: &[String], widths: &[usize], right_align: &[bool]) -> String {
    let line = cells
        .iter()
        .zip(widths.iter().copied())
        .enumerate()
        .map(|(idx, (cell, width))| {
            if right_align.get(idx).copied().unwrap_or(false) {
                format!("{cell:>width$}")
            } else {
                format!("{cell:<width$}")
            }
        })
        .collect::<Vec<_>>()
        .join("  ");
    line.trim_end().to_string()
}

fn clip(value: &str) -> String {
    let flat = value
        .chars()
        .map(|ch| if matches!(ch, '\n' | '\r' | '\t') { ' ' } else { ch })
        .collect::<String>();
    if flat.chars().count() <= MAX_CELL_WIDTH {
        return flat;
    }
    let mut clipped = flat.chars().take(MAX_CELL_WIDTH - 1).collect::<String>();
    clipped.push('…');
    clipped
}
