//! Delimiter detection for long-format key/value inputs.
//!
//! Each input is sampled (first [`SAMPLE_BYTES`] bytes) and every candidate
//! delimiter is scored by how consistently it splits the sample lines. When no
//! candidate is consistent enough the first line decides between `;` and `,`.

use std::collections::HashMap;

use log::debug;

pub const SAMPLE_BYTES: usize = 8192;
pub const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

const MIN_CONSISTENCY: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SniffMethod {
    Detected,
    Fallback,
}

impl SniffMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            SniffMethod::Detected => "detected",
            SniffMethod::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sniffed {
    pub delimiter: u8,
    pub method: SniffMethod,
}

/// Picks the delimiter separating field and value in `text`. Never fails.
pub fn sniff_delimiter(text: &str) -> Sniffed {
    let sample = sample_window(text);
    let truncated = sample.len() < text.len();
    match detect_in_sample(sample, truncated) {
        Some(delimiter) => Sniffed {
            delimiter,
            method: SniffMethod::Detected,
        },
        None => {
            let first_line = text.lines().next().unwrap_or("");
            let delimiter = fallback_delimiter(first_line);
            debug!(
                "Delimiter detection inconclusive; first line favours '{}'",
                delimiter as char
            );
            Sniffed {
                delimiter,
                method: SniffMethod::Fallback,
            }
        }
    }
}

/// Statistical detection over a complete sample. Returns `None` when no
/// candidate splits at least 90% of the lines into the same number of pieces.
pub fn detect_delimiter(sample: &str) -> Option<u8> {
    detect_in_sample(sample, false)
}

fn detect_in_sample(sample: &str, truncated: bool) -> Option<u8> {
    let lines = sample_lines(sample, truncated);
    if lines.is_empty() {
        return None;
    }

    let mut best: Option<(u8, f64)> = None;
    for &candidate in &CANDIDATE_DELIMITERS {
        let Some(consistency) = consistency(&lines, candidate) else {
            continue;
        };
        debug!(
            "Delimiter '{}' consistency {:.3}",
            candidate as char, consistency
        );
        if consistency < MIN_CONSISTENCY {
            continue;
        }
        // Candidates are visited in preference order, so ties keep the earlier one.
        match best {
            Some((_, score)) if score >= consistency => {}
            _ => best = Some((candidate, consistency)),
        }
    }
    best.map(|(delimiter, _)| delimiter)
}

/// Semicolon when it strictly outnumbers commas on the line, comma otherwise.
pub fn fallback_delimiter(first_line: &str) -> u8 {
    let semicolons = first_line.matches(';').count();
    let commas = first_line.matches(',').count();
    if semicolons > commas { b';' } else { b',' }
}

fn sample_window(text: &str) -> &str {
    if text.len() <= SAMPLE_BYTES {
        return text;
    }
    let mut end = SAMPLE_BYTES;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Non-blank sample lines. When the window cut the text mid-line, the
/// partial last line is left out.
fn sample_lines(sample: &str, truncated: bool) -> Vec<&str> {
    let mut lines = sample
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>();
    if truncated && lines.len() > 1 && !sample.ends_with('\n') {
        lines.pop();
    }
    lines
}

/// Share of lines whose delimiter count equals the most common non-zero count.
fn consistency(lines: &[&str], delimiter: u8) -> Option<f64> {
    let mut frequencies: HashMap<usize, usize> = HashMap::new();
    for line in lines {
        *frequencies
            .entry(count_unquoted(line, delimiter))
            .or_insert(0) += 1;
    }
    let (mode, hits) = frequencies
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)))?;
    if mode == 0 {
        return None;
    }
    Some(hits as f64 / lines.len() as f64)
}

fn count_unquoted(line: &str, delimiter: u8) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for byte in line.bytes() {
        if byte == b'"' {
            in_quotes = !in_quotes;
        } else if byte == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}
