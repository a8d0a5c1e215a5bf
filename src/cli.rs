use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Transpose key/value CSV files into wide tables",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Transpose one or more key/value CSV files into a single wide CSV
    Transpose(TransposeArgs),
    /// Report the delimiter detected for each input
    Sniff(SniffArgs),
    /// Preview the first few transposed records in a formatted table
    Preview(PreviewArgs),
    /// List discovered fields with their occurrence counts
    Fields(FieldsArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
#[value(rename_all = "kebab-case")]
pub enum BoundaryMode {
    /// A record ends when the first discovered field repeats with a value
    #[default]
    Sentinel,
    /// A record ends when the field named by --id-field appears again
    IdField,
    /// A record ends when any already-filled field repeats
    RepeatedField,
}

/// Options shared by every command that reads key/value inputs.
#[derive(Debug, Args)]
pub struct InputArgs {
    /// Key/value CSV files, processed in the order given ('-' reads stdin)
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,
    /// Input delimiter; detected per file when omitted (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// How record boundaries are recognised
    #[arg(long, value_enum, default_value = "sentinel")]
    pub boundary: BoundaryMode,
    /// Field that starts every record (required with --boundary id-field)
    #[arg(long = "id-field")]
    pub id_field: Option<String>,
}

#[derive(Debug, Args)]
pub struct TransposeArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "out")]
    pub output: Option<PathBuf>,
    /// Delimiter for the output file
    #[arg(long = "out-delim", value_parser = parse_delimiter, default_value = ",")]
    pub output_delimiter: u8,
    /// Character encoding for the output file/stdout (defaults to utf-8)
    #[arg(long = "output-encoding")]
    pub output_encoding: Option<String>,
    /// Write a `field,occurrences` CSV log to this path
    #[arg(long)]
    pub log: Option<PathBuf>,
    /// Write a JSON summary of the run to this path
    #[arg(long)]
    pub summary: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct SniffArgs {
    /// Files to inspect ('-' reads stdin)
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Number of records to display
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
}

#[derive(Debug, Args)]
pub struct FieldsArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Maximum fields to display (0 = all)
    #[arg(long, default_value_t = 0)]
    pub top: usize,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" | "\\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
