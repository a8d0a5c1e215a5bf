pub mod cli;
pub mod fields;
pub mod io_utils;
pub mod output;
pub mod preview;
pub mod sniff;
pub mod source;
pub mod table;
pub mod transpose;
pub mod transposer;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info};

use crate::{
    cli::{Cli, Commands},
    source::InputSource,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("csv_transpose", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Transpose(args) => transpose::execute(&args),
        Commands::Sniff(args) => handle_sniff(&args),
        Commands::Preview(args) => preview::execute(&args),
        Commands::Fields(args) => fields::execute(&args),
    }
}

fn handle_sniff(args: &cli::SniffArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let mut rows = Vec::with_capacity(args.inputs.len());
    for path in &args.inputs {
        let source = InputSource::from_path(path)?;
        let text = source
            .decode(encoding)
            .with_context(|| format!("Sniffing {path:?}"))?;
        let sniffed = sniff::sniff_delimiter(&text);
        rows.push(vec![
            source.name,
            printable_delimiter(sniffed.delimiter),
            sniffed.method.as_str().to_string(),
        ]);
    }
    let headers = vec![
        "input".to_string(),
        "delimiter".to_string(),
        "method".to_string(),
    ];
    table::print_table(&headers, &rows);
    info!("Sniffed {} input(s)", rows.len());
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
