//! Named input sources and the multi-input transposition driver.
//!
//! Each [`InputSource`] is decoded (BOM removed), sniffed for its delimiter
//! and read as long-format rows. All sources of a run feed a single
//! [`Transposer`], in the order given, so the schema is shared across them.

use std::{
    borrow::Cow,
    fs::File,
    io::{self, Read},
    path::Path,
};

use encoding_rs::{Encoding, UTF_8};
use log::{debug, info};
use thiserror::Error;

use crate::{
    io_utils, printable_delimiter,
    sniff::{self, SniffMethod},
    transposer::{BoundaryRule, TransposeOutput, Transposer},
};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Reading input '{name}'")]
    Read {
        name: String,
        #[source]
        error: io::Error,
    },
    #[error("Input '{name}' is not valid {encoding} text")]
    Decode {
        name: String,
        encoding: &'static str,
    },
    #[error("Parsing line {line} of input '{name}'")]
    Parse {
        name: String,
        line: u64,
        #[source]
        error: csv::Error,
    },
}

/// Raw bytes of one input together with the name used in diagnostics.
#[derive(Debug, Clone)]
pub struct InputSource {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl InputSource {
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Loads a file, or stdin when `path` is `-`.
    pub fn from_path(path: &Path) -> Result<Self, SourceError> {
        let name = path.display().to_string();
        let mut bytes = Vec::new();
        let result = if io_utils::is_dash(path) {
            io::stdin().lock().read_to_end(&mut bytes)
        } else {
            File::open(path).and_then(|mut file| file.read_to_end(&mut bytes))
        };
        result.map_err(|error| SourceError::Read {
            name: name.clone(),
            error,
        })?;
        Ok(Self { name, bytes })
    }

    /// Decodes the bytes, dropping a leading byte-order mark. Valid UTF-8
    /// input is borrowed rather than copied.
    pub fn decode(&self, encoding: &'static Encoding) -> Result<Cow<'_, str>, SourceError> {
        let (text, had_errors) = encoding.decode_with_bom_removal(&self.bytes);
        if had_errors {
            return Err(SourceError::Decode {
                name: self.name.clone(),
                encoding: encoding.name(),
            });
        }
        Ok(text)
    }
}

/// One long-format row: a field name and its (possibly empty) value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvRow {
    pub field: String,
    pub value: String,
}

impl KvRow {
    /// `None` for rows whose cells are all blank. Cells past the second are ignored.
    pub fn from_record(record: &csv::StringRecord) -> Option<Self> {
        if record.iter().all(|cell| cell.trim().is_empty()) {
            return None;
        }
        Some(Self {
            field: record.get(0).unwrap_or("").trim().to_string(),
            value: record.get(1).unwrap_or("").trim().to_string(),
        })
    }
}

/// Streams long-format rows out of decoded text, one record at a time.
pub fn read_rows<'a>(
    name: &'a str,
    text: &'a str,
    delimiter: u8,
) -> impl Iterator<Item = Result<KvRow, SourceError>> + 'a {
    io_utils::open_kv_reader(text.as_bytes(), delimiter)
        .into_records()
        .filter_map(move |record| match record {
            Ok(record) => KvRow::from_record(&record).map(Ok),
            Err(error) => Some(Err(SourceError::Parse {
                name: name.to_string(),
                line: error.position().map(|pos| pos.line()).unwrap_or(0),
                error,
            })),
        })
}

#[derive(Debug, Clone)]
pub struct ReadOptions {
    pub encoding: &'static Encoding,
    /// Skips sniffing and uses this delimiter for every input.
    pub delimiter: Option<u8>,
    pub boundary: BoundaryRule,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            encoding: UTF_8,
            delimiter: None,
            boundary: BoundaryRule::Sentinel,
        }
    }
}

/// Delimiter chosen for one input of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputReport {
    pub name: String,
    pub delimiter: u8,
    pub method: Option<SniffMethod>,
    pub rows: usize,
}

#[derive(Debug)]
pub struct TransposeRun {
    pub output: TransposeOutput,
    pub inputs: Vec<InputReport>,
}

/// One run over any number of inputs, folded in the order they are added.
/// Only the input being folded is held in memory besides the records.
#[derive(Debug)]
pub struct TransposeSession {
    options: ReadOptions,
    transposer: Transposer,
    inputs: Vec<InputReport>,
}

impl TransposeSession {
    pub fn new(options: ReadOptions) -> Self {
        Self {
            transposer: Transposer::new(options.boundary.clone()),
            options,
            inputs: Vec::new(),
        }
    }

    /// Decodes, sniffs and folds one input into the run.
    pub fn fold(&mut self, source: &InputSource) -> Result<&InputReport, SourceError> {
        let text = source.decode(self.options.encoding)?;
        let (delimiter, method) = match self.options.delimiter {
            Some(delimiter) => (delimiter, None),
            None => {
                let sniffed = sniff::sniff_delimiter(&text);
                (sniffed.delimiter, Some(sniffed.method))
            }
        };
        info!(
            "Processing '{}' with {} delimiter '{}'",
            source.name,
            method.map(SniffMethod::as_str).unwrap_or("configured"),
            printable_delimiter(delimiter)
        );

        let before = self.transposer.records().len();
        let mut rows = 0usize;
        self.transposer.begin_input();
        for row in read_rows(&source.name, &text, delimiter) {
            let row = row?;
            self.transposer.push_row(&row.field, &row.value);
            rows += 1;
        }
        self.transposer.end_input();
        debug!(
            "'{}' contributed {} row(s) and {} record(s)",
            source.name,
            rows,
            self.transposer.records().len() - before
        );

        self.inputs.push(InputReport {
            name: source.name.clone(),
            delimiter,
            method,
            rows,
        });
        Ok(&self.inputs[self.inputs.len() - 1])
    }

    pub fn finish(self) -> TransposeRun {
        TransposeRun {
            output: self.transposer.finish(),
            inputs: self.inputs,
        }
    }
}

/// Transposes in-memory sources in order. The first bad input aborts the run.
pub fn transpose_sources(
    sources: &[InputSource],
    options: &ReadOptions,
) -> Result<TransposeRun, SourceError> {
    let mut session = TransposeSession::new(options.clone());
    for source in sources {
        session.fold(source)?;
    }
    Ok(session.finish())
}

/// Loads, folds and drops each path in turn, so at most one input's bytes
/// are resident at a time.
pub fn transpose_paths<P: AsRef<Path>>(
    paths: &[P],
    options: &ReadOptions,
) -> Result<TransposeRun, SourceError> {
    let mut session = TransposeSession::new(options.clone());
    for path in paths {
        let source = InputSource::from_path(path.as_ref())?;
        session.fold(&source)?;
    }
    Ok(session.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_strips_utf8_bom() {
        let source = InputSource::from_bytes("bom.csv", b"\xEF\xBB\xBFid,1\n".to_vec());
        let text = source.decode(UTF_8).expect("decode");
        assert_eq!(text, "id,1\n");
        assert!(matches!(text, Cow::Borrowed(_)));
    }

    #[test]
    fn decode_rejects_invalid_utf8() {
        let source = InputSource::from_bytes("bad.csv", vec![b'i', b'd', b',', 0xFF, 0xFE]);
        let err = source.decode(UTF_8).expect_err("invalid bytes");
        assert!(matches!(err, SourceError::Decode { ref name, .. } if name == "bad.csv"));
    }

    #[test]
    fn read_rows_skips_blank_lines_and_defaults_missing_values() {
        let rows = read_rows("t", "id,1\n\n   \nflag\nname, Ann ,extra\n", b',')
            .collect::<Result<Vec<_>, _>>()
            .expect("rows");
        assert_eq!(
            rows,
            vec![
                KvRow {
                    field: "id".into(),
                    value: "1".into()
                },
                KvRow {
                    field: "flag".into(),
                    value: String::new()
                },
                KvRow {
                    field: "name".into(),
                    value: "Ann".into()
                },
            ]
        );
    }

    #[test]
    fn read_rows_honours_quoted_values() {
        let rows = read_rows("t", "note;\"a;b\"\n", b';')
            .collect::<Result<Vec<_>, _>>()
            .expect("rows");
        assert_eq!(rows[0].value, "a;b");
    }

    #[test]
    fn sources_share_schema_and_report_delimiters() {
        let sources = vec![
            InputSource::from_bytes("one.csv", "A,1\nB,2\nA,3\nB,4\n"),
            InputSource::from_bytes("two.csv", "A;5\nC;6\n"),
        ];
        let run = transpose_sources(&sources, &ReadOptions::default()).expect("run");
        assert_eq!(run.output.headers(), ["A", "B", "C"]);
        assert_eq!(run.output.records().len(), 3);
        assert_eq!(run.inputs[0].delimiter, b',');
        assert_eq!(run.inputs[1].delimiter, b';');
        assert_eq!(run.inputs[1].rows, 2);
    }

    #[test]
    fn configured_delimiter_skips_sniffing() {
        let sources = vec![InputSource::from_bytes("pipe.txt", "a|1\n")];
        let options = ReadOptions {
            delimiter: Some(b'|'),
            ..ReadOptions::default()
        };
        let run = transpose_sources(&sources, &options).expect("run");
        assert_eq!(run.inputs[0].method, None);
        assert_eq!(run.output.headers(), ["a"]);
    }

    #[test]
    fn session_folds_inputs_one_at_a_time() {
        let mut session = TransposeSession::new(ReadOptions::default());
        let first = InputSource::from_bytes("one.csv", "id,1\nid,2\n");
        assert_eq!(session.fold(&first).expect("fold one").rows, 2);
        drop(first);
        let second = InputSource::from_bytes("two.csv", "id|3\nmail|c@example.com\n");
        let report = session.fold(&second).expect("fold two");
        assert_eq!(report.delimiter, b'|');
        let run = session.finish();
        assert_eq!(run.output.headers(), ["id", "mail"]);
        assert_eq!(run.output.records().len(), 3);
    }

    #[test]
    fn paths_are_loaded_in_order_and_missing_ones_abort() {
        let dir = tempfile::tempdir().expect("temp dir");
        let first = dir.path().join("first.csv");
        let second = dir.path().join("second.csv");
        std::fs::write(&first, "A,1\nB,2\n").expect("write first");
        std::fs::write(&second, "A;3\nC;4\n").expect("write second");

        let run = transpose_paths(&[&first, &second], &ReadOptions::default()).expect("run");
        assert_eq!(run.output.headers(), ["A", "B", "C"]);
        assert_eq!(run.inputs[1].name, second.display().to_string());

        let missing = dir.path().join("missing.csv");
        let err = transpose_paths(&[&first, &missing], &ReadOptions::default())
            .expect_err("missing input");
        assert!(matches!(err, SourceError::Read { ref name, .. } if name.ends_with("missing.csv")));
    }

    #[test]
    fn decode_failure_names_the_offending_source() {
        let sources = vec![
            InputSource::from_bytes("good.csv", "a,1\n"),
            InputSource::from_bytes("broken.csv", vec![0xC3, 0x28]),
        ];
        let err = transpose_sources(&sources, &ReadOptions::default()).expect_err("fails");
        assert!(err.to_string().contains("broken.csv"));
    }
}
