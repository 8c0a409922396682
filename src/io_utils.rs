//! I/O utilities for reading the source export and writing output tables.
//!
//! All file I/O in sales-digest flows through this module:
//!
//! - **Delimiter resolution**: extension-based auto-detection (`.csv` → comma,
//!   `.tsv` → tab) with manual override support.
//! - **Encoding**: input decoding via `encoding_rs`, defaulting to UTF-8.
//! - **Reader/writer construction**: `open_csv_reader` over an in-memory
//!   buffer and `open_csv_writer` for output tables.
//! - **stdin**: the `-` path convention reads the input from standard input.

use std::{
    fs::File,
    io::{BufWriter, Read},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};

use crate::error::StructuralError;

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

/// Reads the whole input once, from stdin when `path` is `-`.
pub fn read_input_bytes(path: &Path) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    if is_dash(path) {
        std::io::stdin()
            .lock()
            .read_to_end(&mut buffer)
            .context("Reading input from stdin")?;
    } else {
        File::open(path)
            .with_context(|| format!("Opening input file {path:?}"))?
            .read_to_end(&mut buffer)
            .with_context(|| format!("Reading input file {path:?}"))?;
    }
    Ok(buffer)
}

/// Ragged rows are tolerated; missing trailing cells read as blank.
pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn open_csv_writer(path: &Path) -> Result<csv::Writer<BufWriter<File>>> {
    let file = File::create(path).with_context(|| format!("Creating output file {path:?}"))?;
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(DEFAULT_CSV_DELIMITER)
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true);
    Ok(builder.from_writer(BufWriter::new(file)))
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Option<String> {
    // Skip a UTF-8 byte order mark left by spreadsheet exports.
    let bytes = if encoding == UTF_8 {
        bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes)
    } else {
        bytes
    };
    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    (!had_errors).then(|| text.into_owned())
}

/// Decodes one record; `row` is the 1-based line used in error messages.
pub fn decode_record(
    record: &csv::ByteRecord,
    encoding: &'static Encoding,
    row: usize,
) -> Result<Vec<String>, StructuralError> {
    record
        .iter()
        .map(|field| {
            decode_bytes(field, encoding).ok_or_else(|| StructuralError::Decode {
                row,
                encoding: encoding.name().to_string(),
            })
        })
        .collect()
}

pub fn reader_headers<R>(
    reader: &mut csv::Reader<R>,
    encoding: &'static Encoding,
) -> Result<Vec<String>, StructuralError>
where
    R: Read,
{
    let headers = reader
        .byte_headers()
        .map_err(|err| StructuralError::MalformedRow {
            row: 1,
            message: err.to_string(),
        })?
        .clone();
    if headers.is_empty() || headers.iter().all(|field| field.is_empty()) {
        return Err(StructuralError::EmptyInput);
    }
    decode_record(&headers, encoding, 1)
}
