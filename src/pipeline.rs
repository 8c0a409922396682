//! End-to-end run: bytes in, [`Report`] out.
//!
//! The input is read once and parsed in full; every later stage works on the
//! in-memory record set. Structural failures abort the run before any
//! output exists.

use std::path::Path;

use anyhow::{Context, Result};
use encoding_rs::{Encoding, UTF_8};
use log::{debug, info};
use sha2::{Digest, Sha256};

use crate::{
    aggregate::{self, GroupSummary, MonthlyRow, ProductRank, TOP_PRODUCTS},
    clean::{self, CleanedSet},
    context::RunContext,
    describe::{self, CategoricalSummary, NumericSummary},
    dictionary::{self, DictionaryRow},
    error::StructuralError,
    io_utils,
    kpi::{self, KpiSummary},
    normalize,
    schema::CanonicalSchema,
};

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub schema: CanonicalSchema,
    pub delimiter: u8,
    pub encoding: &'static Encoding,
    pub input_label: String,
    pub input_sha256: Option<String>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            schema: CanonicalSchema::superstore(),
            delimiter: io_utils::DEFAULT_CSV_DELIMITER,
            encoding: UTF_8,
            input_label: "-".to_string(),
            input_sha256: None,
        }
    }
}

/// Everything one run produces, ready to be written or inspected.
#[derive(Debug, Clone)]
pub struct Report {
    pub context: RunContext,
    pub cleaned: CleanedSet,
    pub numeric: Vec<NumericSummary>,
    pub categorical: Vec<CategoricalSummary>,
    pub groups: Vec<GroupSummary>,
    pub monthly: Vec<MonthlyRow>,
    pub top_products: Vec<ProductRank>,
    pub kpi: KpiSummary,
    pub dictionary: Vec<DictionaryRow>,
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Reads and decodes every data row; header row is line 1.
fn read_rows(
    bytes: &[u8],
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<(Vec<String>, Vec<Vec<String>>), StructuralError> {
    if bytes.is_empty() {
        return Err(StructuralError::EmptyInput);
    }
    let mut reader = io_utils::open_csv_reader(bytes, delimiter);
    let headers = io_utils::reader_headers(&mut reader, encoding)?;
    let mut rows = Vec::new();
    for (row_idx, record) in reader.byte_records().enumerate() {
        let line = row_idx + 2;
        let record = record.map_err(|err| StructuralError::MalformedRow {
            row: line,
            message: err.to_string(),
        })?;
        rows.push(io_utils::decode_record(&record, encoding, line)?);
    }
    Ok((headers, rows))
}

pub fn run_bytes(bytes: &[u8], options: PipelineOptions) -> Result<Report> {
    let PipelineOptions {
        schema,
        delimiter,
        encoding,
        input_label,
        input_sha256,
    } = options;

    let (headers, rows) = read_rows(bytes, delimiter, encoding)
        .with_context(|| format!("Reading {input_label}"))?;
    let binding = schema
        .bind_headers(&headers)
        .with_context(|| format!("Validating headers for {input_label}"))?;
    if !binding.ignored().is_empty() {
        debug!("Ignoring column(s): {}", binding.ignored().join(", "));
    }
    info!(
        "Read {} row(s) from {input_label}; {} of {} column(s) bound",
        rows.len(),
        binding.bound_count(),
        headers.len()
    );

    let mut context = RunContext::new(schema, input_label);
    if let Some(sha) = input_sha256 {
        context = context.with_fingerprint(sha);
    }

    let normalized = normalize::normalize_rows(&mut context, &binding, rows);
    for (field, count) in context.parse_failures() {
        debug!("{count} unparseable value(s) in {field}");
    }
    let cleaned = clean::clean(&mut context, normalized);

    let records = cleaned.records();
    let numeric = describe::describe_numeric(records);
    let categorical = describe::describe_categorical(records);
    let groups = aggregate::group_summaries(records);
    let monthly = aggregate::monthly_series(records);
    let top_products = aggregate::top_products(records, TOP_PRODUCTS);
    let kpi = kpi::summarize(&context, &cleaned)?;
    let dictionary = dictionary::build_dictionary(&context.schema);

    Ok(Report {
        context,
        cleaned,
        numeric,
        categorical,
        groups,
        monthly,
        top_products,
        kpi,
        dictionary,
    })
}

/// Reads `path` (or stdin for `-`) once, fingerprints it and runs the pipeline.
pub fn run_path(path: &Path, mut options: PipelineOptions) -> Result<Report> {
    let bytes = io_utils::read_input_bytes(path)?;
    options.input_sha256 = Some(sha256_hex(&bytes));
    options.input_label = if io_utils::is_dash(path) {
        "-".to_string()
    } else {
        path.display().to_string()
    };
    run_bytes(&bytes, options)
}
