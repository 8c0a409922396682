pub mod aggregate;
pub mod clean;
pub mod cli;
pub mod context;
pub mod data;
pub mod describe;
pub mod dictionary;
pub mod error;
pub mod io_utils;
pub mod kpi;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod schema;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{Cli, Commands},
    pipeline::PipelineOptions,
    schema::CanonicalSchema,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("sales_digest", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => handle_run(&args),
        Commands::Schema(args) => handle_schema(&args),
    }
}

fn handle_run(args: &cli::RunArgs) -> Result<()> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    info!(
        "Processing '{}' with delimiter '{}' and encoding {}",
        args.input.display(),
        printable_delimiter(delimiter),
        encoding.name()
    );
    let schema = match &args.schema {
        Some(path) => CanonicalSchema::load(path)
            .with_context(|| format!("Loading schema from {path:?}"))?,
        None => CanonicalSchema::superstore(),
    };
    debug!(
        "Schema requires: {}",
        schema
            .required_fields()
            .map(|field| field.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    let options = PipelineOptions {
        schema,
        delimiter,
        encoding,
        ..PipelineOptions::default()
    };
    let report = pipeline::run_path(&args.input, options)?;
    report::write_report(&report, &args.output_dir)
        .with_context(|| format!("Writing outputs to {:?}", args.output_dir))?;
    if !args.quiet {
        report::print_preview(&report);
    }
    info!(
        "Run {} kept {} of {} row(s)",
        report.kpi.run_id, report.kpi.surviving_rows, report.kpi.input_rows
    );
    Ok(())
}

fn handle_schema(args: &cli::SchemaArgs) -> Result<()> {
    let schema = CanonicalSchema::superstore();
    schema
        .save(&args.output)
        .with_context(|| format!("Writing schema to {:?}", args.output))?;
    info!(
        "Canonical schema for {} column(s) written to {:?}",
        schema.columns.len(),
        args.output
    );
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
