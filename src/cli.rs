use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Clean a retail orders export and summarize it into analysis tables",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Normalize, clean and aggregate an orders export into an output directory
    Run(RunArgs),
    /// Write the built-in canonical schema to a YAML file for editing
    Schema(SchemaArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Input CSV/TSV file (use '-' for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Directory receiving the output tables, KPI summary and README
    #[arg(short = 'o', long = "output-dir")]
    pub output_dir: PathBuf,
    /// Canonical schema YAML overriding the built-in Superstore layout
    #[arg(short = 's', long = "schema")]
    pub schema: Option<PathBuf>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Skip the console preview of KPIs and top tables
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

#[derive(Debug, Args)]
pub struct SchemaArgs {
    /// Destination YAML file
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
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

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn parse_delimiter_accepts_names_and_characters() {
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter("semicolon"), Ok(b';'));
        assert_eq!(parse_delimiter(":"), Ok(b':'));
        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter("ab").is_err());
        assert!(parse_delimiter("§").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_args_parse() {
        let cli = Cli::try_parse_from([
            "sales-digest",
            "run",
            "-i",
            "orders.tsv",
            "-o",
            "out",
            "--delimiter",
            "tab",
            "--quiet",
        ])
        .expect("parse");
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.input, PathBuf::from("orders.tsv"));
                assert_eq!(args.delimiter, Some(b'\t'));
                assert!(args.quiet);
                assert!(args.schema.is_none());
            }
            Commands::Schema(_) => panic!("expected run"),
        }
    }
}
