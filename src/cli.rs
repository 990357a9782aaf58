use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about = "Map spreadsheet rows to typed records and back", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Compile a schema manifest and optionally resolve an input header against it
    Check(CheckArgs),
    /// Map CSV rows through a schema manifest into JSON lines
    Import(ImportArgs),
    /// Write JSON-lines records as CSV rows in the schema's column layout
    Export(ExportArgs),
}

/// How a CSV input is split and decoded.
#[derive(Debug, Clone, Args)]
pub struct CsvInputOptions {
    /// Field separator: a single ASCII character or one of comma, tab, semicolon, pipe
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// encoding_rs label of the input bytes [default: utf-8]
    #[arg(long = "input-encoding", value_name = "LABEL")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Schema manifest (YAML)
    #[arg(short, long)]
    pub schema: PathBuf,
    /// CSV file whose header is resolved against the schema
    #[arg(short, long)]
    pub input: Option<PathBuf>,
    #[command(flatten)]
    pub csv: CsvInputOptions,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Schema manifest (YAML)
    #[arg(short, long)]
    pub schema: PathBuf,
    /// CSV file with a header row, `-` for stdin
    #[arg(short, long)]
    pub input: PathBuf,
    /// JSON-lines destination [default: stdout]
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Exit with an error after the run when any cell could not be mapped
    #[arg(long)]
    pub strict: bool,
    /// Stop after mapping this many rows
    #[arg(long, value_name = "ROWS")]
    pub limit: Option<usize>,
    #[command(flatten)]
    pub csv: CsvInputOptions,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Schema manifest (YAML)
    #[arg(short, long)]
    pub schema: PathBuf,
    /// JSON-lines records, `-` for stdin
    #[arg(short, long)]
    pub input: PathBuf,
    /// CSV destination [default: stdout]
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Field separator for the output; `.tsv` destinations default to tab
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// encoding_rs label for the written bytes [default: utf-8]
    #[arg(long = "output-encoding", value_name = "LABEL")]
    pub output_encoding: Option<String>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    let named = match value.to_ascii_lowercase().as_str() {
        "comma" => Some(b','),
        "tab" => Some(b'\t'),
        "semicolon" => Some(b';'),
        "pipe" => Some(b'|'),
        _ => None,
    };
    if let Some(byte) = named {
        return Ok(byte);
    }
    match value.as_bytes() {
        [byte] if byte.is_ascii() => Ok(*byte),
        [] => Err("delimiter is empty".to_string()),
        _ => Err(format!(
            "'{value}' is not a single ASCII character or one of comma, tab, semicolon, pipe"
        )),
    }
}
