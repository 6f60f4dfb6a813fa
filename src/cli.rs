use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Insert CSV data into an Iceberg table in Trino using the table schema",
    long_about = None
)]
pub struct Cli {
    /// Path to the CSV file
    #[arg(default_value = "purchases.csv")]
    pub csv_file: PathBuf,
    /// Target table, optionally schema-qualified (`schema.table`)
    #[arg(default_value = "stocks_transactions")]
    pub table_name: String,
    /// Path to the YAML or JSON connection config
    #[arg(short, long, default_value = "trino_config.yaml")]
    pub config: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Resolve and align against the table, then print the rows instead of inserting
    #[arg(long = "dry-run")]
    pub dry_run: bool,
    /// Number of rows shown by --dry-run
    #[arg(long = "preview-rows", default_value_t = 10)]
    pub preview_rows: usize,
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
