pub mod align;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod connection;
pub mod data;
pub mod error;
pub mod identifier;
pub mod insert;
pub mod io_utils;
pub mod preview;
pub mod source;
pub mod trino;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info};

use crate::{
    cli::Cli,
    connection::Session,
    identifier::TableIdentifier,
    insert::LoadSummary,
    source::{SourceOptions, read_source},
    trino::TrinoConnection,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("csv_to_iceberg", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    if cli.dry_run {
        handle_dry_run(&cli)
    } else {
        let summary = insert_csv(&cli)?;
        println!(
            "Data from {} inserted into {} successfully!",
            cli.csv_file.display(),
            cli.table_name
        );
        println!(
            "Inserted {} rows with {} columns",
            summary.rows_inserted,
            summary.columns.len()
        );
        Ok(())
    }
}

/// Loads the config and the source file, then inserts every row into the
/// table in a single session.
pub fn insert_csv(cli: &Cli) -> Result<LoadSummary> {
    let table = TableIdentifier::parse(&cli.table_name)?;
    let params = config::load_config(&cli.config)?;
    let options = source_options(cli)?;
    let source = read_source(&cli.csv_file, &options)
        .with_context(|| format!("Reading CSV file {:?}", cli.csv_file))?;
    let conn = TrinoConnection::connect(&params)?;
    info!("Inserting into {table} at {}", params.base_url());
    insert::load_and_commit(conn, &table, source)
}

fn handle_dry_run(cli: &Cli) -> Result<()> {
    let table = TableIdentifier::parse(&cli.table_name)?;
    let params = config::load_config(&cli.config)?;
    let options = source_options(cli)?;
    let mut source = read_source(&cli.csv_file, &options)
        .with_context(|| format!("Reading CSV file {:?}", cli.csv_file))?;
    let mut session = Session::new(TrinoConnection::connect(&params)?);
    let prepared = insert::prepare(session.connection(), &table, &mut source)?;
    println!("{}", prepared.statement.sql());
    print!(
        "{}",
        preview::render_bound_rows(&prepared.statement, &source, cli.preview_rows)
    );
    println!(
        "Dry run: {} rows with {} columns would be inserted",
        source.row_count(),
        prepared.statement.columns.len()
    );
    Ok(())
}

fn source_options(cli: &Cli) -> Result<SourceOptions> {
    Ok(SourceOptions {
        delimiter: cli.delimiter,
        encoding: io_utils::resolve_encoding(cli.input_encoding.as_deref())?,
    })
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
