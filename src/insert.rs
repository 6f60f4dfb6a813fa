use anyhow::{Context, Result};
use itertools::Itertools;
use log::{debug, info};

use crate::{
    align::{WidthMismatch, align, coerce_date_columns},
    catalog::resolve_columns,
    connection::{Connection, Session},
    data::Value,
    identifier::{TableIdentifier, quote_identifier},
    source::SourceTable,
};

/// A parameterized insert for a fixed column list, reused for every row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertStatement {
    pub table: TableIdentifier,
    pub columns: Vec<String>,
    sql: String,
}

impl InsertStatement {
    pub fn new(table: &TableIdentifier, columns: &[String]) -> Self {
        let column_list = columns.iter().map(|c| quote_identifier(c)).join(", ");
        let placeholders = columns.iter().map(|_| "?").join(", ");
        let sql = format!(
            "INSERT INTO {} ({column_list}) VALUES ({placeholders})",
            table.quoted()
        );
        Self {
            table: table.clone(),
            columns: columns.to_vec(),
            sql,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// One value per column: position `i` of the row, or `Null` past its end.
    pub fn bind(&self, row: &[Value]) -> Vec<Value> {
        (0..self.columns.len())
            .map(|i| row.get(i).cloned().unwrap_or(Value::Null))
            .collect()
    }
}

/// Executes the statement once per row in source order. The first failure
/// aborts the remaining rows.
pub fn insert_rows<C: Connection + ?Sized>(
    conn: &mut C,
    statement: &InsertStatement,
    source: &SourceTable,
) -> Result<usize> {
    debug!("Insert statement: {}", statement.sql());
    let total = source.row_count();
    let mut inserted = 0usize;
    for (idx, row) in source.rows.iter().enumerate() {
        let values = statement.bind(row);
        debug!("Inserting row {} of {total}", idx + 1);
        conn.execute(statement.sql(), &values)
            .with_context(|| format!("Inserting row {} into {}", idx + 1, statement.table))?;
        inserted += 1;
    }
    Ok(inserted)
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadSummary {
    pub rows_inserted: usize,
    pub columns: Vec<String>,
    pub coerced_columns: Vec<String>,
    pub width_mismatch: Option<WidthMismatch>,
}

/// Aligned and coerced input ready for insertion.
#[derive(Debug, Clone)]
pub struct PreparedLoad {
    pub statement: InsertStatement,
    pub coerced_columns: Vec<String>,
    pub width_mismatch: Option<WidthMismatch>,
}

/// Resolves the destination columns, aligns the source against them and
/// applies date coercion in place.
pub fn prepare<C: Connection + ?Sized>(
    conn: &mut C,
    table: &TableIdentifier,
    source: &mut SourceTable,
) -> Result<PreparedLoad> {
    let schema = resolve_columns(conn, table)?;
    let alignment = align(&schema, source);
    info!("Using table columns: {:?}", alignment.columns);
    let coerced_columns = coerce_date_columns(&alignment.columns, source);
    if !coerced_columns.is_empty() {
        info!("Converted date column(s): {coerced_columns:?}");
    }
    Ok(PreparedLoad {
        statement: InsertStatement::new(table, &alignment.columns),
        coerced_columns,
        width_mismatch: alignment.width_mismatch,
    })
}

/// Runs the pipeline up to, but not including, the commit.
pub fn load<C: Connection + ?Sized>(
    conn: &mut C,
    table: &TableIdentifier,
    mut source: SourceTable,
) -> Result<LoadSummary> {
    let prepared = prepare(conn, table, &mut source)?;
    let rows_inserted = insert_rows(conn, &prepared.statement, &source)?;
    Ok(LoadSummary {
        rows_inserted,
        columns: prepared.statement.columns,
        coerced_columns: prepared.coerced_columns,
        width_mismatch: prepared.width_mismatch,
    })
}

/// Full run inside one session: commits once on success, rolls back and
/// closes on any failure.
pub fn load_and_commit<C: Connection>(
    conn: C,
    table: &TableIdentifier,
    source: SourceTable,
) -> Result<LoadSummary> {
    let mut session = Session::new(conn);
    let summary = load(session.connection(), table, source)?;
    session.commit().context("Committing inserted rows")?;
    Ok(summary)
}
