use anyhow::{Context, Result};
use log::debug;

use crate::{
    connection::Connection,
    error::LoadError,
    identifier::{TableIdentifier, quote_literal},
};

/// Catalog lookup for the table's columns in ordinal order. Without a schema
/// segment the session's current schema applies.
pub fn columns_query(table: &TableIdentifier) -> String {
    let schema_condition = table
        .schema
        .as_deref()
        .map(|schema| format!(" AND table_schema = {}", quote_literal(schema)))
        .unwrap_or_default();
    format!(
        "SELECT column_name FROM information_schema.columns WHERE table_name = {}{schema_condition} ORDER BY ordinal_position",
        quote_literal(&table.name)
    )
}

/// Destination column names in ordinal order. Queries on every call.
pub fn resolve_columns<C: Connection + ?Sized>(
    conn: &mut C,
    table: &TableIdentifier,
) -> Result<Vec<String>> {
    let sql = columns_query(table);
    debug!("Catalog lookup: {sql}");
    let columns = conn
        .query_column(&sql)
        .with_context(|| format!("Looking up columns of {table}"))?;
    if columns.is_empty() {
        return Err(LoadError::TableNotFound(table.to_string()).into());
    }
    Ok(columns)
}
