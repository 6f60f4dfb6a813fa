use std::fmt::Write as _;

use crate::{data::Value, insert::InsertStatement, source::SourceTable};

/// Renders the first `limit` rows exactly as they would be bound to the
/// statement, one fixed-width column per destination column.
pub fn render_bound_rows(statement: &InsertStatement, source: &SourceTable, limit: usize) -> String {
    let rows = source
        .rows
        .iter()
        .take(limit)
        .map(|row| {
            statement
                .bind(row)
                .iter()
                .map(Value::as_display)
                .map(|cell| flatten_cell(&cell))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    render_table(&statement.columns, &rows)
}

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths = headers
        .iter()
        .map(|h| h.chars().count().max(3))
        .collect::<Vec<_>>();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", join_padded(headers, &widths));
    let rule = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", join_padded(&rule, &widths));
    for row in rows {
        let _ = writeln!(output, "{}", join_padded(row, &widths));
    }
    output
}

fn join_padded(cells: &[String], widths: &[usize]) -> String {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ");
    line.trim_end().to_string()
}

fn flatten_cell(value: &str) -> String {
    value.replace(['\n', '\r', '\t'], " ")
}
