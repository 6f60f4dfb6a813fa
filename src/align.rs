use anyhow::{Result, anyhow};
use log::{debug, warn};

use crate::{
    data::{DateLayout, Value},
    source::SourceTable,
};

/// The destination declares more columns than the source provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidthMismatch {
    pub table_columns: usize,
    pub source_columns: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alignment {
    pub columns: Vec<String>,
    pub width_mismatch: Option<WidthMismatch>,
}

/// Pairs destination column `i` with source column `i`. Extra source columns
/// are left in place and simply never read.
pub fn align(schema: &[String], source: &SourceTable) -> Alignment {
    let width = source.width();
    if schema.len() > width {
        let mismatch = WidthMismatch {
            table_columns: schema.len(),
            source_columns: width,
        };
        warn!(
            "Table has {} columns but CSV only has {} columns",
            mismatch.table_columns, mismatch.source_columns
        );
        Alignment {
            columns: schema[..width].to_vec(),
            width_mismatch: Some(mismatch),
        }
    } else {
        Alignment {
            columns: schema.to_vec(),
            width_mismatch: None,
        }
    }
}

pub fn is_date_column(name: &str) -> bool {
    name.to_lowercase().contains("date")
}

/// Rewrites every date-named column whose values all parse as dates. Returns
/// the names of the columns that were rewritten.
pub fn coerce_date_columns(columns: &[String], source: &mut SourceTable) -> Vec<String> {
    let mut coerced = Vec::new();
    for (idx, name) in columns.iter().enumerate() {
        if !is_date_column(name) || idx >= source.width() {
            continue;
        }
        match convert_column(source, idx) {
            Ok(converted) => {
                for (row, value) in source.rows.iter_mut().zip(converted) {
                    if let Some(slot) = row.get_mut(idx) {
                        *slot = value;
                    }
                }
                coerced.push(name.clone());
            }
            Err(err) => debug!("Leaving column '{name}' unchanged: {err:#}"),
        }
    }
    coerced
}

/// Converted values for column `idx`, one per row. The layout is taken from
/// the first text cell and every other text cell must match it. Rows too
/// short to hold the column yield `Null`, which is never written back.
fn convert_column(source: &SourceTable, idx: usize) -> Result<Vec<Value>> {
    let layout = source
        .rows
        .iter()
        .find_map(|row| match row.get(idx) {
            Some(Value::Text(text)) => Some(text),
            _ => None,
        })
        .map(|first| DateLayout::detect(first).ok_or_else(|| anyhow!("'{first}' is not a date")))
        .transpose()?;
    source
        .rows
        .iter()
        .map(|row| match (row.get(idx), layout) {
            (None | Some(Value::Null), _) => Ok(Value::Null),
            (Some(Value::Date(date)), _) => Ok(Value::Date(*date)),
            (Some(Value::Text(text)), Some(layout)) => layout.parse(text).map(Value::Date),
            (Some(other), _) => Err(anyhow!("'{other}' is not a date")),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_date_column_ignores_case() {
        assert!(is_date_column("order_date"));
        assert!(is_date_column("UpdateDATE"));
        assert!(is_date_column("Dated"));
        assert!(!is_date_column("ordered_at"));
    }
}
