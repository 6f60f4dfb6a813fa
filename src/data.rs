use std::fmt;

use anyhow::{Result, anyhow};
use chrono::{NaiveDate, NaiveDateTime};

/// A single cell of the source table.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_display(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => s.clone(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

/// Element type shared by every non-null cell of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Float,
    Text,
}

const NULL_TOKENS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "NULL", "null", "None", "#N/A"];

pub fn is_null_token(raw: &str) -> bool {
    NULL_TOKENS.contains(&raw.trim())
}

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y", "%Y%m%d",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// One textual date layout, chosen once and then applied to a whole column.
/// Datetime layouts keep only the calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateLayout {
    Date(&'static str),
    DateTime(&'static str),
}

impl DateLayout {
    /// First layout that reads `value`. Month-first wins over day-first when
    /// both would.
    pub fn detect(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        DATE_FORMATS
            .iter()
            .copied()
            .map(DateLayout::Date)
            .chain(DATETIME_FORMATS.iter().copied().map(DateLayout::DateTime))
            .find(|layout| layout.try_parse(trimmed).is_some())
    }

    pub fn format(&self) -> &'static str {
        match self {
            DateLayout::Date(fmt) | DateLayout::DateTime(fmt) => *fmt,
        }
    }

    pub fn parse(&self, value: &str) -> Result<NaiveDate> {
        self.try_parse(value.trim())
            .ok_or_else(|| anyhow!("Failed to parse '{value}' with format '{}'", self.format()))
    }

    fn try_parse(&self, trimmed: &str) -> Option<NaiveDate> {
        match self {
            DateLayout::Date(fmt) => NaiveDate::parse_from_str(trimmed, fmt).ok(),
            DateLayout::DateTime(fmt) => NaiveDateTime::parse_from_str(trimmed, fmt)
                .ok()
                .map(|dt| dt.date()),
        }
    }
}

/// Decides the element type of a column from every raw cell in it.
pub fn infer_column_kind<'a, I>(cells: I) -> ColumnKind
where
    I: IntoIterator<Item = &'a str>,
{
    let mut possible_integer = true;
    let mut possible_float = true;
    for raw in cells {
        if is_null_token(raw) {
            continue;
        }
        let trimmed = raw.trim();
        if possible_integer && trimmed.parse::<i64>().is_err() {
            possible_integer = false;
        }
        if possible_float && trimmed.parse::<f64>().is_err() {
            possible_float = false;
        }
        if !possible_float {
            break;
        }
    }
    if possible_integer {
        ColumnKind::Integer
    } else if possible_float {
        ColumnKind::Float
    } else {
        ColumnKind::Text
    }
}

/// Builds a cell from raw text once the column's kind is known. The kind must
/// have been inferred from a set of cells including `raw`.
pub fn typed_value(raw: &str, kind: ColumnKind) -> Value {
    if is_null_token(raw) {
        return Value::Null;
    }
    let trimmed = raw.trim();
    match kind {
        ColumnKind::Integer => trimmed
            .parse()
            .map(Value::Integer)
            .unwrap_or_else(|_| Value::Text(raw.to_string())),
        ColumnKind::Float => trimmed
            .parse()
            .map(Value::Float)
            .unwrap_or_else(|_| Value::Text(raw.to_string())),
        ColumnKind::Text => Value::Text(raw.to_string()),
    }
}
