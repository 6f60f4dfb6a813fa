//! Table identifiers and SQL quoting.
//!
//! Identifiers are always emitted double-quoted with embedded quotes doubled,
//! and string literals single-quoted with embedded quotes doubled. Nothing
//! user supplied is interpolated into SQL any other way.

use std::fmt;
use std::str::FromStr;

use crate::error::LoadError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableIdentifier {
    pub schema: Option<String>,
    pub name: String,
}

impl TableIdentifier {
    /// Accepts `table` or `schema.table`. Three-part names are rejected.
    pub fn parse(raw: &str) -> Result<Self, LoadError> {
        let invalid = || LoadError::InvalidTableIdentifier(raw.to_string());
        let trimmed = raw.trim();
        let segments = trimmed.split('.').collect::<Vec<_>>();
        if segments.iter().any(|segment| segment.trim().is_empty()) {
            return Err(invalid());
        }
        match segments.as_slice() {
            [name] => Ok(Self {
                schema: None,
                name: name.trim().to_string(),
            }),
            [schema, name] => Ok(Self {
                schema: Some(schema.trim().to_string()),
                name: name.trim().to_string(),
            }),
            _ => Err(invalid()),
        }
    }

    /// Quoted form for use in statements, e.g. `"retail"."orders"`.
    pub fn quoted(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", quote_identifier(schema), quote_identifier(&self.name)),
            None => quote_identifier(&self.name),
        }
    }
}

impl FromStr for TableIdentifier {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TableIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{schema}.{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_schema_and_table() {
        let ident = TableIdentifier::parse("retail.customer_orders").unwrap();
        assert_eq!(ident.schema.as_deref(), Some("retail"));
        assert_eq!(ident.name, "customer_orders");
        assert_eq!(ident.to_string(), "retail.customer_orders");
    }

    #[test]
    fn parse_plain_name_has_no_schema() {
        let ident: TableIdentifier = "stocks_transactions".parse().unwrap();
        assert_eq!(ident.schema, None);
        assert_eq!(ident.quoted(), "\"stocks_transactions\"");
    }

    #[test]
    fn parse_rejects_extra_or_empty_segments() {
        for raw in ["iceberg.retail.orders", ".orders", "retail.", "", "a..b"] {
            assert!(
                matches!(
                    TableIdentifier::parse(raw),
                    Err(LoadError::InvalidTableIdentifier(_))
                ),
                "expected rejection for {raw:?}"
            );
        }
    }

    #[test]
    fn quoting_doubles_embedded_quotes() {
        assert_eq!(quote_identifier("order \"date\""), "\"order \"\"date\"\"\"");
        assert_eq!(quote_literal("O'Brien"), "'O''Brien'");
        let ident = TableIdentifier::parse("Retail.Orders").unwrap();
        assert_eq!(ident.quoted(), "\"Retail\".\"Orders\"");
    }
}
