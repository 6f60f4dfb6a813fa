//! [`Connection`] over the Trino client REST protocol.
//!
//! A statement is submitted with `POST /v1/statement` and its results are
//! paged by following `nextUri` until the server stops returning one. Session
//! state the server hands back in response headers (the open transaction and
//! the prepared statements) is echoed on every later request.

use std::collections::{BTreeMap, HashMap};

use anyhow::{Context, Result};
use itertools::Itertools;
use log::debug;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use url::form_urlencoded;

use crate::{
    config::ConnectionParameters,
    connection::Connection,
    data::Value,
    error::LoadError,
    identifier::quote_literal,
};

const HEADER_USER: &str = "X-Trino-User";
const HEADER_CATALOG: &str = "X-Trino-Catalog";
const HEADER_SCHEMA: &str = "X-Trino-Schema";
const HEADER_SOURCE: &str = "X-Trino-Source";
const HEADER_TRANSACTION: &str = "X-Trino-Transaction-Id";
const HEADER_PREPARED: &str = "X-Trino-Prepared-Statement";
const HEADER_STARTED_TRANSACTION: &str = "X-Trino-Started-Transaction-Id";
const HEADER_CLEAR_TRANSACTION: &str = "X-Trino-Clear-Transaction-Id";
const HEADER_ADDED_PREPARE: &str = "X-Trino-Added-Prepare";
const HEADER_DEALLOCATED_PREPARE: &str = "X-Trino-Deallocated-Prepare";

const NO_TRANSACTION: &str = "NONE";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResults {
    pub id: String,
    #[serde(default)]
    pub next_uri: Option<String>,
    #[serde(default)]
    pub data: Option<Vec<Vec<serde_json::Value>>>,
    #[serde(default)]
    pub error: Option<QueryError>,
    #[serde(default)]
    pub update_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryError {
    pub message: String,
    #[serde(default)]
    pub error_name: Option<String>,
}

impl QueryResults {
    /// Turns a server-reported failure into an error.
    pub fn into_result(self) -> Result<Self, LoadError> {
        match self.error {
            Some(error) => Err(LoadError::TrinoQueryFailed {
                name: error.error_name.unwrap_or_else(|| "UNKNOWN".to_string()),
                message: error.message,
            }),
            None => Ok(self),
        }
    }
}

pub struct TrinoConnection {
    params: ConnectionParameters,
    client: Client,
    transaction_id: Option<String>,
    /// Prepared statements known to the server session, by name.
    prepared: BTreeMap<String, String>,
    /// Statement text to the name it was prepared under.
    statement_names: HashMap<String, String>,
    closed: bool,
}

impl TrinoConnection {
    /// Builds the HTTP client. No request is sent until the first statement.
    pub fn connect(params: &ConnectionParameters) -> Result<Self> {
        let client = Client::builder()
            .timeout(params.request_timeout())
            .build()
            .context("Building HTTP client")?;
        debug!(
            "Connecting to {} as '{}' (catalog '{}', schema '{}')",
            params.base_url(),
            params.user,
            params.catalog,
            params.schema
        );
        Ok(Self {
            params: params.clone(),
            client,
            transaction_id: None,
            prepared: BTreeMap::new(),
            statement_names: HashMap::new(),
            closed: false,
        })
    }

    pub fn transaction_id(&self) -> Option<&str> {
        self.transaction_id.as_deref()
    }

    /// Runs one statement to completion and returns every data row.
    pub fn run(&mut self, sql: &str) -> Result<Vec<Vec<serde_json::Value>>> {
        debug!("Submitting: {sql}");
        let url = format!("{}/v1/statement", self.params.base_url());
        let request = self.client.post(&url).body(sql.to_string());
        let mut response = self.send(request)?;
        let mut rows = Vec::new();
        loop {
            let results = self.read_results(response)?;
            if let Some(data) = results.data {
                rows.extend(data);
            }
            match results.next_uri {
                Some(next) => {
                    let request = self.client.get(&next);
                    response = self.send(request)?;
                }
                None => {
                    if let Some(count) = results.update_count {
                        debug!("Query {} updated {count} row(s)", results.id);
                    }
                    break;
                }
            }
        }
        Ok(rows)
    }

    fn send(&self, request: RequestBuilder) -> Result<Response> {
        let mut request = request
            .header(HEADER_USER, &self.params.user)
            .header(HEADER_CATALOG, &self.params.catalog)
            .header(HEADER_SCHEMA, &self.params.schema)
            .header(HEADER_SOURCE, &self.params.source);
        if let Some(id) = &self.transaction_id {
            request = request.header(HEADER_TRANSACTION, id);
        } else if self.params.isolation_level.sql().is_some() {
            request = request.header(HEADER_TRANSACTION, NO_TRANSACTION);
        }
        if !self.prepared.is_empty() {
            request = request.header(HEADER_PREPARED, prepared_statement_header(&self.prepared));
        }
        if let Some(password) = &self.params.password {
            request = request.basic_auth(&self.params.user, Some(password));
        }
        request
            .send()
            .with_context(|| format!("Sending request to {}", self.params.base_url()))
    }

    fn read_results(&mut self, response: Response) -> Result<QueryResults> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(LoadError::TrinoHttp {
                status: status.as_u16(),
                body,
            }
            .into());
        }
        self.apply_session_headers(&response);
        let results: QueryResults = response.json().context("Decoding Trino response")?;
        Ok(results.into_result()?)
    }

    fn apply_session_headers(&mut self, response: &Response) {
        let headers = response.headers();
        if let Some(id) = headers
            .get(HEADER_STARTED_TRANSACTION)
            .and_then(|v| v.to_str().ok())
        {
            self.transaction_id = Some(id.to_string());
        }
        if headers.contains_key(HEADER_CLEAR_TRANSACTION) {
            self.transaction_id = None;
        }
        for value in headers.get_all(HEADER_ADDED_PREPARE) {
            if let Ok(text) = value.to_str() {
                for (name, sql) in form_urlencoded::parse(text.as_bytes()) {
                    self.prepared.insert(name.into_owned(), sql.into_owned());
                }
            }
        }
        for value in headers.get_all(HEADER_DEALLOCATED_PREPARE) {
            if let Ok(text) = value.to_str() {
                for name in text.split(',') {
                    self.prepared.remove(name.trim());
                }
            }
        }
    }

    fn ensure_transaction(&mut self) -> Result<()> {
        let Some(level) = self.params.isolation_level.sql() else {
            return Ok(());
        };
        if self.transaction_id.is_none() {
            self.run(&format!(
                "START TRANSACTION ISOLATION LEVEL {level}, READ WRITE"
            ))
            .context("Starting transaction")?;
        }
        Ok(())
    }

    fn ensure_prepared(&mut self, sql: &str) -> Result<String> {
        if let Some(name) = self.statement_names.get(sql) {
            return Ok(name.clone());
        }
        let name = format!("csv_to_iceberg_{}", self.statement_names.len() + 1);
        self.run(&format!("PREPARE {name} FROM {sql}"))
            .with_context(|| format!("Preparing statement {name}"))?;
        self.prepared
            .entry(name.clone())
            .or_insert_with(|| sql.to_string());
        self.statement_names.insert(sql.to_string(), name.clone());
        Ok(name)
    }
}

impl Connection for TrinoConnection {
    fn query_column(&mut self, sql: &str) -> Result<Vec<String>> {
        self.ensure_transaction()?;
        let rows = self.run(sql)?;
        Ok(rows
            .iter()
            .filter_map(|row| row.first())
            .map(json_to_text)
            .collect())
    }

    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<()> {
        self.ensure_transaction()?;
        let name = self.ensure_prepared(sql)?;
        self.run(&execute_statement(&name, params))?;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if self.transaction_id.is_some() {
            self.run("COMMIT").context("Committing transaction")?;
            self.transaction_id = None;
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        if self.transaction_id.is_some() {
            self.run("ROLLBACK").context("Rolling back transaction")?;
            self.transaction_id = None;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let names = self.prepared.keys().cloned().collect::<Vec<_>>();
        for name in names {
            self.run(&format!("DEALLOCATE PREPARE {name}"))
                .with_context(|| format!("Deallocating {name}"))?;
            self.prepared.remove(&name);
        }
        self.statement_names.clear();
        Ok(())
    }
}

/// Renders a bound parameter as a Trino SQL literal.
pub fn render_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) if f.is_nan() => "nan()".to_string(),
        Value::Float(f) if f.is_infinite() && *f > 0.0 => "infinity()".to_string(),
        Value::Float(f) if f.is_infinite() => "-infinity()".to_string(),
        Value::Float(f) => format!("DOUBLE '{f}'"),
        Value::Text(s) => quote_literal(s),
        Value::Date(d) => format!("DATE '{}'", d.format("%Y-%m-%d")),
    }
}

pub fn execute_statement(name: &str, params: &[Value]) -> String {
    if params.is_empty() {
        format!("EXECUTE {name}")
    } else {
        format!(
            "EXECUTE {name} USING {}",
            params.iter().map(render_literal).join(", ")
        )
    }
}

/// `name=<form-encoded sql>` pairs, comma separated.
pub fn prepared_statement_header(prepared: &BTreeMap<String, String>) -> String {
    prepared
        .iter()
        .map(|(name, sql)| {
            let encoded: String = form_urlencoded::byte_serialize(sql.as_bytes()).collect();
            format!("{name}={encoded}")
        })
        .join(",")
}

fn json_to_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
