#![allow(dead_code)]

pub mod trino_stub;

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use csv_to_iceberg::connection::Connection;
use csv_to_iceberg::data::Value;
use tempfile::{TempDir, tempdir};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}

/// In-memory stand-in for a database session. Answers every catalog query
/// with `columns` and records everything else it is asked to do.
#[derive(Debug, Default)]
pub struct RecordingConnection {
    pub columns: Vec<String>,
    pub queries: Vec<String>,
    pub executed: Vec<(String, Vec<Value>)>,
    /// Zero-based execution index that fails instead of succeeding.
    pub fail_at: Option<usize>,
    pub fail_close: bool,
    pub commits: usize,
    pub rollbacks: usize,
    pub closes: usize,
}

impl RecordingConnection {
    pub fn with_columns(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn failing_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }

    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    pub fn rows(&self) -> Vec<Vec<Value>> {
        self.executed.iter().map(|(_, params)| params.clone()).collect()
    }
}

impl Connection for RecordingConnection {
    fn query_column(&mut self, sql: &str) -> Result<Vec<String>> {
        self.queries.push(sql.to_string());
        Ok(self.columns.clone())
    }

    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<()> {
        if self.fail_at == Some(self.executed.len()) {
            return Err(anyhow!("Type mismatch in row {}", self.executed.len() + 1));
        }
        self.executed.push((sql.to_string(), params.to_vec()));
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.commits += 1;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.rollbacks += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closes += 1;
        if self.fail_close {
            return Err(anyhow!("Connection reset while deallocating"));
        }
        Ok(())
    }
}

pub fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}
