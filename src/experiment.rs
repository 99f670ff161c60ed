//! Experiment logging sinks.
//!
//! A connector receives a run configuration, a stream of metric records, and
//! 2-D arrays such as board heatmaps. Payloads are JSON values.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use serde_json::{Value, json};
use tracing::info;

use crate::error::{GomokuError, Result};

pub trait LoggingConnector {
    fn start(&mut self, config: Value) -> Result<()>;
    fn log(&mut self, record: Value) -> Result<()>;
    /// Log a non-empty rectangular 2-D array.
    fn log_array(&mut self, name: &str, rows: &[Vec<f64>]) -> Result<()>;
    fn finish(&mut self) -> Result<()>;
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct NoopConnector;

impl LoggingConnector for NoopConnector {
    fn start(&mut self, _config: Value) -> Result<()> {
        Ok(())
    }

    fn log(&mut self, _record: Value) -> Result<()> {
        Ok(())
    }

    fn log_array(&mut self, _name: &str, _rows: &[Vec<f64>]) -> Result<()> {
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Writes one JSON object per line to a file.
///
/// Lines are tagged with `"kind"`: `config`, `metrics`, or `array`.
pub struct JsonlConnector {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    step: u64,
}

impl JsonlConnector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
            step: 0,
        }
    }

    fn writer(&mut self) -> Result<&mut BufWriter<File>> {
        self.writer
            .as_mut()
            .ok_or_else(|| GomokuError::InvalidInput("logging connector is not started".to_string()))
    }

    fn write_line(&mut self, value: &Value) -> Result<()> {
        let writer = self.writer()?;
        serde_json::to_writer(&mut *writer, value)?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

impl LoggingConnector for JsonlConnector {
    fn start(&mut self, config: Value) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        self.writer = Some(BufWriter::new(File::create(&self.path)?));
        self.step = 0;
        info!(path = %self.path.display(), "experiment log started");
        self.write_line(&json!({ "kind": "config", "config": config }))
    }

    fn log(&mut self, record: Value) -> Result<()> {
        let line = json!({ "kind": "metrics", "step": self.step, "data": record });
        self.write_line(&line)?;
        self.step += 1;
        Ok(())
    }

    fn log_array(&mut self, name: &str, rows: &[Vec<f64>]) -> Result<()> {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if width == 0 || rows.iter().any(|r| r.len() != width) {
            return Err(GomokuError::InvalidInput(format!(
                "array '{name}' must be a non-empty 2-D array"
            )));
        }
        self.write_line(&json!({ "kind": "array", "name": name, "values": rows }))
    }

    fn finish(&mut self) -> Result<()> {
        let mut writer = self
            .writer
            .take()
            .ok_or_else(|| GomokuError::InvalidInput("logging connector is not started".to_string()))?;
        writer.flush()?;
        info!(path = %self.path.display(), records = self.step, "experiment log finished");
        Ok(())
    }
}
