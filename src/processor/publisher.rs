use anyhow::{anyhow, Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::types::PredictionResult;

/// Append-only JSON-lines log of critical attacks.
#[derive(Debug, Clone)]
pub struct AlertLog {
    path: PathBuf,
}

impl AlertLog {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, result: &PredictionResult) -> Result<()> {
        let line = serde_json::to_string(result).context("Failed to encode alert")?;
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open alert log {}", self.path.display()))?;
        writeln!(f, "{}", line)
            .with_context(|| format!("Failed to write alert log {}", self.path.display()))
    }
}

/// Destination for human-readable progress lines and the final report.
/// Cloned handles share the same writer.
#[derive(Clone)]
pub struct ReportSink {
    out: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl ReportSink {
    pub fn stdout() -> Self {
        Self::from_writer(io::stdout())
    }

    /// Appends to `path`, creating it if needed.
    pub fn file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let f: File = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open report file {}", path.display()))?;
        Ok(Self::from_writer(f))
    }

    pub fn open(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::file(p),
            None => Ok(Self::stdout()),
        }
    }

    pub fn from_writer<W: Write + Send + 'static>(w: W) -> Self {
        Self { out: Arc::new(Mutex::new(Box::new(w))) }
    }

    pub fn line(&self, message: &str) -> Result<()> {
        let mut out = self.out.lock()
            .map_err(|e| anyhow!("Failed to lock report sink: {}", e))?;
        writeln!(out, "{}", message).context("Failed to write report line")?;
        out.flush().context("Failed to flush report sink")
    }

    /// Like `line`, but a failing sink only gets logged.
    pub fn emit(&self, message: &str) {
        if let Err(e) = self.line(message) {
            log::error!("{:#}", e);
        }
    }
}
