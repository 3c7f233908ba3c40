use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crate::processor::StreamMonitor;
use crate::types::RawFeatures;

pub const DEFAULT_LABEL_COLUMN: &str = "label";
pub const PROGRESS_EVERY: usize = 100;

/// Replays a CSV of pre-extracted flow features, one sample per row.
/// The ground-truth label column is dropped; cells that do not parse as
/// numbers are skipped and end up as 0.0 in the model input.
pub struct CsvReplay<R: Read> {
    reader: csv::Reader<R>,
    headers: Vec<String>,
    label_idx: Option<usize>,
}

impl CsvReplay<File> {
    pub fn open<P: AsRef<Path>>(path: P, label_column: &str) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        Self::from_reader(file, label_column)
    }
}

impl<R: Read> CsvReplay<R> {
    pub fn from_reader(rdr: R, label_column: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(rdr);
        let headers: Vec<String> = reader.headers()
            .context("Failed to read CSV header")?
            .iter()
            .map(|h| h.to_string())
            .collect();
        let label_idx = headers.iter().position(|h| h == label_column);
        if label_idx.is_none() {
            log::warn!("Label column '{}' not found, using every column as a feature", label_column);
        }
        Ok(Self { reader, headers, label_idx })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }
}

impl<R: Read> Iterator for CsvReplay<R> {
    type Item = Result<RawFeatures>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut record = csv::StringRecord::new();
        match self.reader.read_record(&mut record) {
            Ok(false) => None,
            Err(e) => Some(Err(anyhow!("Malformed CSV row: {}", e))),
            Ok(true) => {
                let features = self.headers.iter()
                    .zip(record.iter())
                    .enumerate()
                    .filter(|(idx, _)| Some(*idx) != self.label_idx)
                    .filter_map(|(_, (name, cell))| {
                        cell.parse::<f64>().ok().map(|v| (name.clone(), v))
                    })
                    .collect();
                Some(Ok(features))
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationSummary {
    pub queued: usize,
    pub skipped: usize,
    pub interrupted: bool,
}

/// Feeds `samples` into a running monitor with `delay` between rows, writing a
/// progress block every [`PROGRESS_EVERY`] samples. Stops early once `interrupt` is set.
pub fn simulate<I>(samples: I, monitor: &StreamMonitor, delay: Duration, interrupt: &AtomicBool) -> Result<SimulationSummary>
where
    I: IntoIterator<Item = Result<RawFeatures>>,
{
    let mut summary = SimulationSummary::default();
    monitor.log_message("Starting simulation...");

    for (idx, sample) in samples.into_iter().enumerate() {
        if interrupt.load(Ordering::SeqCst) {
            summary.interrupted = true;
            monitor.log_message("Interrupted by user");
            break;
        }

        match sample {
            Ok(features) => {
                monitor.enqueue(features)?;
                summary.queued += 1;
            }
            Err(e) => {
                log::warn!("Skipping row {}: {:#}", idx + 1, e);
                summary.skipped += 1;
            }
        }

        if (idx + 1) % PROGRESS_EVERY == 0 {
            let stats = monitor.statistics()?;
            monitor.log_message(&format!("\nProcessed {} samples", idx + 1));
            monitor.log_message(&format!("Attack rate: {:.3}", stats.attack_rate));
            monitor.log_message(&format!("Average time: {:.2} ms", stats.avg_inference_time_ms));
        }

        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }

    log::info!("Simulation fed {} samples ({} skipped)", summary.queued, summary.skipped);
    Ok(summary)
}
