use anyhow::{anyhow, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::{
    Arc, Mutex, MutexGuard,
    atomic::{AtomicBool, Ordering},
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::MonitorConfig;
use crate::types::{PredictionResult, RawFeatures, Statistics};
use super::detector::Detector;
use super::engine::{self, Pending, WorkerContext};
use super::publisher::{AlertLog, ReportSink};
use super::report::Report;

/// Single-worker streaming pipeline around a [`Detector`].
pub struct StreamMonitor {
    running: Arc<AtomicBool>,
    worker_thread: Option<JoinHandle<()>>,
    feature_tx: Sender<RawFeatures>,
    feature_rx: Receiver<RawFeatures>,
    detector: Arc<Mutex<Detector>>,
    results: Arc<Mutex<Vec<PredictionResult>>>,
    pending: Arc<Pending>,
    alerts: AlertLog,
    report: ReportSink,
    poll_interval: Duration,
}

impl StreamMonitor {
    pub fn new(detector: Detector, config: &MonitorConfig) -> Result<Self> {
        let report = ReportSink::open(config.report_path.as_deref())?;
        Ok(Self::with_sink(detector, AlertLog::new(&config.alert_log), report, config.poll_interval))
    }

    pub fn with_sink(detector: Detector, alerts: AlertLog, report: ReportSink, poll_interval: Duration) -> Self {
        let (feature_tx, feature_rx) = unbounded();
        Self {
            running: Arc::new(AtomicBool::new(false)),
            worker_thread: None,
            feature_tx,
            feature_rx,
            detector: Arc::new(Mutex::new(detector)),
            results: Arc::new(Mutex::new(Vec::new())),
            pending: Arc::new(Pending::default()),
            alerts,
            report,
            poll_interval,
        }
    }

    pub fn report_sink(&self) -> &ReportSink { &self.report }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn start(&mut self) -> Result<()> {
        if self.running.load(Ordering::Relaxed) {
            return Err(anyhow!("Monitor is already running"));
        }
        // A previous worker may still be finishing its last sample
        self.join();
        self.running.store(true, Ordering::Relaxed);

        let ctx = WorkerContext {
            running: self.running.clone(),
            rx: self.feature_rx.clone(),
            detector: self.detector.clone(),
            results: self.results.clone(),
            pending: self.pending.clone(),
            alerts: self.alerts.clone(),
            report: self.report.clone(),
            poll_interval: self.poll_interval,
        };
        self.worker_thread = Some(thread::spawn(move || engine::processing_loop(ctx)));

        log::info!("Monitoring started");
        Ok(())
    }

    /// Never blocks; the queue is unbounded.
    pub fn enqueue(&self, features: RawFeatures) -> Result<()> {
        self.pending.add();
        self.feature_tx.send(features).map_err(|e| {
            self.pending.done();
            anyhow!("Failed to enqueue sample: {}", e)
        })
    }

    /// Clears the running flag. Samples still queued are left unprocessed.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::Relaxed) {
            log::info!("Monitoring stopped");
        }
    }

    /// Blocks until every enqueued sample has been processed, or the monitor
    /// stops running. Returns how many samples were left unprocessed.
    pub fn drain(&self) -> usize {
        self.pending.wait_idle(&self.running, None, self.poll_interval)
    }

    /// Like [`drain`](Self::drain), but also gives up as soon as `interrupt` is set.
    pub fn drain_until(&self, interrupt: &AtomicBool) -> usize {
        self.pending.wait_idle(&self.running, Some(interrupt), self.poll_interval)
    }

    pub fn pending(&self) -> usize {
        self.pending.get()
    }

    /// Waits for the worker thread to exit. Call after `stop`.
    pub fn join(&mut self) {
        if let Some(h) = self.worker_thread.take() {
            if h.join().is_err() {
                log::error!("Worker thread panicked");
            }
        }
    }

    pub fn statistics(&self) -> Result<Statistics> {
        Ok(self.detector().statistics())
    }

    pub fn confidence_threshold(&self) -> Result<f32> {
        Ok(self.detector().confidence_threshold())
    }

    // Poisoning only means a prediction panicked; the worker keeps going and so do readers.
    fn detector(&self) -> MutexGuard<'_, Detector> {
        self.detector.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn results(&self) -> Result<Vec<PredictionResult>> {
        let results = self.results.lock()
            .map_err(|e| anyhow!("Failed to lock results: {}", e))?;
        Ok(results.clone())
    }

    pub fn log_message(&self, message: &str) {
        self.report.emit(message);
    }

    /// Builds the aggregate report over all collected results and writes it to the report sink.
    pub fn finalize(&self) -> Result<Report> {
        let report = Report::build(self.results()?, self.confidence_threshold()?);
        self.report.line(&report.to_string())?;
        Ok(report)
    }
}

impl Drop for StreamMonitor {
    fn drop(&mut self) {
        self.stop();
        self.join();
    }
}
