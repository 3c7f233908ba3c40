use anyhow::anyhow;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use crate::types::{PredictionResult, RawFeatures, Severity};
use super::detector::Detector;
use super::publisher::{AlertLog, ReportSink};

/// Count of samples enqueued but not yet processed.
#[derive(Default)]
pub struct Pending {
    count: Mutex<usize>,
    idle: Condvar,
}

impl Pending {
    pub fn add(&self) {
        if let Ok(mut n) = self.count.lock() {
            *n += 1;
        }
    }

    pub fn done(&self) {
        if let Ok(mut n) = self.count.lock() {
            *n = n.saturating_sub(1);
            if *n == 0 {
                self.idle.notify_all();
            }
        }
    }

    pub fn get(&self) -> usize {
        self.count.lock().map(|n| *n).unwrap_or(0)
    }

    /// Blocks until the count reaches zero, `running` is cleared or `interrupt`
    /// is set. Returns what is left.
    pub fn wait_idle(&self, running: &AtomicBool, interrupt: Option<&AtomicBool>, poll: Duration) -> usize {
        let interrupted = || interrupt.map_or(false, |i| i.load(Ordering::SeqCst));
        let mut n = match self.count.lock() {
            Ok(n) => n,
            Err(_) => return 0,
        };
        while *n > 0 && running.load(Ordering::Relaxed) && !interrupted() {
            n = match self.idle.wait_timeout(n, poll) {
                Ok((n, _)) => n,
                Err(_) => return 0,
            };
        }
        *n
    }
}

/// Everything the worker thread needs, moved into it at start.
pub struct WorkerContext {
    pub running: Arc<AtomicBool>,
    pub rx: Receiver<RawFeatures>,
    pub detector: Arc<Mutex<Detector>>,
    pub results: Arc<Mutex<Vec<PredictionResult>>>,
    pub pending: Arc<Pending>,
    pub alerts: AlertLog,
    pub report: ReportSink,
    pub poll_interval: Duration,
}

pub fn processing_loop(ctx: WorkerContext) {
    log::debug!("Worker thread started");

    while ctx.running.load(Ordering::Relaxed) {
        let features = match ctx.rx.recv_timeout(ctx.poll_interval) {
            Ok(f) => f,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| process_sample(&ctx, &features)))
            .unwrap_or_else(|p| Err(anyhow!("Prediction panicked: {}", panic_message(&*p))));
        if let Err(e) = outcome {
            log::error!("Failed to process sample: {:#}", e);
            ctx.report.emit(&format!("Processing error: {:#}", e));
        }
        ctx.pending.done();
    }

    log::debug!("Worker thread exiting");
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown cause")
}

fn process_sample(ctx: &WorkerContext, features: &RawFeatures) -> anyhow::Result<()> {
    let result = {
        // a panic inside an earlier prediction poisons the lock; the detector state is still usable
        let mut detector = ctx.detector.lock().unwrap_or_else(|e| e.into_inner());
        detector.predict(features)?
    };

    ctx.results.lock()
        .map_err(|e| anyhow!("Failed to lock results: {}", e))?
        .push(result.clone());

    let severity = result.severity();
    ctx.report.emit(&notice(severity, &result));
    if severity == Severity::Critical {
        ctx.alerts.append(&result)?;
    }
    Ok(())
}

pub fn notice(severity: Severity, result: &PredictionResult) -> String {
    format!(
        "{}: {} (Confidence: {:.3})",
        severity, result.predicted_class, result.confidence
    )
}
