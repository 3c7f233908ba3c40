use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.8;
pub const DEFAULT_ALERT_LOG: &str = "attack_log.json";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Attack categories that are known but less severe than floods.
pub const DEFAULT_LOW_THREAT_CLASSES: [&str; 3] = [
    "VulnerabilityScan",
    "Recon-PingSweep",
    "BrowserHijacking",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    pub confidence_threshold: f32,
    pub low_threat_classes: BTreeSet<String>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            low_threat_classes: DEFAULT_LOW_THREAT_CLASSES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl DetectorConfig {
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn with_low_threat_classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.low_threat_classes = classes.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// JSON-lines file receiving one entry per critical attack.
    pub alert_log: PathBuf,
    /// Human-readable output. `None` means stdout.
    pub report_path: Option<PathBuf>,
    /// How long the worker blocks on the queue before re-checking the running flag.
    pub poll_interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            alert_log: PathBuf::from(DEFAULT_ALERT_LOG),
            report_path: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}
