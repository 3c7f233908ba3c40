pub mod normalizer;
pub mod detector;
pub mod monitor;
pub mod report;
mod engine;
mod publisher;

pub use detector::{Detector, RunningStatistics};
pub use monitor::StreamMonitor;
pub use normalizer::{Normalized, Normalizer, Scaler, Transform};
pub use publisher::{AlertLog, ReportSink};
pub use report::{ConfidenceSummary, Report};
