use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Raw feature mapping for one flow, keyed by feature name.
pub type RawFeatures = HashMap<String, f64>;

/// Outcome of one prediction. This is also the alert log line format.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct PredictionResult {
    pub timestamp: DateTime<Local>,
    pub predicted_class: String,
    pub confidence: f32,
    pub is_attack: bool,
    pub is_benign: bool,
    pub is_high_threat: bool,
    pub is_ddos: bool,
    pub confidence_threshold: f32,
    pub inference_time_ms: f64,
    pub all_probabilities: Vec<f32>,
    /// Set when scaling failed and the model saw unscaled features.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalization_warning: Option<String>,
}

impl PredictionResult {
    pub fn severity(&self) -> Severity {
        if self.is_attack {
            Severity::Critical
        } else if self.is_benign {
            Severity::Normal
        } else if self.confidence >= self.confidence_threshold {
            Severity::Suspicious
        } else {
            Severity::LowRisk
        }
    }
}

/// User-facing bucket a result is routed to. Every result lands in exactly one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Critical,
    Normal,
    Suspicious,
    LowRisk,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::Normal,
        Severity::Suspicious,
        Severity::LowRisk,
    ];

    pub fn glyph(self) -> &'static str {
        match self {
            Severity::Critical => "🚨",
            Severity::Normal => "✅",
            Severity::Suspicious => "⚠️",
            Severity::LowRisk => "🔍",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL ATTACK",
            Severity::Normal => "NORMAL TRAFFIC",
            Severity::Suspicious => "SUSPICIOUS ACTIVITY",
            Severity::LowRisk => "LOW RISK",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.glyph(), self.label())
    }
}

/// Snapshot of the detector's running statistics.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Statistics {
    pub total_predictions: u64,
    pub attack_detections: u64,
    pub attack_rate: f64,
    pub avg_inference_time_ms: f64,
    pub max_inference_time_ms: f64,
    pub min_inference_time_ms: f64,
    // None until at least one prediction with a measurable latency
    pub throughput_per_second: Option<f64>,
    pub confidence_threshold: f32,
}

impl Default for Statistics {
    fn default() -> Self {
        Self {
            total_predictions: 0,
            attack_detections: 0,
            attack_rate: 0.0,
            avg_inference_time_ms: 0.0,
            max_inference_time_ms: 0.0,
            min_inference_time_ms: 0.0,
            throughput_per_second: None,
            confidence_threshold: 0.0,
        }
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "total_predictions: {}", self.total_predictions)?;
        writeln!(f, "attack_detections: {}", self.attack_detections)?;
        writeln!(f, "attack_rate: {:.3}", self.attack_rate)?;
        writeln!(f, "avg_inference_time_ms: {:.2}", self.avg_inference_time_ms)?;
        writeln!(f, "max_inference_time_ms: {:.2}", self.max_inference_time_ms)?;
        writeln!(f, "min_inference_time_ms: {:.2}", self.min_inference_time_ms)?;
        match self.throughput_per_second {
            Some(t) => writeln!(f, "throughput_per_second: {:.2}", t)?,
            None => writeln!(f, "throughput_per_second: n/a")?,
        }
        write!(f, "confidence_threshold: {}", self.confidence_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(is_attack: bool, is_benign: bool, confidence: f32) -> PredictionResult {
        PredictionResult {
            timestamp: Local::now(),
            predicted_class: "X".into(),
            confidence,
            is_attack,
            is_benign,
            is_high_threat: false,
            is_ddos: false,
            confidence_threshold: 0.8,
            inference_time_ms: 1.0,
            all_probabilities: vec![confidence],
            normalization_warning: None,
        }
    }

    #[test]
    fn severity_routing_order() {
        assert_eq!(result(true, false, 0.1).severity(), Severity::Critical);
        assert_eq!(result(false, true, 0.99).severity(), Severity::Normal);
        // threshold itself counts as suspicious
        assert_eq!(result(false, false, 0.8).severity(), Severity::Suspicious);
        assert_eq!(result(false, false, 0.79).severity(), Severity::LowRisk);
    }

    #[test]
    fn alert_line_uses_flat_field_names() {
        let json = serde_json::to_value(result(true, false, 0.95)).unwrap();
        for key in ["timestamp", "predicted_class", "confidence", "is_attack", "is_benign",
                    "is_high_threat", "is_ddos", "confidence_threshold",
                    "inference_time_ms", "all_probabilities"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert!(json.get("normalization_warning").is_none());
    }
}
