use chrono::{DateTime, Local};
use std::collections::BTreeMap;
use std::fmt;

use crate::types::{PredictionResult, Severity};

#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceSummary {
    pub mean: f32,
    pub median: f32,
    pub min: f32,
    pub max: f32,
}

impl ConfidenceSummary {
    pub fn from_results(results: &[PredictionResult]) -> Option<Self> {
        if results.is_empty() {
            return None;
        }
        let mut values: Vec<f32> = results.iter().map(|r| r.confidence).collect();
        values.sort_by(|a, b| a.total_cmp(b));

        let n = values.len();
        let median = if n % 2 == 1 {
            values[n / 2]
        } else {
            (values[n / 2 - 1] + values[n / 2]) / 2.0
        };

        Some(Self {
            mean: values.iter().sum::<f32>() / n as f32,
            median,
            min: values[0],
            max: values[n - 1],
        })
    }
}

/// Aggregate summary over a finished run.
#[derive(Debug, Clone)]
pub struct Report {
    pub generated_at: DateTime<Local>,
    pub confidence_threshold: f32,
    pub results: Vec<PredictionResult>,
    pub severity_counts: BTreeMap<Severity, usize>,
    pub critical_by_class: BTreeMap<String, usize>,
    pub low_confidence: usize,
    pub high_confidence: usize,
    pub confidence: Option<ConfidenceSummary>,
}

impl Report {
    pub fn build(results: Vec<PredictionResult>, confidence_threshold: f32) -> Self {
        let mut severity_counts: BTreeMap<Severity, usize> =
            Severity::ALL.iter().map(|s| (*s, 0)).collect();
        let mut critical_by_class = BTreeMap::new();

        for r in &results {
            let severity = r.severity();
            *severity_counts.entry(severity).or_insert(0) += 1;
            if severity == Severity::Critical {
                *critical_by_class.entry(r.predicted_class.clone()).or_insert(0) += 1;
            }
        }

        let high_confidence = results.iter()
            .filter(|r| r.confidence >= confidence_threshold)
            .count();

        Self {
            generated_at: Local::now(),
            confidence_threshold,
            low_confidence: results.len() - high_confidence,
            high_confidence,
            confidence: ConfidenceSummary::from_results(&results),
            severity_counts,
            critical_by_class,
            results,
        }
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.severity_counts.get(&severity).copied().unwrap_or(0)
    }

    /// Percentage of samples flagged critical, 0 for an empty run.
    pub fn critical_rate(&self) -> f64 {
        if self.results.is_empty() {
            0.0
        } else {
            self.count(Severity::Critical) as f64 / self.total() as f64 * 100.0
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== ANALYSIS RESULTS ===")?;
        writeln!(f, "Date/Time: {}", self.generated_at.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(f, "Total samples processed: {}", self.total())?;
        writeln!(f, "Confidence threshold: {}", self.confidence_threshold)?;
        writeln!(f)?;

        let critical = self.count(Severity::Critical);
        writeln!(f, "Critical attacks detected: {}", critical)?;
        writeln!(f, "Critical attack rate: {:.2}%", self.critical_rate())?;
        writeln!(f, "Normal/low-risk activity: {}", self.total() - critical)?;
        for severity in Severity::ALL {
            writeln!(f, "  {}: {}", severity, self.count(severity))?;
        }
        writeln!(f, "Low-confidence predictions: {}", self.low_confidence)?;
        writeln!(f, "High-confidence predictions: {}", self.high_confidence)?;
        writeln!(f)?;

        if !self.critical_by_class.is_empty() {
            writeln!(f, "=== CRITICAL ATTACK TYPES ===")?;
            for (class, count) in &self.critical_by_class {
                writeln!(f, "{}: {} occurrences", class, count)?;
            }
            writeln!(f)?;
        }

        if let Some(c) = &self.confidence {
            writeln!(f, "=== CONFIDENCE DISTRIBUTION ===")?;
            writeln!(f, "Mean confidence: {:.3}", c.mean)?;
            writeln!(f, "Median confidence: {:.3}", c.median)?;
            writeln!(f, "Min confidence: {:.3}", c.min)?;
            writeln!(f, "Max confidence: {:.3}", c.max)?;
            writeln!(f)?;
        }

        writeln!(f, "=== DETECTION DETAILS ===")?;
        for (i, r) in self.results.iter().enumerate() {
            writeln!(f, "Sample {}: {}", i + 1, r.severity())?;
            writeln!(f, "  Class: {}", r.predicted_class)?;
            writeln!(f, "  Confidence: {:.3}", r.confidence)?;
            writeln!(f, "  Benign traffic: {}", r.is_benign)?;
            writeln!(f, "  DDoS: {}", r.is_ddos)?;
            writeln!(f, "  High threat: {}", r.is_high_threat)?;
            writeln!(f, "  Inference time: {:.2} ms", r.inference_time_ms)?;
            writeln!(f, "  Timestamp: {}", r.timestamp.to_rfc3339())?;
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(class: &str, confidence: f32, is_attack: bool, is_benign: bool) -> PredictionResult {
        PredictionResult {
            timestamp: Local::now(),
            predicted_class: class.into(),
            confidence,
            is_attack,
            is_benign,
            is_high_threat: !is_benign,
            is_ddos: class.contains("DoS"),
            confidence_threshold: 0.8,
            inference_time_ms: 1.5,
            all_probabilities: vec![confidence],
            normalization_warning: None,
        }
    }

    fn sample_run() -> Vec<PredictionResult> {
        vec![
            result("DDoS-UDP_Flood", 0.95, true, false),
            result("BenignTraffic", 0.6, false, true),
            result("VulnerabilityScan", 0.85, false, false),
            result("Mirai-udpplain", 0.4, false, false),
            result("DDoS-ICMP_Flood", 0.91, true, false),
            result("DDoS-UDP_Flood", 0.99, true, false),
        ]
    }

    #[test]
    fn counts_every_bucket_once() {
        let report = Report::build(sample_run(), 0.8);
        assert_eq!(report.total(), 6);
        assert_eq!(report.count(Severity::Critical), 3);
        assert_eq!(report.count(Severity::Normal), 1);
        assert_eq!(report.count(Severity::Suspicious), 1);
        assert_eq!(report.count(Severity::LowRisk), 1);
        assert_eq!(report.high_confidence, 4);
        assert_eq!(report.low_confidence, 2);
        assert!((report.critical_rate() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn critical_breakdown_is_sorted_by_label() {
        let report = Report::build(sample_run(), 0.8);
        let classes: Vec<(&str, usize)> = report.critical_by_class.iter()
            .map(|(k, v)| (k.as_str(), *v))
            .collect();
        assert_eq!(classes, vec![("DDoS-ICMP_Flood", 1), ("DDoS-UDP_Flood", 2)]);
    }

    #[test]
    fn confidence_summary_uses_even_median() {
        let c = ConfidenceSummary::from_results(&sample_run()).unwrap();
        // sorted: 0.4 0.6 0.85 0.91 0.95 0.99
        assert!((c.median - 0.88).abs() < 1e-6);
        assert_eq!(c.min, 0.4);
        assert_eq!(c.max, 0.99);
    }

    #[test]
    fn rendered_report_has_sections_and_details() {
        let text = Report::build(sample_run(), 0.8).to_string();
        assert!(text.contains("Total samples processed: 6"));
        assert!(text.contains("Critical attack rate: 50.00%"));
        assert!(text.contains("DDoS-UDP_Flood: 2 occurrences"));
        assert!(text.contains("Median confidence: 0.880"));
        assert!(text.contains("Sample 6: 🚨 CRITICAL ATTACK"));
        assert!(text.contains("Sample 4: 🔍 LOW RISK"));
    }

    #[test]
    fn empty_run_renders_without_distribution() {
        let report = Report::build(Vec::new(), 0.8);
        assert_eq!(report.critical_rate(), 0.0);
        assert!(report.confidence.is_none());
        let text = report.to_string();
        assert!(text.contains("Total samples processed: 0"));
        assert!(!text.contains("CONFIDENCE DISTRIBUTION"));
    }
}
