use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::config::DetectorConfig;

/// Labels that mark a prediction as ordinary traffic (compared lowercased).
pub const BENIGN_LABELS: [&str; 3] = ["benigntraffic", "benign", "normal"];

/// Case-sensitive substrings that put a label in the flood family.
pub const DOS_MARKERS: [&str; 2] = ["DDoS", "DoS"];

/// Confidence above which any non-benign prediction is critical.
pub const CRITICAL_OVERRIDE: f32 = 0.9;

/// Decision for one predicted class. `is_high_threat` and `is_ddos` are false for benign traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Verdict {
    pub is_benign: bool,
    pub is_attack: bool,
    pub is_high_threat: bool,
    pub is_ddos: bool,
    pub high_confidence: bool,
}

#[derive(Debug, Clone)]
pub struct AttackPolicy {
    confidence_threshold: f32,
    low_threat_classes: BTreeSet<String>,
}

impl AttackPolicy {
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            confidence_threshold: config.confidence_threshold,
            low_threat_classes: config.low_threat_classes.clone(),
        }
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    pub fn low_threat_classes(&self) -> &BTreeSet<String> {
        &self.low_threat_classes
    }

    pub fn evaluate(&self, predicted_class: &str, confidence: f32) -> Verdict {
        if is_benign_label(predicted_class) {
            return Verdict { is_benign: true, ..Verdict::default() };
        }

        let high_confidence = confidence > self.confidence_threshold;
        let is_high_threat = !self.low_threat_classes.contains(predicted_class);
        let is_ddos = is_dos_label(predicted_class);

        let is_attack = (high_confidence && is_high_threat)
            || (high_confidence && is_ddos)
            || confidence > CRITICAL_OVERRIDE;

        Verdict {
            is_benign: false,
            is_attack,
            is_high_threat,
            is_ddos,
            high_confidence,
        }
    }
}

pub fn is_benign_label(label: &str) -> bool {
    let lower = label.to_lowercase();
    BENIGN_LABELS.contains(&lower.as_str())
}

pub fn is_dos_label(label: &str) -> bool {
    DOS_MARKERS.iter().any(|m| label.contains(m))
}

/// Index and value of the largest probability. Ties go to the lowest index, NaN never wins.
pub fn argmax(probs: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, &p) in probs.iter().enumerate() {
        match best {
            None if !p.is_nan() => best = Some((idx, p)),
            Some((_, b)) if p.partial_cmp(&b) == Some(Ordering::Greater) => best = Some((idx, p)),
            _ => {}
        }
    }
    best
}
