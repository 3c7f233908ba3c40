use anyhow::{anyhow, Result};
use chrono::Local;
use std::time::Instant;

use crate::classifier::{argmax, AttackPolicy, InferenceEngine, ModelMetadata};
use crate::config::DetectorConfig;
use crate::types::{PredictionResult, RawFeatures, Statistics};
use super::normalizer::Normalizer;

/// Counters updated after every completed prediction. Never reset.
#[derive(Debug, Clone, Default)]
pub struct RunningStatistics {
    pub total_predictions: u64,
    pub attack_detections: u64,
    pub inference_times_ms: Vec<f64>,
}

impl RunningStatistics {
    fn record(&mut self, is_attack: bool, inference_time_ms: f64) {
        self.total_predictions += 1;
        if is_attack {
            self.attack_detections += 1;
        }
        self.inference_times_ms.push(inference_time_ms);
    }

    pub fn snapshot(&self, confidence_threshold: f32) -> Statistics {
        let attack_rate = if self.total_predictions > 0 {
            self.attack_detections as f64 / self.total_predictions as f64
        } else {
            0.0
        };

        let times = &self.inference_times_ms;
        if times.is_empty() {
            return Statistics {
                total_predictions: self.total_predictions,
                attack_detections: self.attack_detections,
                attack_rate,
                confidence_threshold,
                ..Statistics::default()
            };
        }

        let avg = times.iter().sum::<f64>() / times.len() as f64;
        let max = times.iter().copied().fold(f64::MIN, f64::max);
        let min = times.iter().copied().fold(f64::MAX, f64::min);
        let throughput = if avg > 0.0 { Some(1000.0 / avg) } else { None };

        Statistics {
            total_predictions: self.total_predictions,
            attack_detections: self.attack_detections,
            attack_rate,
            avg_inference_time_ms: avg,
            max_inference_time_ms: max,
            min_inference_time_ms: min,
            throughput_per_second: throughput,
            confidence_threshold,
        }
    }
}

pub struct Detector {
    normalizer: Normalizer,
    engine: Box<dyn InferenceEngine>,
    policy: AttackPolicy,
    classes: Vec<String>,
    stats: RunningStatistics,
}

impl Detector {
    pub fn new(
        normalizer: Normalizer,
        engine: Box<dyn InferenceEngine>,
        classes: Vec<String>,
        config: &DetectorConfig,
    ) -> Self {
        let policy = AttackPolicy::new(config);
        log::info!("Detectable classes: {:?}", classes);
        log::info!("Confidence threshold: {}", policy.confidence_threshold());
        log::info!("Low-threat classes: {:?}", policy.low_threat_classes());
        Self {
            normalizer,
            engine,
            policy,
            classes,
            stats: RunningStatistics::default(),
        }
    }

    /// Wires a detector from a loaded metadata bundle. Metadata low-threat classes win over the config's.
    pub fn from_metadata(
        metadata: ModelMetadata,
        engine: Box<dyn InferenceEngine>,
        config: DetectorConfig,
    ) -> Self {
        let config = match metadata.low_threat_classes {
            Some(classes) => config.with_low_threat_classes(classes),
            None => config,
        };
        let normalizer = Normalizer::new(metadata.feature_names, Box::new(metadata.scaler));
        Self::new(normalizer, engine, metadata.classes, &config)
    }

    pub fn feature_names(&self) -> &[String] {
        self.normalizer.feature_names()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.policy.confidence_threshold()
    }

    pub fn predict(&mut self, features: &RawFeatures) -> Result<PredictionResult> {
        let normalized = self.normalizer.normalize(features)?;

        let t0 = Instant::now();
        let output = self.engine.infer(&normalized.input)?;
        let inference_time_ms = t0.elapsed().as_secs_f64() * 1000.0;

        let probs = output.probabilities;
        if probs.len() != self.classes.len() {
            return Err(anyhow!(
                "Model returned {} probabilities for {} classes",
                probs.len(),
                self.classes.len()
            ));
        }

        let (idx, confidence) = argmax(&probs)
            .ok_or_else(|| anyhow!("Empty probability vector"))?;
        let predicted_class = self.classes[idx].clone();
        let verdict = self.policy.evaluate(&predicted_class, confidence);

        self.stats.record(verdict.is_attack, inference_time_ms);
        log::debug!(
            "Predicted {} ({:.3}) in {:.2} ms, attack={}",
            predicted_class, confidence, inference_time_ms, verdict.is_attack
        );

        Ok(PredictionResult {
            timestamp: Local::now(),
            predicted_class,
            confidence,
            is_attack: verdict.is_attack,
            is_benign: verdict.is_benign,
            is_high_threat: verdict.is_high_threat,
            is_ddos: verdict.is_ddos,
            confidence_threshold: self.policy.confidence_threshold(),
            inference_time_ms,
            all_probabilities: probs,
            normalization_warning: normalized.warning.map(|w| w.to_string()),
        })
    }

    pub fn statistics(&self) -> Statistics {
        self.stats.snapshot(self.policy.confidence_threshold())
    }
}
