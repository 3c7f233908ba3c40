use anyhow::{Context, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::TransformError;
use crate::types::RawFeatures;

/// A fitted, pure row transform.
pub trait Transform: Send {
    fn transform(&self, row: &[f64]) -> std::result::Result<Vec<f64>, TransformError>;
}

/// Scaler parameters as exported from training.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scaler {
    /// `(x - mean) / scale`
    Standard { mean: Vec<f64>, scale: Vec<f64> },
    /// `x * scale + min`
    MinMax { min: Vec<f64>, scale: Vec<f64> },
    Identity,
}

impl Scaler {
    /// Number of columns the scaler was fitted on, `None` for identity.
    pub fn width(&self) -> Option<usize> {
        match self {
            Scaler::Standard { mean, .. } => Some(mean.len()),
            Scaler::MinMax { min, .. } => Some(min.len()),
            Scaler::Identity => None,
        }
    }

    /// Checks that the parameter vectors agree with each other.
    pub fn validate(&self) -> std::result::Result<(), TransformError> {
        let (a, b) = match self {
            Scaler::Standard { mean, scale } => (mean, scale),
            Scaler::MinMax { min, scale } => (min, scale),
            Scaler::Identity => return Ok(()),
        };
        if a.len() != b.len() {
            return Err(TransformError::ShapeMismatch { expected: a.len(), got: b.len() });
        }
        if let Some(idx) = a.iter().chain(b.iter()).position(|v| !v.is_finite()) {
            return Err(TransformError::NonFinite(idx % a.len().max(1)));
        }
        Ok(())
    }
}

impl Transform for Scaler {
    fn transform(&self, row: &[f64]) -> std::result::Result<Vec<f64>, TransformError> {
        if let Some(expected) = self.width() {
            if expected != row.len() {
                return Err(TransformError::ShapeMismatch { expected, got: row.len() });
            }
        }

        let out: Vec<f64> = match self {
            Scaler::Standard { mean, scale } => row
                .iter()
                .zip(mean.iter().zip(scale))
                // sklearn keeps zero-variance columns unscaled
                .map(|(x, (m, s))| (x - m) / if *s == 0.0 { 1.0 } else { *s })
                .collect(),
            Scaler::MinMax { min, scale } => row
                .iter()
                .zip(min.iter().zip(scale))
                .map(|(x, (m, s))| x * s + m)
                .collect(),
            Scaler::Identity => row.to_vec(),
        };

        if let Some(idx) = out.iter().position(|v| !v.is_finite()) {
            return Err(TransformError::NonFinite(idx));
        }
        Ok(out)
    }
}

/// Model input for one sample plus the warning raised if scaling was skipped.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub input: Array2<f32>,
    pub warning: Option<TransformError>,
}

pub struct Normalizer {
    feature_names: Vec<String>,
    transform: Box<dyn Transform>,
}

impl Normalizer {
    pub fn new(feature_names: Vec<String>, transform: Box<dyn Transform>) -> Self {
        Self { feature_names, transform }
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Lays the raw mapping out in model order, missing names as 0.0.
    pub fn ordered(&self, features: &RawFeatures) -> Vec<f64> {
        self.feature_names
            .iter()
            .map(|name| features.get(name).copied().unwrap_or(0.0))
            .collect()
    }

    /// Builds the `(1, n)` f32 input. A failing transform falls back to the unscaled row.
    pub fn normalize(&self, features: &RawFeatures) -> Result<Normalized> {
        let raw = self.ordered(features);

        let (row, warning) = match self.transform.transform(&raw) {
            Ok(scaled) => (scaled, None),
            Err(e) => {
                log::warn!("Normalization failed, using unscaled features: {}", e);
                (raw, Some(e))
            }
        };

        let width = row.len();
        let values: Vec<f32> = row.iter().map(|&v| v as f32).collect();
        if let Some(idx) = values.iter().position(|v| !v.is_finite()) {
            log::warn!(
                "Feature '{}' does not fit in f32 ({}), passing {} to the model",
                self.feature_names.get(idx).map_or("?", String::as_str),
                row[idx],
                values[idx]
            );
        }
        let input = Array2::from_shape_vec((1, width), values)
            .context("Failed to create model input array")?;

        Ok(Normalized { input, warning })
    }
}
