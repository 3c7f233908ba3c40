pub mod capture;
pub mod classifier;
pub mod config;
pub mod error;
pub mod processor;
pub mod types;

use anyhow::{Context, Result};
use std::path::Path;

use classifier::{ModelMetadata, OnnxModel};
use config::DetectorConfig;
use processor::Detector;

pub use types::{PredictionResult, RawFeatures, Severity, Statistics};

/// Loads the ONNX model and its metadata bundle and wires them into a detector.
/// Any failure here is fatal for the process.
pub fn load_detector<P, Q>(model_path: P, metadata_path: Q, config: DetectorConfig) -> Result<Detector>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    log::info!("Loading model...");
    let model = OnnxModel::load(model_path.as_ref())?;

    log::info!("Loading metadata...");
    let metadata = ModelMetadata::load(metadata_path.as_ref())
        .context("Could not load model metadata")?;

    Ok(Detector::from_metadata(metadata, Box::new(model), config))
}
