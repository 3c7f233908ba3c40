use anyhow::{anyhow, Context, Result};
use ndarray::{Array2, CowArray};
use ort::{
    Environment, Session, SessionBuilder, Value,
    GraphOptimizationLevel, LoggingLevel,
};
use std::path::Path;
use std::sync::Arc;

/// Raw outputs of one forward pass, index-aligned with the model classes.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOutput {
    pub logits: Vec<f32>,
    pub probabilities: Vec<f32>,
}

/// A loaded classification model. One call per sample, batch size 1.
pub trait InferenceEngine: Send {
    fn infer(&self, input: &Array2<f32>) -> Result<ModelOutput>;
}

pub struct OnnxModel {
    // Sessions borrow the runtime environment for their whole life
    _environment: Arc<Environment>,
    session: Session,
}

impl OnnxModel {
    pub fn load<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();
        if !model_path.exists() {
            return Err(anyhow!("Model not found: {}", model_path.display()));
        }

        let environment = Arc::new(
            Environment::builder()
                .with_name("flowguard")
                .with_log_level(LoggingLevel::Warning)
                .build()
                .context("Failed to create ONNX environment")?
        );

        let session = SessionBuilder::new(&environment)?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(1)?
            .with_model_from_file(model_path)
            .with_context(|| format!("Failed to load model from {}", model_path.display()))?;

        log::info!(
            "Loaded ONNX model {} ({} inputs, {} outputs)",
            model_path.display(),
            session.inputs.len(),
            session.outputs.len()
        );

        Ok(Self { _environment: environment, session })
    }
}

impl InferenceEngine for OnnxModel {
    fn infer(&self, input: &Array2<f32>) -> Result<ModelOutput> {
        let cow = CowArray::from(input.view().into_dyn());

        let tensor = Value::from_array(self.session.allocator(), &cow)
            .context("Failed to create input tensor")?;

        let outputs = self.session.run(vec![tensor])
            .context("Failed to run model")?;

        let mut tensors: Vec<Vec<f32>> = outputs.iter()
            .filter_map(|o| o.try_extract::<f32>().ok())
            .map(|t| t.view().iter().copied().collect::<Vec<f32>>())
            .collect();

        // Exported graphs emit (logits, probabilities); single-output graphs are softmaxed already
        match tensors.len() {
            0 => Err(anyhow!("No float output from model")),
            1 => {
                let probabilities = tensors.remove(0);
                Ok(ModelOutput { logits: probabilities.clone(), probabilities })
            }
            _ => {
                let logits = tensors.remove(0);
                let probabilities = tensors.remove(0);
                Ok(ModelOutput { logits, probabilities })
            }
        }
    }
}
