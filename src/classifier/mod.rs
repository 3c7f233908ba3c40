pub mod classifier;
pub mod metadata;
pub mod policy;

pub use classifier::{
    InferenceEngine,
    ModelOutput,
    OnnxModel,
};
pub use metadata::{ModelMetadata, METADATA_FORMAT_VERSION};
pub use policy::{argmax, AttackPolicy, Verdict, CRITICAL_OVERRIDE};
