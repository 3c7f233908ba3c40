use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::MetadataError;
use crate::processor::normalizer::Scaler;

pub const METADATA_FORMAT_VERSION: u32 = 1;

/// Training-side artifact bundle: feature order, class labels and fitted scaler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub format_version: u32,
    pub feature_names: Vec<String>,
    pub classes: Vec<String>,
    pub scaler: Scaler,
    /// Overrides the detector's default low-threat set when present.
    #[serde(default)]
    pub low_threat_classes: Option<Vec<String>>,
}

impl ModelMetadata {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, MetadataError> {
        let path = path.as_ref();
        let s = fs::read_to_string(path).map_err(|source| MetadataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let meta = Self::from_json(&s).map_err(|e| match e {
            MetadataError::Parse { source, .. } => MetadataError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        log::info!(
            "Loaded metadata {}: {} features, {} classes",
            path.display(),
            meta.feature_names.len(),
            meta.classes.len()
        );
        Ok(meta)
    }

    pub fn from_json(s: &str) -> Result<Self, MetadataError> {
        let meta: ModelMetadata = serde_json::from_str(s).map_err(|source| MetadataError::Parse {
            path: Default::default(),
            source,
        })?;
        meta.validate()?;
        Ok(meta)
    }

    pub fn validate(&self) -> Result<(), MetadataError> {
        if self.format_version != METADATA_FORMAT_VERSION {
            return Err(MetadataError::UnsupportedVersion {
                found: self.format_version,
                expected: METADATA_FORMAT_VERSION,
            });
        }
        if self.feature_names.is_empty() {
            return Err(MetadataError::Empty("feature names"));
        }
        if self.classes.is_empty() {
            return Err(MetadataError::Empty("classes"));
        }
        check_unique("feature", &self.feature_names)?;
        check_unique("class", &self.classes)?;
        self.scaler.validate()?;

        // Not fatal: the normalizer falls back to unscaled input per sample
        if let Some(width) = self.scaler.width() {
            if width != self.feature_names.len() {
                log::warn!(
                    "Scaler fitted on {} columns but metadata lists {} features",
                    width,
                    self.feature_names.len()
                );
            }
        }
        Ok(())
    }
}

fn check_unique(kind: &'static str, names: &[String]) -> Result<(), MetadataError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(MetadataError::Duplicate { kind, name: name.clone() });
        }
    }
    Ok(())
}
