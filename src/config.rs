/// Text embedder configuration.
///
/// Handles building, loading, validating and saving the options an embedder
/// instance is created with. Unset flags resolve to `false`; the model
/// source is passed through to the native engine untouched.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// ── Config structs ───────────────────────────────────────────────────

/// Where the native engine loads the model from.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct BaseOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_asset_path: Option<PathBuf>,

    /// In-memory model contents. Never serialized.
    #[serde(skip)]
    pub model_asset_buffer: Option<Vec<u8>>,
}

/// Options for one text embedder instance.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct EmbedderOptions {
    #[serde(default)]
    pub base_options: BaseOptions,

    /// Normalize the returned vectors with their L2 norm. Only needed when
    /// the model has no L2 normalization op of its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub l2_normalize: Option<bool>,

    /// Scalar-quantize the returned vectors to `i8`. Vectors are assumed to
    /// be unit-norm, so every component lies in `[-1.0, 1.0]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantize: Option<bool>,
}

// ── Config implementation ────────────────────────────────────────────

impl EmbedderOptions {
    /// Options for a model file on disk, all flags at their defaults.
    #[must_use]
    pub fn from_model_path(path: impl Into<PathBuf>) -> Self {
        Self {
            base_options: BaseOptions {
                model_asset_path: Some(path.into()),
                model_asset_buffer: None,
            },
            ..Self::default()
        }
    }

    /// Options for a model already loaded in memory.
    #[must_use]
    pub fn from_model_buffer(buffer: Vec<u8>) -> Self {
        Self {
            base_options: BaseOptions {
                model_asset_path: None,
                model_asset_buffer: Some(buffer),
            },
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_l2_normalize(mut self, enabled: bool) -> Self {
        self.l2_normalize = Some(enabled);
        self
    }

    #[must_use]
    pub fn with_quantize(mut self, enabled: bool) -> Self {
        self.quantize = Some(enabled);
        self
    }

    /// Resolved `l2_normalize` flag (defaults to `false`).
    #[must_use]
    pub fn l2_normalize(&self) -> bool {
        self.l2_normalize.unwrap_or(false)
    }

    /// Resolved `quantize` flag (defaults to `false`).
    #[must_use]
    pub fn quantize(&self) -> bool {
        self.quantize.unwrap_or(false)
    }

    /// Load options from a JSON file.
    ///
    /// Fields missing from the file keep their defaults. A relative
    /// `model_asset_path` is resolved against the directory of the file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read embedder options: {}", path.display()))?;

        let mut options: EmbedderOptions = serde_json::from_str(&data)
            .with_context(|| format!("invalid embedder options in {}", path.display()))?;

        if let Some(model) = options.base_options.model_asset_path.as_mut() {
            if model.is_relative() {
                if let Some(dir) = path.parent() {
                    *model = dir.join(&*model);
                }
            }
        } else {
            warn!("{} does not name a model_asset_path", path.display());
        }

        info!("Loaded embedder options from {}", path.display());
        Ok(options)
    }

    /// Save options to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if self.base_options.model_asset_buffer.is_some() {
            warn!("model_asset_buffer is not persisted to {}", path.display());
        }
        let data = serde_json::to_string_pretty(self).context("failed to marshal options")?;
        std::fs::write(path, data)
            .with_context(|| format!("failed to write options: {}", path.display()))?;
        Ok(())
    }

    /// Validate the model source.
    ///
    /// The native engine performs the same checks on `create`; this lets a
    /// caller reject a bad file before touching the native library.
    pub fn validate(&self) -> Result<()> {
        let base = &self.base_options;
        anyhow::ensure!(
            base.model_asset_path.is_some() || base.model_asset_buffer.is_some(),
            "either model_asset_path or model_asset_buffer must be set"
        );
        anyhow::ensure!(
            base.model_asset_path.is_none() || base.model_asset_buffer.is_none(),
            "model_asset_path and model_asset_buffer are mutually exclusive"
        );
        if let Some(buffer) = &base.model_asset_buffer {
            anyhow::ensure!(!buffer.is_empty(), "model_asset_buffer must not be empty");
        }
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_flags_resolve_false() {
        let options = EmbedderOptions::default();
        assert!(options.l2_normalize.is_none());
        assert!(options.quantize.is_none());
        assert!(!options.l2_normalize());
        assert!(!options.quantize());
    }

    #[test]
    fn test_builders() {
        let options = EmbedderOptions::from_model_path("model.tflite")
            .with_l2_normalize(true)
            .with_quantize(false);
        assert_eq!(
            options.base_options.model_asset_path,
            Some(PathBuf::from("model.tflite"))
        );
        assert!(options.l2_normalize());
        assert_eq!(options.quantize, Some(false));
    }

    #[test]
    fn test_load_from_json() {
        let json = r#"{"base_options": {"model_asset_path": "/models/bert.tflite"}, "quantize": true}"#;
        let options: EmbedderOptions = serde_json::from_str(json).unwrap();
        assert_eq!(
            options.base_options.model_asset_path,
            Some(PathBuf::from("/models/bert.tflite"))
        );
        assert!(options.quantize());
        // Unset fields keep their defaults
        assert!(options.l2_normalize.is_none());
    }

    #[test]
    fn test_validate_ok() {
        assert!(EmbedderOptions::from_model_path("m.tflite").validate().is_ok());
        assert!(EmbedderOptions::from_model_buffer(vec![1, 2, 3]).validate().is_ok());
    }

    #[test]
    fn test_validate_missing_model() {
        assert!(EmbedderOptions::default().validate().is_err());
    }

    #[test]
    fn test_validate_both_sources() {
        let mut options = EmbedderOptions::from_model_path("m.tflite");
        options.base_options.model_asset_buffer = Some(vec![1]);
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_validate_empty_buffer() {
        assert!(EmbedderOptions::from_model_buffer(vec![]).validate().is_err());
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("embedder.json");

        let options = EmbedderOptions::from_model_path("/abs/model.tflite").with_l2_normalize(true);
        options.save(&path).unwrap();

        let loaded = EmbedderOptions::load(&path).unwrap();
        assert_eq!(loaded, options);
    }

    #[test]
    fn test_load_resolves_relative_model_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("embedder.json");
        std::fs::write(&path, r#"{"base_options": {"model_asset_path": "bert.tflite"}}"#).unwrap();

        let loaded = EmbedderOptions::load(&path).unwrap();
        assert_eq!(
            loaded.base_options.model_asset_path,
            Some(dir.path().join("bert.tflite"))
        );
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        assert!(EmbedderOptions::load(dir.path().join("nope.json")).is_err());
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(EmbedderOptions::load(&path).is_err());
    }

    #[test]
    fn test_buffer_not_serialized() {
        let options = EmbedderOptions::from_model_buffer(vec![9, 9, 9]);
        let json = serde_json::to_string(&options).unwrap();
        assert!(!json.contains("model_asset_buffer"));
    }
}
