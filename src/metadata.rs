// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! ONNX pose model metadata parsing.
//!
//! Ultralytics exports store their settings as YAML-like `key: value` strings in the
//! ONNX custom metadata. Only the fields the pose decoder needs are kept.

use std::collections::HashMap;

use crate::error::{PipelineError, Result};

/// Metadata keys read from the ONNX model.
pub const METADATA_KEYS: [&str; 6] = ["task", "stride", "imgsz", "names", "kpt_shape", "version"];

/// Settings embedded in an exported pose model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelMetadata {
    /// Task the model was exported for; must be `pose` for the extractor.
    pub task: String,
    /// Exporter version, informational.
    pub version: String,
    /// Model stride (typically 32).
    pub stride: u32,
    /// Input image size as (height, width).
    pub imgsz: (usize, usize),
    /// Keypoints per person and values per keypoint, e.g. `(17, 3)`.
    pub kpt_shape: (usize, usize),
    /// Class ID to class name mapping (a single `person` class for pose models).
    pub names: HashMap<usize, String>,
}

impl ModelMetadata {
    /// Build metadata from the individual custom metadata entries of a model.
    ///
    /// # Arguments
    ///
    /// * `entries` - Custom metadata keys and values read from the ONNX session.
    ///
    /// # Errors
    ///
    /// Returns an error if a present field is malformed.
    pub fn from_entries(entries: &HashMap<String, String>) -> Result<Self> {
        let yaml = METADATA_KEYS
            .iter()
            .filter_map(|key| entries.get(*key).map(|v| format!("{key}: {v}")))
            .collect::<Vec<_>>()
            .join("\n");
        Self::from_yaml_str(&yaml)
    }

    /// Parse metadata from a `key: value` string.
    ///
    /// # Arguments
    ///
    /// * `yaml_str` - One `key: value` pair per line; unknown keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if `stride`, `imgsz` or `kpt_shape` can't be parsed.
    pub fn from_yaml_str(yaml_str: &str) -> Result<Self> {
        let mut metadata = Self::default();

        for line in yaml_str.lines() {
            let Some((key, value)) = line.trim().split_once(':') else {
                continue;
            };
            let value = value.trim().trim_matches('\'').trim_matches('"');

            match key.trim() {
                "task" => metadata.task = value.to_lowercase(),
                "version" => metadata.version = value.to_string(),
                "stride" => {
                    metadata.stride = value.parse().map_err(|_| {
                        PipelineError::MetadataError(format!("Invalid stride value: {value}"))
                    })?;
                }
                "imgsz" => {
                    if let Some(pair) = parse_pair(value) {
                        metadata.imgsz = pair;
                    } else if !value.is_empty() {
                        return Err(PipelineError::MetadataError(format!(
                            "Invalid imgsz value: {value}"
                        )));
                    }
                }
                "kpt_shape" => {
                    metadata.kpt_shape = parse_pair(value).ok_or_else(|| {
                        PipelineError::MetadataError(format!("Invalid kpt_shape value: {value}"))
                    })?;
                }
                "names" if value.starts_with('{') => {
                    metadata.names = parse_python_dict(value);
                }
                _ => {}
            }
        }

        Ok(metadata)
    }

    /// Whether the model is a pose model.
    #[must_use]
    pub fn is_pose(&self) -> bool {
        self.task == "pose"
    }

    /// Get the number of classes in this model.
    #[must_use]
    pub fn num_classes(&self) -> usize {
        self.names.len().max(1)
    }

    /// Number of keypoints predicted per person.
    #[must_use]
    pub const fn num_keypoints(&self) -> usize {
        self.kpt_shape.0
    }
}

impl Default for ModelMetadata {
    fn default() -> Self {
        Self {
            task: "pose".to_string(),
            version: String::new(),
            stride: 32,
            imgsz: (640, 640),
            kpt_shape: (17, 3),
            names: HashMap::from([(0, "person".to_string())]),
        }
    }
}

/// Parse `[a, b]` into a pair.
fn parse_pair(value: &str) -> Option<(usize, usize)> {
    let inner = value.trim().strip_prefix('[')?.strip_suffix(']')?;
    let mut parts = inner.split(',').map(|s| s.trim().parse::<usize>());
    match (parts.next(), parts.next(), parts.next()) {
        (Some(Ok(a)), Some(Ok(b)), None) => Some((a, b)),
        _ => None,
    }
}

/// Parse a Python dict string like `{0: 'person', 1: 'hand'}`.
fn parse_python_dict(dict_str: &str) -> HashMap<usize, String> {
    let inner = dict_str.trim().trim_start_matches('{').trim_end_matches('}');

    inner
        .split(',')
        .filter_map(|entry| {
            let (key, value) = entry.split_once(':')?;
            let class_id = key.trim().parse::<usize>().ok()?;
            let name = value.trim().trim_matches('\'').trim_matches('"');
            Some((class_id, name.to_string()))
        })
        .collect()
}
